//! Exchange proposal lifecycle.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::UnknownVariant;

/// The state of an exchange proposal.
///
/// ```text
/// Pending ──┬──► Accepted
///           ├──► Rejected
///           └──► Cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ExchangeStatus {
    #[default]
    Pending,
    Accepted,
    Rejected,
    Cancelled,
}

impl ExchangeStatus {
    /// Returns true if the proposal can still be resolved.
    pub fn is_pending(&self) -> bool {
        matches!(self, ExchangeStatus::Pending)
    }

    /// Returns true if this is a terminal state (no further transitions possible).
    pub fn is_terminal(&self) -> bool {
        !self.is_pending()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ExchangeStatus::Pending => "pending",
            ExchangeStatus::Accepted => "accepted",
            ExchangeStatus::Rejected => "rejected",
            ExchangeStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for ExchangeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ExchangeStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ExchangeStatus::Pending),
            "accepted" => Ok(ExchangeStatus::Accepted),
            "rejected" => Ok(ExchangeStatus::Rejected),
            "cancelled" => Ok(ExchangeStatus::Cancelled),
            other => Err(UnknownVariant::new("exchange status", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_pending() {
        assert_eq!(ExchangeStatus::default(), ExchangeStatus::Pending);
    }

    #[test]
    fn terminal_states() {
        assert!(!ExchangeStatus::Pending.is_terminal());
        assert!(ExchangeStatus::Accepted.is_terminal());
        assert!(ExchangeStatus::Rejected.is_terminal());
        assert!(ExchangeStatus::Cancelled.is_terminal());
    }

    #[test]
    fn parse() {
        assert_eq!(
            "cancelled".parse::<ExchangeStatus>().unwrap(),
            ExchangeStatus::Cancelled
        );
        assert!("withdrawn".parse::<ExchangeStatus>().is_err());
    }
}
