//! Product availability.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::UnknownVariant;

/// How a listed product can currently change hands.
///
/// ```text
/// ForSale ◄──► ForExchange ◄──► ForDonation     (owner edits)
///    │              │               │
///    └──────────────┴───────────────┴──► Unavailable
///         (sold out, exchanged, donated)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProductStatus {
    #[default]
    ForSale,
    ForExchange,
    ForDonation,
    Unavailable,
}

impl ProductStatus {
    /// Returns true if the product can be bought.
    pub fn can_sell(&self) -> bool {
        matches!(self, ProductStatus::ForSale)
    }

    /// Returns true if the product can be requested in an exchange.
    pub fn can_be_requested_in_exchange(&self) -> bool {
        matches!(self, ProductStatus::ForExchange)
    }

    /// Returns true if the product can be offered in an exchange.
    pub fn can_be_offered(&self) -> bool {
        !matches!(self, ProductStatus::Unavailable)
    }

    /// Returns true if donation requests are accepted.
    pub fn can_donate(&self) -> bool {
        matches!(self, ProductStatus::ForDonation)
    }

    /// Returns true if the product needs stock on hand in this state.
    pub fn requires_stock(&self) -> bool {
        !matches!(self, ProductStatus::Unavailable)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProductStatus::ForSale => "for_sale",
            ProductStatus::ForExchange => "for_exchange",
            ProductStatus::ForDonation => "for_donation",
            ProductStatus::Unavailable => "unavailable",
        }
    }
}

impl std::fmt::Display for ProductStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ProductStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "for_sale" => Ok(ProductStatus::ForSale),
            "for_exchange" => Ok(ProductStatus::ForExchange),
            "for_donation" => Ok(ProductStatus::ForDonation),
            "unavailable" => Ok(ProductStatus::Unavailable),
            other => Err(UnknownVariant::new("product status", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_for_sale_can_sell() {
        assert!(ProductStatus::ForSale.can_sell());
        assert!(!ProductStatus::ForExchange.can_sell());
        assert!(!ProductStatus::ForDonation.can_sell());
        assert!(!ProductStatus::Unavailable.can_sell());
    }

    #[test]
    fn offered_product_must_be_available() {
        assert!(ProductStatus::ForSale.can_be_offered());
        assert!(ProductStatus::ForExchange.can_be_offered());
        assert!(ProductStatus::ForDonation.can_be_offered());
        assert!(!ProductStatus::Unavailable.can_be_offered());
    }

    #[test]
    fn parses_wire_names() {
        for status in [
            ProductStatus::ForSale,
            ProductStatus::ForExchange,
            ProductStatus::ForDonation,
            ProductStatus::Unavailable,
        ] {
            assert_eq!(status.as_str().parse::<ProductStatus>().unwrap(), status);
        }
        assert!("sold".parse::<ProductStatus>().is_err());
    }

    #[test]
    fn serializes_snake_case() {
        let json = serde_json::to_string(&ProductStatus::ForExchange).unwrap();
        assert_eq!(json, "\"for_exchange\"");
    }
}
