//! Exchange proposals: one product offered for another.

mod aggregate;
mod events;
mod state;

pub use aggregate::ExchangeProposal;
pub use events::{
    CancellationReason, ExchangeAcceptedData, ExchangeCancelledData, ExchangeEvent,
    ExchangeProposedData, ExchangeRejectedData,
};
pub use state::ExchangeStatus;

use common::PartyId;
use thiserror::Error;

/// Errors that can occur during exchange operations.
#[derive(Debug, Error)]
pub enum ExchangeError {
    #[error("Exchange already proposed")]
    AlreadyProposed,

    #[error("Exchange proposal does not exist")]
    NotProposed,

    #[error("A product cannot be exchanged for itself")]
    SameProduct,

    #[error("Proposer already owns the requested product")]
    SelfExchange,

    #[error("Party {party} may not {action} this proposal")]
    NotAuthorized { party: PartyId, action: &'static str },

    #[error("Proposal is no longer pending (status {status})")]
    NotPending { status: ExchangeStatus },
}
