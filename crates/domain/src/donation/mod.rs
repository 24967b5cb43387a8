//! Donation requests: asking an owner to give a product away.

mod aggregate;
mod events;
mod state;

pub use aggregate::DonationRequest;
pub use events::{
    DonationAcceptedData, DonationEvent, DonationRejectedData, DonationRequestedData,
    RejectionReason,
};
pub use state::DonationStatus;

use common::PartyId;
use thiserror::Error;

/// Errors that can occur during donation operations.
#[derive(Debug, Error)]
pub enum DonationError {
    #[error("Donation already requested")]
    AlreadyRequested,

    #[error("Donation request does not exist")]
    NotRequested,

    #[error("Owner cannot request their own product")]
    SelfDonation,

    #[error("Party {party} may not {action} this request")]
    NotAuthorized { party: PartyId, action: &'static str },

    #[error("Request is no longer pending (status {status})")]
    NotPending { status: DonationStatus },
}
