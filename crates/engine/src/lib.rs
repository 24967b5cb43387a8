//! Consistency engine for the marketplace.
//!
//! The engine is the only writer of cross-record state. Every operation runs
//! as one unit of work: it loads the records it decides on, stages the events
//! for every record it changes and commits them together. A version conflict
//! at commit re-runs the whole operation, so a decision is never written on
//! top of state it did not see.
//!
//! Operations:
//! - listing: `list_product`, `update_listing`
//! - exchange: `propose_exchange`, `resolve_exchange`
//! - donation: `request_donation`, `resolve_donation`
//! - sale: `place_sale`, `set_payment_status`, `set_fulfillment_status`
//!
//! Collaborators are the [`PartyDirectory`] (does a party exist) and the
//! [`NotificationEmitter`], which is only called after a commit succeeded.

mod cascade;
pub mod commands;
pub mod config;
mod donation;
pub mod engine;
pub mod error;
mod exchange;
mod listing;
pub mod retry;
mod sale;
pub mod services;

pub use commands::{
    DonationResolution, ExchangeResolution, ListProduct, PlaceSale, ProposeExchange,
    RequestDonation, ResolveDonation, ResolveExchange, SalePlacement, SetFulfillmentStatus,
    SetPaymentStatus, UpdateListing,
};
pub use config::EngineConfig;
pub use engine::ConsistencyEngine;
pub use error::{EngineError, ErrorKind, Result};
pub use retry::RetryPolicy;
pub use services::{
    InMemoryNotificationEmitter, InMemoryPartyDirectory, Notification, NotificationEmitter,
    NotificationKind, PartyDirectory, TracingNotificationEmitter,
};
