//! Read models fed from the marketplace event log.
//!
//! - [`Projection`] folds events of chosen aggregate types into a view
//! - [`ReadModel`] gives query access to a view
//! - [`ProjectionProcessor`] streams the log to projections, tracking each one's position
//! - [`SellerPayoutsView`]: per-seller revenue from sales

pub mod error;
pub mod processor;
pub mod projection;
pub mod read_model;
pub mod views;

pub use error::{ProjectionError, Result};
pub use processor::ProjectionProcessor;
pub use projection::{Projection, ProjectionPosition};
pub use read_model::ReadModel;
pub use views::{SellerPayout, SellerPayoutsView};
