//! Read model views for the query side.

pub mod seller_payouts;

pub use seller_payouts::{SellerPayout, SellerPayoutsView};
