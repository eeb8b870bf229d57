//! Database access layer

pub mod audit;
pub mod ledger;
pub mod loans;
pub mod members;
pub mod photo_claims;
pub mod webhook_events;
