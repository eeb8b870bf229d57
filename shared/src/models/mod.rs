//! Data models
//!
//! Shared between loan-cloud and API clients.
//! DB row types use `#[cfg_attr(feature = "db", derive(sqlx::FromRow))]`.
//! IDs are UUID strings, timestamps are Unix milliseconds.

pub mod loan;
pub mod member;
pub mod photo;

// Re-exports
pub use loan::*;
pub use member::*;
pub use photo::*;
