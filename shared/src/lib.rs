//! Shared types for the loan service
//!
//! Error codes, response envelope and domain models used by loan-cloud
//! and its API clients.

pub mod error;
pub mod models;
pub mod util;

// Re-exports
pub use axum::Json;
pub use http;
pub use serde::{Deserialize, Serialize};
