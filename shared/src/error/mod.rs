//! Unified error system for the loan service
//!
//! - [`ErrorCode`]: Standardized error codes for all error types
//! - [`ErrorCategory`]: Classification of errors by domain
//! - [`AppError`]: Rich error type with codes, messages, and details
//! - [`ApiResponse`]: JSON body of every error response
//!
//! # Error Code Ranges
//!
//! - 0xxx: General errors
//! - 1xxx: Webhook errors
//! - 2xxx: Member errors
//! - 3xxx: Allowance errors
//! - 4xxx: Loan errors
//! - 5xxx: Photo errors
//! - 9xxx: System errors
//!
//! # Example
//!
//! ```
//! use shared::error::{AppError, ErrorCode, ApiResponse};
//!
//! let err = AppError::new(ErrorCode::LoanNotFound);
//!
//! let err = AppError::with_message(ErrorCode::TooManyItemsOut, "PLUS plan: Maximum 2 items allowed out")
//!     .with_detail("tier", "PLUS")
//!     .with_detail("limit", 2);
//!
//! let body = ApiResponse::error(&err);
//! assert_eq!(body.code, 3002);
//! ```

mod category;
mod codes;
mod http;
mod types;

pub use category::ErrorCategory;
pub use codes::{ErrorCode, InvalidErrorCode};
pub use types::{ApiResponse, AppError};
