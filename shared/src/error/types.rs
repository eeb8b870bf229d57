//! Error types and API response structures

use super::codes::ErrorCode;
use http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;

/// Application error with structured error code and details
///
/// Every denial the loan service produces is an `AppError`:
/// - a stable [`ErrorCode`] clients branch on
/// - a human-readable message
/// - optional structured details (tier, limit, used, remaining, ids)
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct AppError {
    /// The error code identifying the type of error
    pub code: ErrorCode,
    /// Human-readable error message
    pub message: String,
    /// Optional additional details
    pub details: Option<HashMap<String, Value>>,
}

impl AppError {
    /// Create a new error with the default message for the error code
    pub fn new(code: ErrorCode) -> Self {
        Self {
            message: code.message().to_string(),
            code,
            details: None,
        }
    }

    /// Create a new error with a custom message
    pub fn with_message(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    /// Add a detail entry to this error
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.details
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value.into());
        self
    }

    /// Look up a detail entry
    pub fn detail(&self, key: &str) -> Option<&Value> {
        self.details.as_ref().and_then(|d| d.get(key))
    }

    /// Get the HTTP status code for this error
    pub fn http_status(&self) -> StatusCode {
        self.code.http_status()
    }

    // ==================== Convenience constructors ====================

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::ValidationFailed, msg)
    }

    /// Create an invalid request error
    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::InvalidRequest, msg)
    }

    /// Create a member not found error
    pub fn member_not_found(member_id: impl Into<String>) -> Self {
        Self::new(ErrorCode::MemberNotFound).with_detail("member_id", member_id.into())
    }

    /// Create a loan not found error
    pub fn loan_not_found(loan_id: impl Into<String>) -> Self {
        Self::new(ErrorCode::LoanNotFound).with_detail("loan_id", loan_id.into())
    }
}

/// Error body returned by every failing endpoint
///
/// - `code`: numeric [`ErrorCode`]
/// - `message`: human-readable message
/// - `details`: structured context (tier, limit, ids)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse {
    pub code: u16,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<HashMap<String, Value>>,
}

impl ApiResponse {
    /// Build the error body for an AppError
    pub fn error(err: &AppError) -> Self {
        Self {
            code: err.code.code(),
            message: err.message.clone(),
            details: err.details.clone(),
        }
    }
}

// ===== Axum Integration =====

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        use axum::Json;

        let status = self.http_status();
        let body = ApiResponse::error(&self);

        if matches!(self.code.category(), super::category::ErrorCategory::System) {
            tracing::error!(
                code = %self.code,
                message = %self.message,
                "System error occurred"
            );
        }

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_error_new() {
        let err = AppError::new(ErrorCode::LoanNotFound);
        assert_eq!(err.code, ErrorCode::LoanNotFound);
        assert_eq!(err.message, "Loan not found");
        assert!(err.details.is_none());
    }

    #[test]
    fn test_app_error_with_detail() {
        let err = AppError::with_message(ErrorCode::ItemAllowanceExhausted, "BASIC plan")
            .with_detail("tier", "BASIC")
            .with_detail("limit", 2)
            .with_detail("remaining", 0);

        assert_eq!(err.detail("tier").unwrap(), "BASIC");
        assert_eq!(err.detail("limit").unwrap(), 2);
        assert_eq!(err.detail("remaining").unwrap(), 0);
        assert!(err.detail("used").is_none());
    }

    #[test]
    fn test_app_error_http_status() {
        assert_eq!(
            AppError::member_not_found("m-1").http_status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::new(ErrorCode::WebhookSignatureInvalid).http_status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::new(ErrorCode::NothingToSwap).http_status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_app_error_convenience_constructors() {
        let err = AppError::loan_not_found("loan-9");
        assert_eq!(err.code, ErrorCode::LoanNotFound);
        assert_eq!(err.detail("loan_id").unwrap(), "loan-9");

        let err = AppError::member_not_found("m-1");
        assert_eq!(err.detail("member_id").unwrap(), "m-1");

        let err = AppError::validation("photo_ids must not be empty");
        assert_eq!(err.code, ErrorCode::ValidationFailed);

        let err = AppError::invalid_request("bad body");
        assert_eq!(err.code, ErrorCode::InvalidRequest);
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::with_message(ErrorCode::LoanNotFound, "Loan loan-9 not found");
        assert_eq!(format!("{}", err), "Loan loan-9 not found");
    }

    #[test]
    fn test_api_response_error() {
        let err = AppError::new(ErrorCode::PhotoClaimInvalid)
            .with_detail("missing_ids", vec!["p-1".to_string()]);
        let response = ApiResponse::error(&err);

        assert_eq!(response.code, 5001);
        assert_eq!(response.message, "Invalid upload reference");
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["details"]["missing_ids"], serde_json::json!(["p-1"]));
    }

    #[test]
    fn test_api_response_omits_empty_details() {
        let response = ApiResponse::error(&AppError::new(ErrorCode::NothingToSwap));
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"code\":3004"));
        assert!(!json.contains("details"));
    }

    #[test]
    fn test_into_response_uses_mapped_status() {
        use axum::response::IntoResponse;

        let response = AppError::member_not_found("m-1").into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
