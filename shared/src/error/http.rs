//! HTTP status code mapping for error codes

use super::codes::ErrorCode;
use http::StatusCode;

impl ErrorCode {
    /// Get the appropriate HTTP status code for this error code
    pub fn http_status(&self) -> StatusCode {
        match self {
            // Success
            Self::Success => StatusCode::OK,

            // 404 Not Found
            Self::MemberNotFound | Self::LoanNotFound => StatusCode::NOT_FOUND,

            // 409 Conflict
            Self::MemberAlreadyExists => StatusCode::CONFLICT,

            // 401 Unauthorized
            Self::WebhookSignatureInvalid => StatusCode::UNAUTHORIZED,

            // 413 Payload Too Large
            Self::FileTooLarge => StatusCode::PAYLOAD_TOO_LARGE,

            // 502 Bad Gateway (upstream could not be reached)
            Self::ImageDownloadFailed => StatusCode::BAD_GATEWAY,

            // 500 Internal Server Error
            Self::InternalError
            | Self::WebhookSecretMissing
            | Self::FileStorageFailed => StatusCode::INTERNAL_SERVER_ERROR,

            // 400 Bad Request (default for validation/policy errors)
            _ => StatusCode::BAD_REQUEST,
        }
    }
}
