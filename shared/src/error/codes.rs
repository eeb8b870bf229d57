//! Unified error codes for the loan service
//!
//! Error codes are organized by category:
//! - 0xxx: General errors
//! - 1xxx: Webhook errors
//! - 2xxx: Member errors
//! - 3xxx: Allowance errors
//! - 4xxx: Loan errors
//! - 5xxx: Photo errors
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// All error codes are represented as u16 values so clients can branch on
/// them without parsing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Operation completed successfully
    Success = 0,
    /// Validation failed
    ValidationFailed = 2,
    /// Invalid request
    InvalidRequest = 5,
    /// Invalid format
    InvalidFormat = 6,
    /// Required field missing
    RequiredField = 7,
    /// Value out of range
    ValueOutOfRange = 8,
    /// Idempotency key header missing
    IdempotencyKeyRequired = 9,

    // ==================== 1xxx: Webhook ====================
    /// Webhook signature missing or does not match
    WebhookSignatureInvalid = 1001,
    /// Webhook secret not configured
    WebhookSecretMissing = 1002,
    /// Webhook payload could not be parsed
    WebhookPayloadInvalid = 1003,
    /// Plan handle does not map to a tier
    UnsupportedPlan = 1004,

    // ==================== 2xxx: Member ====================
    /// Member not found
    MemberNotFound = 2001,
    /// Member already enrolled (card token or customer id taken)
    MemberAlreadyExists = 2002,
    /// Subscription is paused
    SubscriptionPaused = 2003,
    /// Subscription is cancelled or otherwise inactive
    SubscriptionInactive = 2004,

    // ==================== 3xxx: Allowance ====================
    /// Monthly item allowance used up
    ItemAllowanceExhausted = 3001,
    /// Too many items currently out
    TooManyItemsOut = 3002,
    /// Monthly swap allowance used up
    SwapAllowanceExhausted = 3003,
    /// No active loan that could be swapped
    NothingToSwap = 3004,

    // ==================== 4xxx: Loan ====================
    /// Loan not found
    LoanNotFound = 4001,
    /// Loan belongs to another member
    LoanNotOwned = 4002,
    /// Loan has already been returned
    LoanAlreadyReturned = 4003,

    // ==================== 5xxx: Photo ====================
    /// Photo claim missing or already consumed
    PhotoClaimInvalid = 5001,
    /// File too large
    FileTooLarge = 5101,
    /// Unsupported file format
    UnsupportedFileFormat = 5102,
    /// No file provided in request
    NoFileProvided = 5103,
    /// Empty file provided
    EmptyFile = 5104,
    /// Remote image could not be downloaded
    ImageDownloadFailed = 5105,
    /// Object storage write failed
    FileStorageFailed = 5106,

    // ==================== 9xxx: System ====================
    /// Internal server error
    InternalError = 9001,
}

impl ErrorCode {
    /// Get the numeric code value
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    /// Get the developer-facing English message for this error code
    pub const fn message(&self) -> &'static str {
        match self {
            // General
            ErrorCode::Success => "Operation completed successfully",
            ErrorCode::ValidationFailed => "Validation failed",
            ErrorCode::InvalidRequest => "Invalid request",
            ErrorCode::InvalidFormat => "Invalid format",
            ErrorCode::RequiredField => "Required field is missing",
            ErrorCode::ValueOutOfRange => "Value is out of range",
            ErrorCode::IdempotencyKeyRequired => "Missing idempotency key",

            // Webhook
            ErrorCode::WebhookSignatureInvalid => "Invalid webhook signature",
            ErrorCode::WebhookSecretMissing => "Webhook secret not configured",
            ErrorCode::WebhookPayloadInvalid => "Invalid webhook payload",
            ErrorCode::UnsupportedPlan => "Unsupported plan handle",

            // Member
            ErrorCode::MemberNotFound => "Member not found",
            ErrorCode::MemberAlreadyExists => "Member already exists",
            ErrorCode::SubscriptionPaused => "Subscription is paused - no new loans allowed",
            ErrorCode::SubscriptionInactive => "Subscription inactive",

            // Allowance
            ErrorCode::ItemAllowanceExhausted => "Monthly item allowance exhausted",
            ErrorCode::TooManyItemsOut => "Too many items out",
            ErrorCode::SwapAllowanceExhausted => "Monthly swap allowance exhausted",
            ErrorCode::NothingToSwap => "No items out to swap",

            // Loan
            ErrorCode::LoanNotFound => "Loan not found",
            ErrorCode::LoanNotOwned => "Loan does not belong to member",
            ErrorCode::LoanAlreadyReturned => "Loan already returned",

            // Photo
            ErrorCode::PhotoClaimInvalid => "Invalid upload reference",
            ErrorCode::FileTooLarge => "Image exceeds size limit (5MB)",
            ErrorCode::UnsupportedFileFormat => "Invalid file type",
            ErrorCode::NoFileProvided => "Photo file or image_url is required",
            ErrorCode::EmptyFile => "Empty file provided",
            ErrorCode::ImageDownloadFailed => "Failed to download image",
            ErrorCode::FileStorageFailed => "File storage failed",

            // System
            ErrorCode::InternalError => "Internal server error",
        }
    }
}

impl From<ErrorCode> for u16 {
    #[inline]
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

/// Error when converting from an invalid u16 to ErrorCode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            // General
            0 => Ok(ErrorCode::Success),
            2 => Ok(ErrorCode::ValidationFailed),
            5 => Ok(ErrorCode::InvalidRequest),
            6 => Ok(ErrorCode::InvalidFormat),
            7 => Ok(ErrorCode::RequiredField),
            8 => Ok(ErrorCode::ValueOutOfRange),
            9 => Ok(ErrorCode::IdempotencyKeyRequired),

            // Webhook
            1001 => Ok(ErrorCode::WebhookSignatureInvalid),
            1002 => Ok(ErrorCode::WebhookSecretMissing),
            1003 => Ok(ErrorCode::WebhookPayloadInvalid),
            1004 => Ok(ErrorCode::UnsupportedPlan),

            // Member
            2001 => Ok(ErrorCode::MemberNotFound),
            2002 => Ok(ErrorCode::MemberAlreadyExists),
            2003 => Ok(ErrorCode::SubscriptionPaused),
            2004 => Ok(ErrorCode::SubscriptionInactive),

            // Allowance
            3001 => Ok(ErrorCode::ItemAllowanceExhausted),
            3002 => Ok(ErrorCode::TooManyItemsOut),
            3003 => Ok(ErrorCode::SwapAllowanceExhausted),
            3004 => Ok(ErrorCode::NothingToSwap),

            // Loan
            4001 => Ok(ErrorCode::LoanNotFound),
            4002 => Ok(ErrorCode::LoanNotOwned),
            4003 => Ok(ErrorCode::LoanAlreadyReturned),

            // Photo
            5001 => Ok(ErrorCode::PhotoClaimInvalid),
            5101 => Ok(ErrorCode::FileTooLarge),
            5102 => Ok(ErrorCode::UnsupportedFileFormat),
            5103 => Ok(ErrorCode::NoFileProvided),
            5104 => Ok(ErrorCode::EmptyFile),
            5105 => Ok(ErrorCode::ImageDownloadFailed),
            5106 => Ok(ErrorCode::FileStorageFailed),

            // System
            9001 => Ok(ErrorCode::InternalError),

            _ => Err(InvalidErrorCode(value)),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
