//! Error category classification

use super::codes::ErrorCode;
use serde::{Deserialize, Serialize};

/// Error category classification based on error code ranges
///
/// - 0xxx: General errors
/// - 1xxx: Webhook errors
/// - 2xxx: Member errors
/// - 3xxx: Allowance errors
/// - 4xxx: Loan errors
/// - 5xxx: Photo errors
/// - everything else: System errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// General errors (0xxx)
    General,
    /// Webhook errors (1xxx)
    Webhook,
    /// Member errors (2xxx)
    Member,
    /// Allowance errors (3xxx)
    Allowance,
    /// Loan errors (4xxx)
    Loan,
    /// Photo errors (5xxx)
    Photo,
    /// System errors (9xxx)
    System,
}

impl ErrorCategory {
    /// Determine category from error code value
    pub fn from_code(code: u16) -> Self {
        match code {
            0..1000 => Self::General,
            1000..2000 => Self::Webhook,
            2000..3000 => Self::Member,
            3000..4000 => Self::Allowance,
            4000..5000 => Self::Loan,
            5000..6000 => Self::Photo,
            _ => Self::System,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::General => "general",
            Self::Webhook => "webhook",
            Self::Member => "member",
            Self::Allowance => "allowance",
            Self::Loan => "loan",
            Self::Photo => "photo",
            Self::System => "system",
        }
    }
}

impl ErrorCode {
    /// Get the category for this error code
    pub fn category(&self) -> ErrorCategory {
        ErrorCategory::from_code(self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_from_code() {
        assert_eq!(ErrorCategory::from_code(0), ErrorCategory::General);
        assert_eq!(ErrorCategory::from_code(999), ErrorCategory::General);
        assert_eq!(ErrorCategory::from_code(1001), ErrorCategory::Webhook);
        assert_eq!(ErrorCategory::from_code(2001), ErrorCategory::Member);
        assert_eq!(ErrorCategory::from_code(3004), ErrorCategory::Allowance);
        assert_eq!(ErrorCategory::from_code(4001), ErrorCategory::Loan);
        assert_eq!(ErrorCategory::from_code(5106), ErrorCategory::Photo);
        assert_eq!(ErrorCategory::from_code(7000), ErrorCategory::System);
        assert_eq!(ErrorCategory::from_code(9001), ErrorCategory::System);
    }

    #[test]
    fn test_error_code_category() {
        assert_eq!(ErrorCode::Success.category(), ErrorCategory::General);
        assert_eq!(
            ErrorCode::WebhookSignatureInvalid.category(),
            ErrorCategory::Webhook
        );
        assert_eq!(
            ErrorCode::SubscriptionPaused.category(),
            ErrorCategory::Member
        );
        assert_eq!(
            ErrorCode::TooManyItemsOut.category(),
            ErrorCategory::Allowance
        );
        assert_eq!(ErrorCode::LoanNotFound.category(), ErrorCategory::Loan);
        assert_eq!(ErrorCode::PhotoClaimInvalid.category(), ErrorCategory::Photo);
        assert_eq!(ErrorCode::InternalError.category(), ErrorCategory::System);
    }

    #[test]
    fn test_category_serialize() {
        let json = serde_json::to_string(&ErrorCategory::Allowance).unwrap();
        assert_eq!(json, "\"allowance\"");
        let category: ErrorCategory = serde_json::from_str("\"loan\"").unwrap();
        assert_eq!(category, ErrorCategory::Loan);
    }
}
