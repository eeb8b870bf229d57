//! Input validation helpers
//!
//! Shared by the HTTP handlers and the ledger, which re-checks its inputs
//! before opening a transaction.

use std::collections::HashSet;

use shared::error::{AppError, ErrorCode};

// ── Text length limits ──────────────────────────────────────────────

/// Member, loan and photo claim ids (UUID strings, some slack for imports)
pub const MAX_ID_LEN: usize = 64;

/// Card tokens and external customer ids
pub const MAX_SHORT_TEXT_LEN: usize = 100;

/// Store/location labels
pub const MAX_LOCATION_LEN: usize = 200;

/// Remote image URLs
pub const MAX_URL_LEN: usize = 2048;

/// Photos attached to a single checkout or swap
pub const MAX_PHOTOS_PER_LOAN: usize = 10;

// ── Validation helpers ──────────────────────────────────────────────

/// Validate that a required string is non-empty and within the length limit.
pub fn validate_required_text(value: &str, field: &str, max_len: usize) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::with_message(
            ErrorCode::RequiredField,
            format!("{field} must not be empty"),
        )
        .with_detail("field", field));
    }
    if value.len() > max_len {
        return Err(AppError::validation(format!(
            "{field} is too long ({} chars, max {max_len})",
            value.len()
        ))
        .with_detail("field", field));
    }
    Ok(())
}

/// Validate that an optional string, if present, is within the length limit.
pub fn validate_optional_text(
    value: &Option<String>,
    field: &str,
    max_len: usize,
) -> Result<(), AppError> {
    if let Some(v) = value
        && v.len() > max_len
    {
        return Err(AppError::validation(format!(
            "{field} is too long ({} chars, max {max_len})",
            v.len()
        ))
        .with_detail("field", field));
    }
    Ok(())
}

/// Validate a list of photo claim ids: 1..=MAX_PHOTOS_PER_LOAN, each a valid id, no repeats.
pub fn validate_photo_ids(ids: &[String]) -> Result<(), AppError> {
    if ids.is_empty() {
        return Err(AppError::with_message(
            ErrorCode::RequiredField,
            "At least one photo is required",
        )
        .with_detail("field", "photo_ids"));
    }
    if ids.len() > MAX_PHOTOS_PER_LOAN {
        return Err(AppError::with_message(
            ErrorCode::ValueOutOfRange,
            format!("Too many photos ({}, max {MAX_PHOTOS_PER_LOAN})", ids.len()),
        )
        .with_detail("field", "photo_ids"));
    }
    let mut seen = HashSet::with_capacity(ids.len());
    for id in ids {
        validate_required_text(id, "photo_ids", MAX_ID_LEN)?;
        if !seen.insert(id.as_str()) {
            return Err(AppError::validation(format!("Duplicate photo id: {id}"))
                .with_detail("field", "photo_ids"));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_required_text() {
        assert!(validate_required_text("Downtown", "store_location", MAX_LOCATION_LEN).is_ok());

        let err = validate_required_text("   ", "member_id", MAX_ID_LEN).unwrap_err();
        assert_eq!(err.code, ErrorCode::RequiredField);
        assert_eq!(err.detail("field").unwrap(), "member_id");

        let long = "x".repeat(MAX_ID_LEN + 1);
        let err = validate_required_text(&long, "loan_id", MAX_ID_LEN).unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationFailed);
    }

    #[test]
    fn test_optional_text() {
        assert!(validate_optional_text(&None, "shopify_customer_id", 10).is_ok());
        assert!(validate_optional_text(&Some("abc".into()), "shopify_customer_id", 10).is_ok());
        assert!(validate_optional_text(&Some("x".repeat(11)), "shopify_customer_id", 10).is_err());
    }

    #[test]
    fn test_photo_ids_bounds() {
        assert!(validate_photo_ids(&ids(&["p-1"])).is_ok());
        assert_eq!(
            validate_photo_ids(&[]).unwrap_err().code,
            ErrorCode::RequiredField
        );

        let many: Vec<String> = (0..=MAX_PHOTOS_PER_LOAN).map(|i| format!("p-{i}")).collect();
        assert_eq!(
            validate_photo_ids(&many).unwrap_err().code,
            ErrorCode::ValueOutOfRange
        );
    }

    #[test]
    fn test_photo_ids_rejects_duplicates_and_blanks() {
        let err = validate_photo_ids(&ids(&["p-1", "p-2", "p-1"])).unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationFailed);
        assert!(err.message.contains("p-1"));

        let err = validate_photo_ids(&ids(&["p-1", ""])).unwrap_err();
        assert_eq!(err.code, ErrorCode::RequiredField);
    }
}
