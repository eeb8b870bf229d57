//! Photo Claim Model

use serde::{Deserialize, Serialize};

/// Uploaded photo awaiting (or already bound to) a loan
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct PhotoClaim {
    pub id: String,
    pub storage_key: String,
    pub metadata: serde_json::Value,
    pub loan_id: Option<String>,
    pub created_at: i64,
}

/// Photo intake response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhotoUploadResponse {
    pub upload_id: String,
    pub storage_key: String,
}
