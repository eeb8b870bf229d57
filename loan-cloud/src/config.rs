//! Service configuration

use std::path::Path;

use crate::ledger::TierPolicyTable;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// loan-cloud configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// PostgreSQL connection URL
    pub database_url: String,
    /// HTTP port
    pub http_port: u16,
    /// Environment: development | staging | production
    pub environment: String,
    /// Shared secret for subscription webhook signatures
    pub shopify_webhook_secret: String,
    /// S3 bucket for loan photos
    pub photo_s3_bucket: String,
    /// Custom S3-compatible endpoint (MinIO, R2, ...)
    pub photo_s3_endpoint: Option<String>,
    /// How long a replayable response stays cached
    pub idempotency_ttl_secs: u64,
    /// Allowances per tier
    pub tier_policy: TierPolicyTable,
}

impl Config {
    /// Require a secret env var: must be set and non-empty in non-development environments.
    fn require_secret(name: &str, environment: &str) -> Result<String, BoxError> {
        let val = match std::env::var(name) {
            Ok(v) => v,
            Err(_) => {
                if environment != "development" {
                    return Err(format!("{name} must be set in {environment} environment").into());
                }
                format!("dev-{name}-not-for-production")
            }
        };
        if val.is_empty() && environment != "development" {
            return Err(format!("{name} must not be empty in {environment} environment").into());
        }
        Ok(val)
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, BoxError> {
        let environment = std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let tier_policy = load_tier_policy(
            std::env::var("TIER_POLICY").ok().filter(|s| !s.is_empty()),
            std::env::var("TIER_POLICY_PATH").ok().filter(|s| !s.is_empty()),
        )?;

        Ok(Self {
            database_url: std::env::var("DATABASE_URL").map_err(|_| "DATABASE_URL must be set")?,
            http_port: std::env::var("HTTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            environment: environment.clone(),
            shopify_webhook_secret: Self::require_secret("SHOPIFY_WEBHOOK_SECRET", &environment)?,
            photo_s3_bucket: std::env::var("PHOTO_S3_BUCKET")
                .unwrap_or_else(|_| "loan-photos".into()),
            photo_s3_endpoint: std::env::var("PHOTO_S3_ENDPOINT")
                .ok()
                .filter(|s| !s.is_empty()),
            idempotency_ttl_secs: std::env::var("IDEMPOTENCY_TTL_SECS")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(600),
            tier_policy,
        })
    }
}

/// Resolve the tier policy table.
///
/// Inline JSON wins over a file path; with neither, the built-in defaults apply.
pub fn load_tier_policy(
    inline: Option<String>,
    path: Option<String>,
) -> Result<TierPolicyTable, BoxError> {
    if let Some(doc) = inline {
        return Ok(TierPolicyTable::from_json(&doc)?);
    }
    if let Some(path) = path {
        let doc = std::fs::read_to_string(Path::new(&path))
            .map_err(|e| format!("failed to read TIER_POLICY_PATH {path}: {e}"))?;
        return Ok(TierPolicyTable::from_json(&doc)?);
    }
    Ok(TierPolicyTable::default())
}
