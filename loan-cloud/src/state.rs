//! Application state for loan-cloud

use std::sync::Arc;
use std::time::Duration;

use aws_sdk_s3::Client as S3Client;
use sqlx::PgPool;

use crate::config::Config;
use crate::db::ledger::PgLedger;
use crate::idempotency::{IdempotencyStore, MemoryIdempotencyStore};
use crate::ledger::{LoanLedger, TierPolicyTable};
use crate::storage::PhotoStorage;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Timeout for fetching remote photos
const PHOTO_DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(15);

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// PostgreSQL connection pool
    pub pool: PgPool,
    /// Checkout / return / swap engine
    pub ledger: Arc<LoanLedger<PgLedger>>,
    /// Photo bucket
    pub photos: PhotoStorage,
    /// Client for remote photo downloads
    pub http: reqwest::Client,
    /// Shopify webhook signing secret
    pub shopify_webhook_secret: String,
    /// Replay cache for mutating requests
    pub idempotency: Arc<dyn IdempotencyStore>,
}

impl AppState {
    /// Create a new AppState
    pub async fn new(config: &Config) -> Result<Self, BoxError> {
        let pool = PgPool::connect(&config.database_url).await?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        let aws_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        let s3 = match &config.photo_s3_endpoint {
            Some(endpoint) => {
                tracing::info!(endpoint = %endpoint, "Using custom S3 endpoint");
                let s3_config = aws_sdk_s3::config::Builder::from(&aws_config)
                    .endpoint_url(endpoint)
                    .force_path_style(true)
                    .build();
                S3Client::from_conf(s3_config)
            }
            None => S3Client::new(&aws_config),
        };

        let http = reqwest::Client::builder()
            .timeout(PHOTO_DOWNLOAD_TIMEOUT)
            .build()?;

        Ok(Self::from_parts(
            pool,
            config.tier_policy.clone(),
            PhotoStorage::new(s3, config.photo_s3_bucket.clone()),
            http,
            config.shopify_webhook_secret.clone(),
            Duration::from_secs(config.idempotency_ttl_secs),
        ))
    }

    fn from_parts(
        pool: PgPool,
        policies: TierPolicyTable,
        photos: PhotoStorage,
        http: reqwest::Client,
        shopify_webhook_secret: String,
        idempotency_ttl: Duration,
    ) -> Self {
        let ledger = LoanLedger::new(PgLedger::new(pool.clone()), policies);
        Self {
            pool,
            ledger: Arc::new(ledger),
            photos,
            http,
            shopify_webhook_secret,
            idempotency: Arc::new(MemoryIdempotencyStore::new(idempotency_ttl)),
        }
    }

    pub fn policies(&self) -> &TierPolicyTable {
        self.ledger.policies()
    }
}
