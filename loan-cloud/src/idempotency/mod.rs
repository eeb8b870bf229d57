//! Idempotent replay of mutating requests
//!
//! POSTs (except webhooks and uploads) must carry `X-Idempotency-Key`. The
//! first response below 500 is cached for the TTL and replayed verbatim for
//! repeats of the same key.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::body::{Body, Bytes};
use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use dashmap::DashMap;
use http::header::CONTENT_TYPE;
use http::{HeaderValue, Method, StatusCode};
use shared::error::{AppError, ErrorCode};

pub const IDEMPOTENCY_HEADER: &str = "x-idempotency-key";

/// Paths that never require a key
const EXEMPT_PREFIXES: &[&str] = &["/api/webhooks", "/api/uploads"];

/// Upper bound on a response body we are willing to buffer for replay
const MAX_CACHED_BODY: usize = 1024 * 1024;

#[derive(Debug, Clone)]
pub struct CachedResponse {
    pub status: StatusCode,
    pub content_type: Option<HeaderValue>,
    pub body: Bytes,
}

impl IntoResponse for CachedResponse {
    fn into_response(self) -> Response {
        let mut response = (self.status, self.body).into_response();
        match self.content_type {
            Some(ct) => {
                response.headers_mut().insert(CONTENT_TYPE, ct);
            }
            None => {
                response.headers_mut().remove(CONTENT_TYPE);
            }
        }
        response
    }
}

pub trait IdempotencyStore: Send + Sync {
    fn get(&self, key: &str) -> Option<CachedResponse>;
    fn put(&self, key: String, response: CachedResponse);
    /// Drop expired entries, returning how many were removed
    fn purge_expired(&self) -> usize;
}

/// Process-local store keyed by idempotency key
pub struct MemoryIdempotencyStore {
    entries: DashMap<String, (Instant, CachedResponse)>,
    ttl: Duration,
}

impl MemoryIdempotencyStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

impl IdempotencyStore for MemoryIdempotencyStore {
    fn get(&self, key: &str) -> Option<CachedResponse> {
        {
            let entry = self.entries.get(key)?;
            if entry.0.elapsed() < self.ttl {
                return Some(entry.1.clone());
            }
        }
        self.entries
            .remove_if(key, |_, (stored_at, _)| stored_at.elapsed() >= self.ttl);
        None
    }

    fn put(&self, key: String, response: CachedResponse) {
        self.entries.insert(key, (Instant::now(), response));
    }

    fn purge_expired(&self) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|_, (stored_at, _)| stored_at.elapsed() < self.ttl);
        before.saturating_sub(self.entries.len())
    }
}

fn requires_key(request: &Request) -> bool {
    request.method() == Method::POST
        && !EXEMPT_PREFIXES
            .iter()
            .any(|prefix| request.uri().path().starts_with(prefix))
}

pub async fn idempotency_middleware(
    State(store): State<Arc<dyn IdempotencyStore>>,
    request: Request,
    next: Next,
) -> Response {
    if !requires_key(&request) {
        return next.run(request).await;
    }

    let key = request
        .headers()
        .get(IDEMPOTENCY_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(str::to_string);
    let Some(key) = key else {
        return AppError::new(ErrorCode::IdempotencyKeyRequired).into_response();
    };

    if let Some(cached) = store.get(&key) {
        tracing::debug!(idempotency_key = %key, "Replaying cached response");
        return cached.into_response();
    }

    let response = next.run(request).await;
    if response.status().is_server_error() {
        return response;
    }

    let (parts, body) = response.into_parts();
    let bytes = match axum::body::to_bytes(body, MAX_CACHED_BODY).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::error!(idempotency_key = %key, error = %e, "Failed to buffer response body");
            return AppError::new(ErrorCode::InternalError).into_response();
        }
    };

    store.put(
        key,
        CachedResponse {
            status: parts.status,
            content_type: parts.headers.get(CONTENT_TYPE).cloned(),
            body: bytes.clone(),
        },
    );

    Response::from_parts(parts, Body::from(bytes))
}
