//! Loan photo intake and object storage
//!
//! Photos land in S3 (or any S3-compatible store) at
//! `loans/{member_id}/{claim_id}.{ext}`. Remote photos are streamed with a
//! hard size cap so an oversized body is never buffered whole.

use aws_sdk_s3::Client as S3Client;
use aws_sdk_s3::primitives::ByteStream;
use futures::StreamExt;
use serde_json::json;
use shared::error::{AppError, ErrorCode};
use thiserror::Error;

/// Upper bound for a single photo (5MB)
pub const MAX_PHOTO_BYTES: usize = 5 * 1024 * 1024;

pub const ALLOWED_MIME_TYPES: &[&str] = &["image/jpeg", "image/png", "image/gif", "image/webp"];

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Unsupported file type: {0}")]
    UnsupportedType(String),
    #[error("Image exceeds size limit (5MB)")]
    TooLarge,
    #[error("Empty file")]
    Empty,
    #[error("Invalid image_url: {0}")]
    InvalidUrl(String),
    #[error("Failed to download image: {0}")]
    Download(String),
    #[error("Object store write failed: {0}")]
    Put(String),
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        let code = match &err {
            StorageError::UnsupportedType(_) => ErrorCode::UnsupportedFileFormat,
            StorageError::TooLarge => ErrorCode::FileTooLarge,
            StorageError::Empty => ErrorCode::EmptyFile,
            StorageError::InvalidUrl(_) => ErrorCode::InvalidFormat,
            StorageError::Download(_) => ErrorCode::ImageDownloadFailed,
            StorageError::Put(_) => ErrorCode::FileStorageFailed,
        };
        match err {
            // Store internals stay in the logs
            StorageError::Put(_) => AppError::new(code),
            other => AppError::with_message(code, other.to_string()),
        }
    }
}

/// Photo bytes plus what we know about them
#[derive(Debug, Clone)]
pub struct PhotoUpload {
    pub bytes: Vec<u8>,
    pub mime_type: String,
    pub original_name: String,
}

impl PhotoUpload {
    /// Validate a directly uploaded file.
    ///
    /// `declared_type` is the part's Content-Type; when absent or generic the
    /// type is guessed from the file name.
    pub fn from_file(
        bytes: Vec<u8>,
        declared_type: Option<&str>,
        file_name: Option<&str>,
    ) -> Result<Self, StorageError> {
        let original_name = file_name
            .filter(|n| !n.is_empty())
            .unwrap_or("upload")
            .to_string();

        let declared = declared_type
            .map(normalize_mime)
            .filter(|m| !m.is_empty() && m != "application/octet-stream");
        let mime_type = match declared {
            Some(m) => m,
            None => mime_guess::from_path(&original_name)
                .first()
                .map(|m| m.essence_str().to_string())
                .unwrap_or_default(),
        };

        let mime_type = check_mime(&mime_type)?;
        check_size(bytes.len())?;

        Ok(Self {
            bytes,
            mime_type,
            original_name,
        })
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    /// Claim metadata recorded alongside the storage key
    pub fn metadata(&self, member_id: &str) -> serde_json::Value {
        json!({
            "member_id": member_id,
            "original_name": self.original_name,
            "mime_type": self.mime_type,
            "size": self.size(),
        })
    }
}

/// Lower-cased MIME essence without parameters
pub fn normalize_mime(raw: &str) -> String {
    raw.split(';').next().unwrap_or("").trim().to_ascii_lowercase()
}

pub fn check_mime(raw: &str) -> Result<String, StorageError> {
    let mime = normalize_mime(raw);
    if ALLOWED_MIME_TYPES.contains(&mime.as_str()) {
        Ok(mime)
    } else {
        Err(StorageError::UnsupportedType(if mime.is_empty() {
            "unknown".to_string()
        } else {
            mime
        }))
    }
}

pub fn check_size(len: usize) -> Result<(), StorageError> {
    if len == 0 {
        return Err(StorageError::Empty);
    }
    if len > MAX_PHOTO_BYTES {
        return Err(StorageError::TooLarge);
    }
    Ok(())
}

/// File extension for an allowed MIME type
pub fn extension_for(mime: &str) -> &'static str {
    match mime {
        "image/png" => "png",
        "image/gif" => "gif",
        "image/webp" => "webp",
        _ => "jpg",
    }
}

pub fn storage_key(member_id: &str, claim_id: &str, mime: &str) -> String {
    format!("loans/{member_id}/{claim_id}.{}", extension_for(mime))
}

/// Download a remote photo, enforcing the MIME allow-list and size cap.
pub async fn download(http: &reqwest::Client, image_url: &str) -> Result<PhotoUpload, StorageError> {
    let url = reqwest::Url::parse(image_url.trim())
        .map_err(|e| StorageError::InvalidUrl(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(StorageError::InvalidUrl(format!(
            "unsupported scheme {}",
            url.scheme()
        )));
    }

    let response = http
        .get(url.clone())
        .send()
        .await
        .map_err(|e| StorageError::Download(e.to_string()))?;
    if !response.status().is_success() {
        return Err(StorageError::Download(format!("status {}", response.status())));
    }

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    let mime_type = check_mime(content_type)?;

    if let Some(len) = response.content_length()
        && len > MAX_PHOTO_BYTES as u64
    {
        return Err(StorageError::TooLarge);
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| StorageError::Download(e.to_string()))?;
        if bytes.len() + chunk.len() > MAX_PHOTO_BYTES {
            return Err(StorageError::TooLarge);
        }
        bytes.extend_from_slice(&chunk);
    }
    check_size(bytes.len())?;

    Ok(PhotoUpload {
        original_name: remote_name(&url, &mime_type),
        bytes,
        mime_type,
    })
}

fn remote_name(url: &reqwest::Url, mime: &str) -> String {
    url.path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("remote-image.{}", extension_for(mime)))
}

/// S3 bucket holding loan photos
#[derive(Clone)]
pub struct PhotoStorage {
    client: S3Client,
    bucket: String,
}

impl PhotoStorage {
    pub fn new(client: S3Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }

    pub async fn put(&self, key: &str, upload: &PhotoUpload) -> Result<(), StorageError> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(upload.bytes.clone()))
            .content_type(&upload.mime_type)
            .metadata("size", upload.size().to_string())
            .send()
            .await
            .map_err(|e| {
                tracing::error!(key = %key, error = %e, "S3 upload failed");
                StorageError::Put(e.to_string())
            })?;
        Ok(())
    }
}
