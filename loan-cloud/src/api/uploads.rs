//! Loan photo intake
//!
//! POST /api/uploads/loan-photo — multipart (`photo` or `file` + `member_id`)
//! or a remote `image_url` (multipart field or JSON body).
//!
//! The claim row is created before the upload so its id can name the object;
//! the returned `upload_id` is what checkout and swap consume.

use axum::Json;
use axum::extract::{FromRequest, Multipart, Request, State};
use axum::extract::multipart::MultipartError;
use http::StatusCode;
use http::header::CONTENT_TYPE;
use serde::Deserialize;
use serde_json::json;
use shared::error::{AppError, ErrorCode};
use shared::models::PhotoUploadResponse;

use crate::db;
use crate::error::ServiceResult;
use crate::state::AppState;
use crate::storage::{self, PhotoUpload, StorageError};
use crate::validation::{MAX_ID_LEN, MAX_URL_LEN, validate_required_text};

/// Fields collected from either body form
#[derive(Debug, Default, Deserialize)]
struct UploadForm {
    #[serde(default, alias = "memberId")]
    member_id: Option<String>,
    #[serde(default, alias = "imageUrl")]
    image_url: Option<String>,
    #[serde(skip)]
    file: Option<PhotoUpload>,
}

pub async fn upload_loan_photo(
    State(state): State<AppState>,
    request: Request,
) -> ServiceResult<(StatusCode, Json<PhotoUploadResponse>)> {
    // 1. Read the body in whichever form it came
    let form = read_form(&state, request).await?;

    let member_id = form.member_id.unwrap_or_default();
    validate_required_text(&member_id, "member_id", MAX_ID_LEN)?;
    if db::members::find_by_id(&state.pool, &member_id)
        .await?
        .is_none()
    {
        return Err(AppError::member_not_found(member_id).into());
    }

    // 2. Photo bytes: direct file wins over a URL
    let upload = match (form.file, form.image_url) {
        (Some(file), _) => file,
        (None, Some(url)) if !url.trim().is_empty() => {
            validate_required_text(&url, "image_url", MAX_URL_LEN)?;
            storage::download(&state.http, &url).await.map_err(AppError::from)?
        }
        _ => {
            return Err(AppError::with_message(
                ErrorCode::NoFileProvided,
                "Photo file or image_url is required",
            )
            .into());
        }
    };

    // 3. Claim first
    let now = shared::util::now_millis();
    let claim_id = shared::util::new_id();
    let metadata = upload.metadata(&member_id);
    db::photo_claims::create(&state.pool, &claim_id, &metadata, now).await?;

    // 4. Store the bytes
    let storage_key = storage::storage_key(&member_id, &claim_id, &upload.mime_type);
    if let Err(e) = state.photos.put(&storage_key, &upload).await {
        if let Err(discard_err) = db::photo_claims::discard(&state.pool, &claim_id).await {
            tracing::warn!(claim_id = %claim_id, error = %discard_err, "Failed to discard orphan claim");
        }
        return Err(AppError::from(e).into());
    }

    // 5. Record where it landed
    db::photo_claims::finalize(&state.pool, &claim_id, &storage_key, &metadata).await?;

    // 6. Audit
    if let Err(e) = db::audit::log(
        &state.pool,
        &member_id,
        "photo_upload",
        &json!({
            "upload_id": claim_id,
            "storage_key": storage_key,
            "original_name": upload.original_name,
            "mime_type": upload.mime_type,
            "size": upload.size(),
        }),
        now,
    )
    .await
    {
        tracing::warn!(claim_id = %claim_id, error = %e, "Failed to audit photo upload");
    }

    tracing::info!(
        member_id = %member_id,
        claim_id = %claim_id,
        size = upload.size(),
        "Loan photo uploaded"
    );

    Ok((
        StatusCode::CREATED,
        Json(PhotoUploadResponse {
            upload_id: claim_id,
            storage_key,
        }),
    ))
}

async fn read_form(state: &AppState, request: Request) -> Result<UploadForm, AppError> {
    let is_json = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/json"));

    if is_json {
        let Json(form) = Json::<UploadForm>::from_request(request, state)
            .await
            .map_err(|e| AppError::invalid_request(e.body_text()))?;
        return Ok(form);
    }

    let multipart = Multipart::from_request(request, state)
        .await
        .map_err(|e| AppError::invalid_request(e.body_text()))?;
    read_multipart(multipart).await
}

async fn read_multipart(mut multipart: Multipart) -> Result<UploadForm, AppError> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "photo" | "file" => {
                // First file part wins
                if form.file.is_some() {
                    continue;
                }
                let file_name = field.file_name().map(str::to_string);
                let content_type = field.content_type().map(str::to_string);
                let bytes = field.bytes().await.map_err(multipart_error)?;
                let upload = PhotoUpload::from_file(
                    bytes.to_vec(),
                    content_type.as_deref(),
                    file_name.as_deref(),
                )
                .map_err(AppError::from)?;
                form.file = Some(upload);
            }
            "member_id" | "memberId" => {
                form.member_id = Some(field.text().await.map_err(multipart_error)?);
            }
            "image_url" | "imageUrl" => {
                form.image_url = Some(field.text().await.map_err(multipart_error)?);
            }
            _ => {}
        }
    }

    Ok(form)
}

fn multipart_error(e: MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return AppError::from(StorageError::TooLarge);
    }
    AppError::with_message(ErrorCode::InvalidRequest, format!("Multipart error: {}", e.body_text()))
}
