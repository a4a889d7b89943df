use crate::auth::RequestPrincipal;
use crate::error::{ErrorResponse, HttpAppError};
use crate::services::types::{UploadBody, UploadDescriptor, UploadOptions};
use crate::state::AppState;
use axum::{
    body::Body,
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use futures::TryStreamExt;
use podstore_core::{AppError, FileCategory, UploadedObject};
use podstore_storage::ObjectReader;
use serde::Deserialize;
use std::io;
use std::sync::Arc;
use tokio_util::io::StreamReader;
use utoipa::IntoParams;

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

#[derive(Debug, Deserialize, IntoParams)]
pub struct UploadQuery {
    /// Original file name; its extension takes part in validation
    pub filename: Option<String>,
    /// Extra key segments below the tenant namespace, e.g. `covers`
    pub prefix: Option<String>,
    /// Category the file must belong to (`audio`, `image`, `video`, `document`)
    pub file_type: Option<String>,
    /// Return a signed URL valid for this many seconds instead of the public URL
    pub expires_in: Option<String>,
}

/// Parse an optional `expires_in` query value. Range checks happen later.
pub(crate) fn parse_expiry(raw: Option<&str>) -> Result<Option<f64>, AppError> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };
    raw.parse::<f64>().map(Some).map_err(|_| {
        AppError::InvalidExpiry(format!("expires_in must be a number of seconds, got {:?}", raw))
    })
}

fn parse_file_type(raw: Option<&str>) -> Result<Option<FileCategory>, AppError> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<FileCategory>()
                .map_err(|e| AppError::InvalidInput(e.to_string()))
        })
        .transpose()
}

fn content_length(headers: &HeaderMap) -> Result<u64, AppError> {
    headers
        .get(header::CONTENT_LENGTH)
        .ok_or_else(|| AppError::InvalidInput("Content-Length header is required".to_string()))?
        .to_str()
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .ok_or_else(|| AppError::InvalidInput("Invalid Content-Length header".to_string()))
}

#[utoipa::path(
    put,
    path = "/api/v0/objects",
    tag = "objects",
    params(UploadQuery),
    request_body(
        content = Vec<u8>,
        description = "Raw file bytes; Content-Type is the declared type",
        content_type = "application/octet-stream"
    ),
    responses(
        (status = 201, description = "Object stored", body = UploadedObject),
        (status = 400, description = "Invalid request or expiry", body = ErrorResponse),
        (status = 401, description = "Missing caller identity", body = ErrorResponse),
        (status = 413, description = "Body exceeds the largest category limit"),
        (status = 422, description = "Content validation failed", body = ErrorResponse),
        (status = 500, description = "Storage failure", body = ErrorResponse)
    )
)]
#[tracing::instrument(
    skip(state, principal, query, headers, body),
    fields(tenant_id = %principal.tenant_id, user_id = %principal.user_id)
)]
pub async fn upload_object(
    State(state): State<Arc<AppState>>,
    RequestPrincipal(principal): RequestPrincipal,
    Query(query): Query<UploadQuery>,
    headers: HeaderMap,
    body: Body,
) -> Result<impl IntoResponse, HttpAppError> {
    let filename = query
        .filename
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::InvalidInput("filename query parameter is required".to_string()))?
        .to_string();
    let options = UploadOptions {
        prefix: query.prefix.clone(),
        file_type: parse_file_type(query.file_type.as_deref())?,
        expires_in: parse_expiry(query.expires_in.as_deref())?,
    };
    let content_length = content_length(&headers)?;
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or(DEFAULT_CONTENT_TYPE)
        .to_string();

    let stream = body.into_data_stream().map_err(io::Error::other);
    let reader: ObjectReader = Box::pin(StreamReader::new(stream));

    let uploaded = state
        .gateway
        .upload(
            &principal,
            UploadDescriptor {
                filename,
                content_type,
                body: UploadBody::Streamed {
                    reader,
                    byte_count: content_length,
                },
            },
            options,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(uploaded)))
}
