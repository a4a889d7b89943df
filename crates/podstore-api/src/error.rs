//! HTTP error response conversion
//!
//! Handlers return `Result<impl IntoResponse, HttpAppError>`. Domain errors
//! convert into `HttpAppError` through `From` so they render consistently
//! (status, body, logging).

use std::io;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use podstore_core::{AppError, ErrorMetadata, LogLevel};
use podstore_storage::StorageError;

pub use podstore_infra::ErrorResponse;

/// Wrapper type for AppError to implement IntoResponse
/// (orphan rule: both IntoResponse and AppError are foreign to this crate)
#[derive(Debug)]
pub struct HttpAppError(pub AppError);

impl From<AppError> for HttpAppError {
    fn from(err: AppError) -> Self {
        HttpAppError(err)
    }
}

impl From<anyhow::Error> for HttpAppError {
    fn from(err: anyhow::Error) -> Self {
        HttpAppError(AppError::from(err))
    }
}

impl From<StorageError> for HttpAppError {
    fn from(err: StorageError) -> Self {
        HttpAppError(map_storage_error("storage", err))
    }
}

/// Translate a backend failure into the gateway taxonomy.
///
/// Reader failures caused by a body that does not match its declared length
/// are the client's fault and become 400s; everything else from the store is
/// a 500 without backend detail.
pub fn map_storage_error(operation: &'static str, err: StorageError) -> AppError {
    match err {
        StorageError::InvalidKey(msg) => AppError::InvalidInput(msg),
        StorageError::IoError(e)
            if matches!(
                e.kind(),
                io::ErrorKind::UnexpectedEof | io::ErrorKind::InvalidData
            ) =>
        {
            AppError::InvalidInput(format!("Upload body rejected: {}", e))
        }
        StorageError::ConfigError(msg) => AppError::Internal(msg),
        other => AppError::storage(operation, other),
    }
}

fn log_error(error: &AppError) {
    let error_type = error.error_type();
    match error.log_level() {
        LogLevel::Debug => {
            tracing::debug!(error = %error, error_type = error_type, "Error occurred");
        }
        LogLevel::Warn => {
            tracing::warn!(error = %error, error_type = error_type, "Error occurred");
        }
        LogLevel::Error => {
            tracing::error!(error = %error, error_type = error_type, "Error occurred");
        }
    }
}

fn is_production_env() -> bool {
    std::env::var("ENVIRONMENT")
        .or_else(|_| std::env::var("APP_ENV"))
        .map(|env| env.to_lowercase() == "production" || env.to_lowercase() == "prod")
        .unwrap_or(false)
}

impl HttpAppError {
    /// Response body for this error. Details are dropped in production and for
    /// sensitive errors.
    pub fn to_error_response(&self, is_production: bool) -> ErrorResponse {
        let app_error = &self.0;
        let hide_details = is_production || app_error.is_sensitive();

        let issues = match app_error {
            AppError::Validation(failed) => Some(failed.summaries()),
            _ => None,
        };

        ErrorResponse {
            error: app_error.client_message(),
            details: (!hide_details).then(|| app_error.detailed_message()),
            error_type: (!hide_details).then(|| app_error.error_type().to_string()),
            code: app_error.error_code().to_string(),
            recoverable: app_error.is_recoverable(),
            suggested_action: app_error.suggested_action().map(String::from),
            issues,
        }
    }
}

impl IntoResponse for HttpAppError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.http_status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        log_error(&self.0);

        let body = self.to_error_response(is_production_env());
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use podstore_core::{FileCategory, ValidationFailed, ValidationIssue};

    #[test]
    fn test_storage_failure_hides_backend_detail() {
        let err = HttpAppError::from(StorageError::UploadFailed(
            "AccessDenied: arn:aws:s3:::private-bucket".to_string(),
        ));
        let body = err.to_error_response(false);
        assert_eq!(body.code, "STORAGE_ERROR");
        assert_eq!(body.error, "Storage operation failed");
        assert!(body.details.is_none());
        assert!(!serde_json::to_string(&body).unwrap().contains("private-bucket"));
    }

    #[test]
    fn test_validation_failure_lists_issues() {
        let err = HttpAppError::from(AppError::from(ValidationFailed {
            category: Some(FileCategory::Audio),
            errors: vec![
                ValidationIssue::FileTooLarge { size: 11, max: 10 },
                ValidationIssue::SignatureMismatch {
                    category: FileCategory::Audio,
                },
            ],
        }));
        let body = err.to_error_response(true);
        let issues = body.issues.unwrap();
        let codes: Vec<&str> = issues.iter().map(|i| i.code.as_str()).collect();
        assert_eq!(codes, vec!["FILE_TOO_LARGE", "SIGNATURE_MISMATCH"]);
        assert!(body.details.is_none());
    }

    #[test]
    fn test_truncated_body_is_client_error() {
        let err = map_storage_error(
            "put",
            StorageError::IoError(io::Error::new(io::ErrorKind::UnexpectedEof, "short body")),
        );
        assert_eq!(err.http_status_code(), 400);

        let err = map_storage_error(
            "put",
            StorageError::IoError(io::Error::new(io::ErrorKind::ConnectionReset, "reset")),
        );
        assert_eq!(err.http_status_code(), 500);
    }

    #[test]
    fn test_invalid_key_is_client_error() {
        let err = map_storage_error("sign", StorageError::InvalidKey("bad".to_string()));
        assert_eq!(err.error_code(), "INVALID_INPUT");
    }
}
