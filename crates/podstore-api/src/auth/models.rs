use crate::error::ErrorResponse;
use axum::extract::FromRequestParts;
use axum::http::{request::Parts, StatusCode};
use axum::Json;
use podstore_core::Principal;

/// Principal resolved by [`trusted_principal_middleware`] and stored in
/// request extensions.
///
/// [`trusted_principal_middleware`]: super::middleware::trusted_principal_middleware
#[derive(Debug, Clone)]
pub struct RequestPrincipal(pub Principal);

impl<S> FromRequestParts<S> for RequestPrincipal
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<ErrorResponse>);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<RequestPrincipal>()
            .cloned()
            .ok_or_else(|| {
                (
                    StatusCode::UNAUTHORIZED,
                    Json(ErrorResponse::new(
                        "Missing caller identity",
                        "UNAUTHORIZED",
                    )),
                )
            })
    }
}
