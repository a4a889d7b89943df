use crate::auth::RequestPrincipal;
use crate::error::{ErrorResponse, HttpAppError};
use crate::handlers::upload::parse_expiry;
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use podstore_core::SignedAccessGrant;
use serde::Deserialize;
use std::sync::Arc;
use utoipa::IntoParams;

#[derive(Debug, Deserialize, IntoParams)]
pub struct GrantQuery {
    /// Lifetime of the signed URL in seconds (default 3600, max 604800)
    pub expires_in: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/v0/grants/{key}",
    tag = "objects",
    params(
        ("key" = String, Path, description = "Object key, e.g. t1/covers/1700000000000-abc-cover.png"),
        GrantQuery
    ),
    responses(
        (status = 200, description = "Signed read URL", body = SignedAccessGrant),
        (status = 400, description = "Invalid expiry", body = ErrorResponse),
        (status = 403, description = "Key outside the caller's tenant", body = ErrorResponse),
        (status = 500, description = "Signing failed", body = ErrorResponse)
    )
)]
#[tracing::instrument(
    skip(state, principal, query),
    fields(tenant_id = %principal.tenant_id, key = %key)
)]
pub async fn get_access_grant(
    State(state): State<Arc<AppState>>,
    RequestPrincipal(principal): RequestPrincipal,
    Path(key): Path<String>,
    Query(query): Query<GrantQuery>,
) -> Result<impl IntoResponse, HttpAppError> {
    let expires_in = parse_expiry(query.expires_in.as_deref())?;
    let grant = state
        .gateway
        .get_access_grant(&principal, &key, expires_in)
        .await?;
    Ok(Json(grant))
}
