use crate::auth::RequestPrincipal;
use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use podstore_core::DeletedObject;
use std::sync::Arc;

#[utoipa::path(
    delete,
    path = "/api/v0/objects/{key}",
    tag = "objects",
    params(
        ("key" = String, Path, description = "Object key")
    ),
    responses(
        (status = 200, description = "Object deleted (also when it did not exist)", body = DeletedObject),
        (status = 403, description = "Key outside the caller's tenant", body = ErrorResponse),
        (status = 500, description = "Storage failure", body = ErrorResponse)
    )
)]
#[tracing::instrument(
    skip(state, principal),
    fields(tenant_id = %principal.tenant_id, user_id = %principal.user_id, key = %key)
)]
pub async fn delete_object(
    State(state): State<Arc<AppState>>,
    RequestPrincipal(principal): RequestPrincipal,
    Path(key): Path<String>,
) -> Result<impl IntoResponse, HttpAppError> {
    let deleted = state.gateway.delete(&principal, &key).await?;
    Ok(Json(deleted))
}
