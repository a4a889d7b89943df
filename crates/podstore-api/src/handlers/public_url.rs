use crate::state::AppState;
use axum::{
    extract::{Path, State},
    Json,
};
use podstore_core::PublicObjectUrl;
use std::sync::Arc;

/// Public content needs no ownership check; the URL does not expire.
#[utoipa::path(
    get,
    path = "/api/v0/public-url/{key}",
    tag = "objects",
    params(
        ("key" = String, Path, description = "Object key")
    ),
    responses(
        (status = 200, description = "Non-expiring public URL", body = PublicObjectUrl)
    )
)]
pub async fn get_public_url(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
) -> Json<PublicObjectUrl> {
    Json(state.gateway.public_url(&key))
}
