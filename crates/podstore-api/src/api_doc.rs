//! OpenAPI documentation, served at `/api/openapi.json`.

use utoipa::OpenApi;

use crate::error;
use crate::handlers;
use podstore_core::{models, validation};

pub fn get_openapi_spec() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Podstore API",
        version = "0.1.0",
        description = "Tenant-isolated object storage gateway for podcast media. Uploads are validated against per-category rules, stored under the caller's tenant namespace, and read back through time-limited signed URLs. All endpoints are versioned under /api/v0/."
    ),
    paths(
        handlers::upload::upload_object,
        handlers::grant::get_access_grant,
        handlers::delete::delete_object,
        handlers::public_url::get_public_url,
        handlers::health::health_check,
    ),
    components(schemas(
        models::UploadedObject,
        models::SignedAccessGrant,
        models::DeletedObject,
        models::PublicObjectUrl,
        models::FileCategory,
        models::Role,
        validation::IssueSummary,
        error::ErrorResponse,
        handlers::health::HealthCheckResponse,
    )),
    tags(
        (name = "objects", description = "Upload, sign, delete and locate objects"),
        (name = "health", description = "Service health")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spec_lists_every_route() {
        let spec = get_openapi_spec();
        for path in [
            "/api/v0/objects",
            "/api/v0/grants/{key}",
            "/api/v0/objects/{key}",
            "/api/v0/public-url/{key}",
            "/health",
        ] {
            assert!(spec.paths.paths.contains_key(path), "missing {}", path);
        }
    }
}
