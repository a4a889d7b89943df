use crate::auth::models::RequestPrincipal;
use crate::constants::{TENANT_ID_HEADER, USER_ID_HEADER, USER_ROLE_HEADER};
use crate::error::HttpAppError;
use axum::{
    extract::Request,
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Response},
};
use podstore_core::{AppError, Principal, Role};

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

fn principal_from_headers(headers: &HeaderMap) -> Result<Principal, AppError> {
    let tenant_id = header_value(headers, TENANT_ID_HEADER)
        .ok_or_else(|| AppError::Unauthorized(format!("Missing {} header", TENANT_ID_HEADER)))?;
    let user_id = header_value(headers, USER_ID_HEADER)
        .ok_or_else(|| AppError::Unauthorized(format!("Missing {} header", USER_ID_HEADER)))?;
    let role = match header_value(headers, USER_ROLE_HEADER) {
        Some(value) => value
            .parse::<Role>()
            .map_err(|e| AppError::Unauthorized(e.to_string()))?,
        None => Role::Member,
    };

    Ok(Principal::new(tenant_id, user_id, role))
}

/// Resolve the caller from the proxy-supplied identity headers.
///
/// Requests without a tenant or user are rejected with 401. A missing role
/// means `member`.
pub async fn trusted_principal_middleware(mut request: Request, next: Next) -> Response {
    let principal = match principal_from_headers(request.headers()) {
        Ok(principal) => principal,
        Err(e) => return HttpAppError(e).into_response(),
    };

    tracing::Span::current().record("tenant_id", principal.tenant_id.as_str());
    request.extensions_mut().insert(RequestPrincipal(principal));

    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_static(value));
        }
        map
    }

    #[test]
    fn test_principal_from_headers() {
        let principal = principal_from_headers(&headers(&[
            ("x-tenant-id", "t1"),
            ("x-user-id", "u1"),
            ("x-user-role", "Admin"),
        ]))
        .unwrap();
        assert_eq!(principal, Principal::new("t1", "u1", Role::Admin));
    }

    #[test]
    fn test_role_defaults_to_member() {
        let principal =
            principal_from_headers(&headers(&[("x-tenant-id", "t1"), ("x-user-id", "u1")]))
                .unwrap();
        assert_eq!(principal.role, Role::Member);
    }

    #[test]
    fn test_missing_identity_rejected() {
        assert!(matches!(
            principal_from_headers(&headers(&[("x-user-id", "u1")])),
            Err(AppError::Unauthorized(_))
        ));
        assert!(matches!(
            principal_from_headers(&headers(&[("x-tenant-id", " "), ("x-user-id", "u1")])),
            Err(AppError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_unknown_role_rejected() {
        assert!(matches!(
            principal_from_headers(&headers(&[
                ("x-tenant-id", "t1"),
                ("x-user-id", "u1"),
                ("x-user-role", "owner"),
            ])),
            Err(AppError::Unauthorized(_))
        ));
    }
}
