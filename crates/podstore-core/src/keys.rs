//! Tenant-scoped storage key generation.
//!
//! Key format: `{tenant_id}/{prefix segments...}/{millis}-{uuid}-{base}.{ext}`.
//! The first path segment is always the owning tenant; it is the only access
//! control boundary between tenants. Keys never contain `.`, `..` or empty
//! segments.

use std::path::Path;

use chrono::Utc;
use uuid::Uuid;

use crate::constants::FALLBACK_FILE_NAME;
use crate::error::AppError;
use crate::models::Principal;

/// Build a fresh, collision-resistant key in the principal's tenant namespace.
///
/// Two calls with identical arguments never return the same key, so an
/// upload can never overwrite an existing object.
pub fn build_key(
    principal: &Principal,
    prefix: Option<&str>,
    original_filename: Option<&str>,
) -> Result<String, AppError> {
    let tenant = tenant_segment(&principal.tenant_id)?;

    let mut segments = vec![tenant.to_string()];
    if let Some(prefix) = prefix {
        segments.extend(sanitize_prefix(prefix));
    }
    segments.push(unique_file_name(original_filename.unwrap_or("")));

    Ok(segments.join("/"))
}

/// True if `key` lives in `tenant_id`'s namespace.
pub fn is_owned_by(key: &str, tenant_id: &str) -> bool {
    !tenant_id.is_empty()
        && key
            .strip_prefix(tenant_id)
            .is_some_and(|rest| rest.starts_with('/'))
}

fn tenant_segment(tenant_id: &str) -> Result<&str, AppError> {
    let trimmed = tenant_id.trim();
    if trimmed.is_empty()
        || trimmed != tenant_id
        || tenant_id.contains(&['/', '\\'][..])
        || tenant_id == "."
        || tenant_id == ".."
    {
        return Err(AppError::InvalidInput(format!(
            "Invalid tenant id: {:?}",
            tenant_id
        )));
    }
    Ok(tenant_id)
}

/// Normalize separators and drop `.`, `..` and empty segments.
pub fn sanitize_prefix(prefix: &str) -> Vec<String> {
    prefix
        .replace('\\', "/")
        .split('/')
        .map(str::trim)
        .filter(|s| !s.is_empty() && *s != "." && *s != "..")
        .map(String::from)
        .collect()
}

/// Filesystem-safe base name: lowercase, whitespace runs become `-`, anything
/// other than ASCII alphanumerics, `-` and `_` is dropped.
pub fn sanitize_base_name(stem: &str) -> String {
    let mut out = String::with_capacity(stem.len());
    let mut pending_dash = false;

    for c in stem.trim().chars() {
        if c.is_whitespace() {
            pending_dash = true;
            continue;
        }
        if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            pending_dash = false;
            out.push(c.to_ascii_lowercase());
        }
    }

    if out.is_empty() {
        FALLBACK_FILE_NAME.to_string()
    } else {
        out
    }
}

fn split_filename(filename: &str) -> (String, Option<String>) {
    let normalized = filename.replace('\\', "/");
    let path = Path::new(&normalized);

    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("")
        .to_string();

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| {
            e.chars()
                .filter(|c| c.is_ascii_alphanumeric())
                .collect::<String>()
                .to_lowercase()
        })
        .filter(|e| !e.is_empty());

    (stem, extension)
}

/// Uniqueness token: millisecond timestamp plus a random UUID.
fn unique_token() -> String {
    format!(
        "{}-{}",
        Utc::now().timestamp_millis(),
        Uuid::new_v4().simple()
    )
}

fn unique_file_name(original_filename: &str) -> String {
    let (stem, extension) = split_filename(original_filename);
    let base = sanitize_base_name(&stem);
    match extension {
        Some(ext) => format!("{}-{}.{}", unique_token(), base, ext),
        None => format!("{}-{}", unique_token(), base),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;
    use std::collections::HashSet;

    fn principal(tenant: &str) -> Principal {
        Principal::new(tenant, "user-1", Role::Member)
    }

    #[test]
    fn test_key_layout() {
        let key = build_key(&principal("t1"), Some("covers"), Some("cover.png")).unwrap();
        let parts: Vec<&str> = key.split('/').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "t1");
        assert_eq!(parts[1], "covers");
        assert!(parts[2].ends_with("-cover.png"), "{}", key);

        let token = parts[2].trim_end_matches("-cover.png");
        let (millis, random) = token.split_once('-').unwrap();
        assert!(millis.parse::<i64>().is_ok());
        assert_eq!(random.len(), 32);
    }

    #[test]
    fn test_prefix_traversal_stripped() {
        let key = build_key(
            &principal("t1"),
            Some("../../t2/./covers//\\art/"),
            Some("x.png"),
        )
        .unwrap();
        assert!(key.starts_with("t1/t2/covers/art/"), "{}", key);
        assert!(!key.contains(".."));
        assert!(!key.contains("//"));
    }

    #[test]
    fn test_no_prefix() {
        let key = build_key(&principal("t1"), None, Some("Episode 1.MP3")).unwrap();
        assert!(key.starts_with("t1/"));
        assert_eq!(key.matches('/').count(), 1);
        assert!(key.ends_with("-episode-1.mp3"), "{}", key);
    }

    #[test]
    fn test_empty_prefix_is_ignored() {
        let key = build_key(&principal("t1"), Some(" / ./.."), Some("a.png")).unwrap();
        assert_eq!(key.matches('/').count(), 1);
    }

    #[test]
    fn test_fallback_base_name() {
        let key = build_key(&principal("t1"), None, Some("!!!.pdf")).unwrap();
        assert!(key.ends_with("-file.pdf"), "{}", key);

        let key = build_key(&principal("t1"), None, None).unwrap();
        assert!(key.ends_with("-file"), "{}", key);
    }

    #[test]
    fn test_sanitize_base_name() {
        assert_eq!(sanitize_base_name("My  Great\tShow"), "my-great-show");
        assert_eq!(sanitize_base_name("ep_01 (final)"), "ep_01-final");
        assert_eq!(sanitize_base_name("../etc/passwd"), "etcpasswd");
        assert_eq!(sanitize_base_name("   "), "file");
    }

    #[test]
    fn test_directory_in_filename_is_dropped() {
        let key = build_key(&principal("t1"), None, Some("../../secret/Cover.PNG")).unwrap();
        assert_eq!(key.matches('/').count(), 1);
        assert!(key.ends_with("-cover.png"), "{}", key);
    }

    #[test]
    fn test_invalid_tenant_rejected() {
        for tenant in ["", "a/b", "..", " t1"] {
            assert!(
                build_key(&principal(tenant), None, Some("a.png")).is_err(),
                "tenant {:?} accepted",
                tenant
            );
        }
    }

    #[test]
    fn test_keys_never_collide() {
        let principal = principal("t1");
        let keys: HashSet<String> = (0..10_000)
            .map(|_| build_key(&principal, Some("covers"), Some("cover.png")).unwrap())
            .collect();
        assert_eq!(keys.len(), 10_000);
    }

    #[test]
    fn test_is_owned_by() {
        assert!(is_owned_by("t1/covers/x.png", "t1"));
        assert!(!is_owned_by("t2/covers/x.png", "t1"));
        assert!(!is_owned_by("t10/covers/x.png", "t1"));
        assert!(!is_owned_by("t1", "t1"));
        assert!(!is_owned_by("/x.png", ""));
    }
}
