//! Access broker
//!
//! Every key-addressed operation passes through [`AccessBroker::authorize`]
//! before any remote call is made.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use podstore_core::constants::{MAX_GRANT_EXPIRY_SECS, MIN_GRANT_EXPIRY_SECS};
use podstore_core::{
    is_owned_by, AppError, DeletedObject, Principal, PublicObjectUrl, SignedAccessGrant,
};
use podstore_storage::Storage;

use crate::error::map_storage_error;

/// Turn a requested grant lifetime into whole seconds.
///
/// `None` selects `default_secs`. Non-finite and non-positive values are
/// rejected; everything else is rounded up and clamped to the allowed range.
pub fn resolve_expiry(requested: Option<f64>, default_secs: u64) -> Result<u64, AppError> {
    let Some(requested) = requested else {
        return Ok(default_secs.clamp(MIN_GRANT_EXPIRY_SECS, MAX_GRANT_EXPIRY_SECS));
    };

    if !requested.is_finite() || requested <= 0.0 {
        return Err(AppError::InvalidExpiry(format!(
            "expires_in must be a positive number of seconds, got {}",
            requested
        )));
    }

    let secs = requested
        .ceil()
        .clamp(MIN_GRANT_EXPIRY_SECS as f64, MAX_GRANT_EXPIRY_SECS as f64);
    Ok(secs as u64)
}

#[derive(Clone)]
pub struct AccessBroker {
    storage: Arc<dyn Storage>,
    default_expiry_secs: u64,
}

impl AccessBroker {
    pub fn new(storage: Arc<dyn Storage>, default_expiry_secs: u64) -> Self {
        Self {
            storage,
            default_expiry_secs,
        }
    }

    pub fn default_expiry_secs(&self) -> u64 {
        self.default_expiry_secs
    }

    /// Admins may address any key; everyone else only keys in their tenant.
    pub fn authorize(&self, principal: &Principal, key: &str) -> Result<(), AppError> {
        if principal.is_elevated() || is_owned_by(key, &principal.tenant_id) {
            return Ok(());
        }

        tracing::warn!(
            tenant_id = %principal.tenant_id,
            user_id = %principal.user_id,
            key = %key,
            "Access denied: key outside tenant namespace"
        );
        Err(AppError::Forbidden(
            "Key is outside your tenant namespace".to_string(),
        ))
    }

    /// Sign a time-limited read URL for `key`.
    #[tracing::instrument(
        skip(self, principal),
        fields(tenant_id = %principal.tenant_id, user_id = %principal.user_id)
    )]
    pub async fn issue_grant(
        &self,
        principal: &Principal,
        key: &str,
        requested_expiry: Option<f64>,
    ) -> Result<SignedAccessGrant, AppError> {
        let expires_in = resolve_expiry(requested_expiry, self.default_expiry_secs)?;
        self.authorize(principal, key)?;

        let signed_url = self
            .storage
            .presigned_url(key, Duration::from_secs(expires_in))
            .await
            .map_err(|e| map_storage_error("sign", e))?;

        Ok(SignedAccessGrant {
            key: key.to_string(),
            signed_url,
            expires_at: Utc::now() + chrono::Duration::seconds(expires_in as i64),
            expires_in_seconds: expires_in,
        })
    }

    /// Delete `key`. Succeeds whether or not the object existed.
    #[tracing::instrument(
        skip(self, principal),
        fields(tenant_id = %principal.tenant_id, user_id = %principal.user_id)
    )]
    pub async fn delete(&self, principal: &Principal, key: &str) -> Result<DeletedObject, AppError> {
        self.authorize(principal, key)?;

        self.storage
            .delete(key)
            .await
            .map_err(|e| map_storage_error("delete", e))?;

        tracing::info!(key = %key, "Object deleted");

        Ok(DeletedObject {
            key: key.to_string(),
            deleted: true,
        })
    }

    /// Non-expiring URL for publicly readable content.
    pub fn public_url(&self, key: &str) -> PublicObjectUrl {
        PublicObjectUrl {
            key: key.to_string(),
            url: self.storage.public_url(key),
        }
    }
}
