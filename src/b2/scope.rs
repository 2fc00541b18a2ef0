use crate::config::{Config, endpoint_for};

use super::keys;

/// Credentials and target derived for a single storage operation
///
/// Built fresh for every call and never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub region: String,
    pub bucket: String,
    pub destination_prefix: Option<String>,
    pub cdn_url: Option<String>,
}

impl OperationCredentials {
    pub fn endpoint(&self) -> String {
        endpoint_for(&self.region)
    }
}

/// Scope credentials for uploading media of an event
///
/// The destination prefix is `events/{event_id}/media`.
pub fn scope_for_upload(config: &Config, event_id: &str) -> OperationCredentials {
    OperationCredentials {
        access_key_id: config.access_key_id.clone(),
        secret_access_key: config.secret_access_key.clone(),
        region: config.region.clone(),
        bucket: config.bucket.clone(),
        destination_prefix: Some(keys::media_prefix(event_id)),
        cdn_url: config.cdn_url.clone(),
    }
}

/// Scope credentials for queries against a bucket
///
/// An empty override falls back to the configured default bucket.
pub fn scope_for_query(config: &Config, bucket_override: &str) -> OperationCredentials {
    let bucket = if bucket_override.trim().is_empty() {
        config.bucket.clone()
    } else {
        bucket_override.to_string()
    };

    OperationCredentials {
        access_key_id: config.access_key_id.clone(),
        secret_access_key: config.secret_access_key.clone(),
        region: config.region.clone(),
        bucket,
        destination_prefix: None,
        cdn_url: config.cdn_url.clone(),
    }
}
