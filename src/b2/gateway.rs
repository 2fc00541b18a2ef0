use std::path::Path;

use serde::Serialize;
use tracing::{debug, info};

use super::classify::{FileType, classify, extension_of, file_name_from_path};
use super::error::GatewayError;
use super::keys::{self, KeyScope};
use super::multipart::{ProgressSink, UploadOptions, upload_file};
use super::scope::{scope_for_query, scope_for_upload};
use super::store::{Connect, DeleteSummary, ObjectSummary};
use crate::config::Config;

/// Maximum keys accepted by one DeleteObjects request
pub const DELETE_BATCH_SIZE: usize = 1000;

/// Every object of a bucket
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectListing {
    pub total_items: usize,
    pub items: Vec<ObjectSummary>,
}

/// A finished media upload
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedMedia {
    pub bucket: String,
    pub key: String,
    pub etag: Option<String>,
    pub location: String,
    pub file_type: FileType,
}

/// Storage gateway over Backblaze B2
///
/// Each operation scopes fresh credentials from the configuration and
/// connects its own store handle; nothing is shared between calls.
pub struct Gateway<C> {
    config: Config,
    connector: C,
    upload_options: UploadOptions,
}

impl<C: Connect> Gateway<C> {
    pub fn new(config: Config, connector: C) -> Self {
        Self {
            config,
            connector,
            upload_options: UploadOptions::default(),
        }
    }

    pub fn with_upload_options(mut self, options: UploadOptions) -> Self {
        self.upload_options = options;
        self
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }

    /// Names of all buckets visible to the configured key
    pub async fn list_buckets(&self) -> Result<Vec<String>, GatewayError> {
        let creds = scope_for_query(&self.config, "");
        let store = self.connector.connect(&creds).await;
        store.list_buckets().await
    }

    /// List every object in a bucket, following continuation tokens
    pub async fn list_objects(&self, bucket: &str) -> Result<ObjectListing, GatewayError> {
        let creds = scope_for_query(&self.config, bucket);
        let store = self.connector.connect(&creds).await;

        let mut items = Vec::new();
        let mut token: Option<String> = None;
        loop {
            let page = store
                .list_objects_page(&creds.bucket, token.as_deref())
                .await?;
            debug!(
                "Listed {} objects from {} (more: {})",
                page.objects.len(),
                creds.bucket,
                page.next_token.is_some()
            );
            items.extend(page.objects);

            match page.next_token {
                Some(next) => token = Some(next),
                None => break,
            }
        }

        Ok(ObjectListing {
            total_items: items.len(),
            items,
        })
    }

    /// Objects whose key contains `needle` anywhere
    ///
    /// This is a substring match, not a prefix match.
    pub async fn filter_objects(
        &self,
        needle: &str,
        bucket: &str,
    ) -> Result<Vec<ObjectSummary>, GatewayError> {
        let listing = self.list_objects(bucket).await?;
        Ok(listing
            .items
            .into_iter()
            .filter(|object| object.key.contains(needle))
            .collect())
    }

    /// Upload a local file as media of an event
    ///
    /// The object is stored under `events/{event_id}/media/{file_name}`.
    pub async fn upload_object(
        &self,
        file_path: &Path,
        event_id: &str,
        sink: &dyn ProgressSink,
    ) -> Result<UploadedMedia, GatewayError> {
        let event_id = require_id(event_id, "event id", keys::EVENT_RESERVED)?;
        let path_str = file_path.to_string_lossy();
        let file_name = file_name_from_path(&path_str);
        let file_type = classify(extension_of(file_name));

        let creds = scope_for_upload(&self.config, event_id);
        let key = keys::object_key(event_id, file_name);
        let store = self.connector.connect(&creds).await;
        info!("B2 client initialized, uploading {} as {}", path_str, key);

        let stored = upload_file(
            store.as_ref(),
            &creds.bucket,
            &key,
            file_path,
            &self.upload_options,
            sink,
        )
        .await?;

        let location = stored
            .location
            .unwrap_or_else(|| format!("{}{}/{}", creds.endpoint(), creds.bucket, key));

        Ok(UploadedMedia {
            bucket: creds.bucket,
            key,
            etag: stored.etag,
            location,
            file_type,
        })
    }

    /// Delete every file of one post
    ///
    /// A post id may also be a full file name, which deletes just that file.
    pub async fn delete_one(
        &self,
        event_id: &str,
        post_id: &str,
    ) -> Result<DeleteSummary, GatewayError> {
        let event_id = require_id(event_id, "event id", keys::EVENT_RESERVED)?;
        let post_id = require_id(post_id, "post id", keys::POST_RESERVED)?;
        self.delete_scope(event_id, KeyScope::post(event_id, post_id))
            .await
    }

    /// Delete every file of an event
    pub async fn delete_many(&self, event_id: &str) -> Result<DeleteSummary, GatewayError> {
        let event_id = require_id(event_id, "event id", keys::EVENT_RESERVED)?;
        self.delete_scope(event_id, KeyScope::event(event_id)).await
    }

    async fn delete_scope(
        &self,
        event_id: &str,
        scope: KeyScope,
    ) -> Result<DeleteSummary, GatewayError> {
        let keys: Vec<String> = self
            .filter_objects(scope.prefix(), "")
            .await?
            .into_iter()
            .map(|object| object.key)
            .filter(|key| scope.contains(key))
            .collect();

        if keys.is_empty() {
            info!("No files found under {}", scope.prefix());
            return Err(GatewayError::NoFilesFound);
        }

        let creds = scope_for_upload(&self.config, event_id);
        let store = self.connector.connect(&creds).await;

        let mut summary = DeleteSummary::default();
        for batch in keys.chunks(DELETE_BATCH_SIZE) {
            debug!("Deleting batch of {} keys", batch.len());
            summary.merge(store.delete_objects(&creds.bucket, batch).await?);
        }

        info!(
            "Deleted {} files under {} ({} errors)",
            summary.deleted.len(),
            scope.prefix(),
            summary.errors.len()
        );
        Ok(summary)
    }

    /// Metadata-only existence probe
    ///
    /// Any failure, including "not found", is returned as the error.
    pub async fn bucket_exists(&self, bucket: &str) -> Result<(), GatewayError> {
        let creds = scope_for_query(&self.config, bucket);
        let store = self.connector.connect(&creds).await;
        store.head_bucket(&creds.bucket).await
    }

    /// Create a bucket in the configured region unless it already exists
    pub async fn create_bucket(&self, bucket: &str) -> Result<(), GatewayError> {
        Config::validate_bucket_name(bucket)?;

        match self.bucket_exists(bucket).await {
            Ok(()) => return Err(GatewayError::BucketAlreadyExists),
            Err(e) => debug!("Existence probe for {} failed: {}", bucket, e),
        }

        info!("Create Bucket: Continue... {}", bucket);
        let creds = scope_for_query(&self.config, bucket);
        let store = self.connector.connect(&creds).await;
        store.create_bucket(bucket, &creds.region).await
    }

    /// Delete a bucket if it exists
    pub async fn destroy_bucket(&self, bucket: &str) -> Result<(), GatewayError> {
        if let Err(e) = self.bucket_exists(bucket).await {
            debug!("Existence probe for {} failed: {}", bucket, e);
            return Err(GatewayError::BucketDoesNotExist);
        }

        info!("Destroy Bucket: Continue... {}", bucket);
        let creds = scope_for_query(&self.config, bucket);
        let store = self.connector.connect(&creds).await;
        store.delete_bucket(bucket).await
    }
}

fn require_id<'a>(id: &'a str, what: &str, reserved: &[char]) -> Result<&'a str, GatewayError> {
    keys::delimiter_safe(id, reserved).ok_or_else(|| {
        let reserved: Vec<String> = reserved.iter().map(|c| format!("'{}'", c)).collect();
        GatewayError::InvalidInput {
            message: format!(
                "Please provide a valid {} (non-empty, no {})",
                what,
                reserved.join(" or ")
            ),
        }
    })
}
