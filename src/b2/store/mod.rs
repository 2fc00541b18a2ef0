//! Storage capability seam.
//!
//! `ObjectStore` is the set of S3 calls the gateway needs; `Connect` builds a
//! fresh store handle for one operation's credentials.

#[cfg(test)]
pub mod memory;

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use super::error::GatewayError;
use super::scope::OperationCredentials;

/// Summary of a stored object from a listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectSummary {
    pub key: String,
    pub size: i64,
    pub last_modified: Option<String>,
    pub etag: Option<String>,
}

/// One page of a bucket listing
#[derive(Debug, Clone, Default)]
pub struct ObjectPage {
    pub objects: Vec<ObjectSummary>,
    /// Token for the next page, `None` on the last page
    pub next_token: Option<String>,
}

/// Per-key failure inside a batch delete
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeleteFailure {
    pub key: String,
    pub code: Option<String>,
    pub message: Option<String>,
}

/// Outcome of one or more batch delete calls
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeleteSummary {
    pub deleted: Vec<String>,
    pub errors: Vec<DeleteFailure>,
}

impl DeleteSummary {
    pub fn merge(&mut self, other: DeleteSummary) {
        self.deleted.extend(other.deleted);
        self.errors.extend(other.errors);
    }
}

/// Part accepted by the service during a multipart upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedPart {
    pub part_number: i32,
    pub etag: String,
}

/// Result of a finished upload
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoredObject {
    pub etag: Option<String>,
    pub location: Option<String>,
}

/// Low-level object storage operations
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn list_buckets(&self) -> Result<Vec<String>, GatewayError>;

    /// List one page of a bucket, continuing from `continuation` if given
    async fn list_objects_page(
        &self,
        bucket: &str,
        continuation: Option<&str>,
    ) -> Result<ObjectPage, GatewayError>;

    /// Metadata-only existence probe
    async fn head_bucket(&self, bucket: &str) -> Result<(), GatewayError>;

    async fn create_bucket(&self, bucket: &str, region: &str) -> Result<(), GatewayError>;

    async fn delete_bucket(&self, bucket: &str) -> Result<(), GatewayError>;

    /// Delete a batch of at most 1000 keys
    async fn delete_objects(
        &self,
        bucket: &str,
        keys: &[String],
    ) -> Result<DeleteSummary, GatewayError>;

    /// Single-request upload
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
    ) -> Result<StoredObject, GatewayError>;

    /// Start a multipart upload and return its upload id
    async fn create_multipart_upload(&self, bucket: &str, key: &str)
    -> Result<String, GatewayError>;

    /// Upload one part and return its ETag
    async fn upload_part(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        part_number: i32,
        body: Vec<u8>,
    ) -> Result<String, GatewayError>;

    async fn complete_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        parts: Vec<UploadedPart>,
    ) -> Result<StoredObject, GatewayError>;

    async fn abort_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
    ) -> Result<(), GatewayError>;
}

/// Builds a store handle scoped to one operation's credentials
#[async_trait]
pub trait Connect: Send + Sync {
    async fn connect(&self, creds: &OperationCredentials) -> Arc<dyn ObjectStore>;
}
