//! In-memory `ObjectStore` that records every call.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use super::{
    Connect, DeleteSummary, ObjectPage, ObjectStore, ObjectSummary, StoredObject, UploadedPart,
};
use crate::b2::error::GatewayError;
use crate::b2::scope::OperationCredentials;

#[derive(Default)]
struct State {
    buckets: BTreeMap<String, BTreeMap<String, Vec<u8>>>,
    uploads: HashMap<String, (String, String, BTreeMap<i32, Vec<u8>>)>,
    calls: Vec<String>,
    next_upload: usize,
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
    /// Objects per listing page, 0 means unlimited
    pub page_size: usize,
    /// Part number whose upload fails
    pub fail_part: Option<i32>,
    /// Status returned by every call when set
    pub fail_status: Option<u16>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    pub connections: Mutex<Vec<OperationCredentials>>,
}

impl MemoryStore {
    pub fn with_bucket(bucket: &str) -> Self {
        let store = Self::default();
        store.add_bucket(bucket);
        store
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn failing_part(mut self, part_number: i32) -> Self {
        self.fail_part = Some(part_number);
        self
    }

    pub fn failing_with(mut self, status: u16) -> Self {
        self.fail_status = Some(status);
        self
    }

    pub fn add_bucket(&self, bucket: &str) {
        let mut state = self.state.lock().unwrap();
        state.buckets.entry(bucket.to_string()).or_default();
    }

    pub fn insert(&self, bucket: &str, key: &str, body: &[u8]) {
        let mut state = self.state.lock().unwrap();
        state
            .buckets
            .entry(bucket.to_string())
            .or_default()
            .insert(key.to_string(), body.to_vec());
    }

    pub fn keys(&self, bucket: &str) -> Vec<String> {
        let state = self.state.lock().unwrap();
        state
            .buckets
            .get(bucket)
            .map(|objects| objects.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn object(&self, bucket: &str, key: &str) -> Option<Vec<u8>> {
        let state = self.state.lock().unwrap();
        state.buckets.get(bucket)?.get(key).cloned()
    }

    pub fn has_bucket(&self, bucket: &str) -> bool {
        self.state.lock().unwrap().buckets.contains_key(bucket)
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn calls_named(&self, name: &str) -> usize {
        self.calls().iter().filter(|c| c.as_str() == name).count()
    }

    pub fn pending_uploads(&self) -> usize {
        self.state.lock().unwrap().uploads.len()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn record(&self, call: &str) -> Result<(), GatewayError> {
        self.state.lock().unwrap().calls.push(call.to_string());
        match self.fail_status {
            Some(status) => Err(service_error(status, "InternalError")),
            None => Ok(()),
        }
    }

    fn require_bucket(&self, bucket: &str) -> Result<(), GatewayError> {
        if self.has_bucket(bucket) {
            Ok(())
        } else {
            Err(service_error(404, "NoSuchBucket"))
        }
    }
}

fn service_error(status: u16, code: &str) -> GatewayError {
    GatewayError::Service {
        status,
        code: Some(code.to_string()),
        message: code.to_string(),
        request_id: Some("memory".to_string()),
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn list_buckets(&self) -> Result<Vec<String>, GatewayError> {
        self.record("list_buckets")?;
        Ok(self.state.lock().unwrap().buckets.keys().cloned().collect())
    }

    async fn list_objects_page(
        &self,
        bucket: &str,
        continuation: Option<&str>,
    ) -> Result<ObjectPage, GatewayError> {
        self.record("list_objects")?;
        self.require_bucket(bucket)?;

        let state = self.state.lock().unwrap();
        let start: usize = continuation.and_then(|t| t.parse().ok()).unwrap_or(0);
        let all: Vec<ObjectSummary> = state.buckets[bucket]
            .iter()
            .map(|(key, body)| ObjectSummary {
                key: key.clone(),
                size: body.len() as i64,
                last_modified: None,
                etag: None,
            })
            .collect();

        let end = if self.page_size == 0 {
            all.len()
        } else {
            (start + self.page_size).min(all.len())
        };
        let next_token = (end < all.len()).then(|| end.to_string());

        Ok(ObjectPage {
            objects: all[start..end].to_vec(),
            next_token,
        })
    }

    async fn head_bucket(&self, bucket: &str) -> Result<(), GatewayError> {
        self.record("head_bucket")?;
        self.require_bucket(bucket)
    }

    async fn create_bucket(&self, bucket: &str, _region: &str) -> Result<(), GatewayError> {
        self.record("create_bucket")?;
        self.add_bucket(bucket);
        Ok(())
    }

    async fn delete_bucket(&self, bucket: &str) -> Result<(), GatewayError> {
        self.record("delete_bucket")?;
        self.require_bucket(bucket)?;
        self.state.lock().unwrap().buckets.remove(bucket);
        Ok(())
    }

    async fn delete_objects(
        &self,
        bucket: &str,
        keys: &[String],
    ) -> Result<DeleteSummary, GatewayError> {
        self.record("delete_objects")?;
        self.require_bucket(bucket)?;
        assert!(keys.len() <= 1000, "batch larger than 1000 keys");

        let mut state = self.state.lock().unwrap();
        let objects = state.buckets.get_mut(bucket).unwrap();
        let deleted = keys
            .iter()
            .filter(|key| objects.remove(key.as_str()).is_some())
            .cloned()
            .collect();

        Ok(DeleteSummary {
            deleted,
            errors: Vec::new(),
        })
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
    ) -> Result<StoredObject, GatewayError> {
        self.record("put_object")?;
        self.require_bucket(bucket)?;
        self.insert(bucket, key, &body);
        Ok(StoredObject {
            etag: Some(format!("\"{}\"", body.len())),
            location: None,
        })
    }

    async fn create_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
    ) -> Result<String, GatewayError> {
        self.record("create_multipart_upload")?;
        self.require_bucket(bucket)?;

        let mut state = self.state.lock().unwrap();
        state.next_upload += 1;
        let upload_id = format!("upload-{}", state.next_upload);
        state.uploads.insert(
            upload_id.clone(),
            (bucket.to_string(), key.to_string(), BTreeMap::new()),
        );
        Ok(upload_id)
    }

    async fn upload_part(
        &self,
        _bucket: &str,
        _key: &str,
        upload_id: &str,
        part_number: i32,
        body: Vec<u8>,
    ) -> Result<String, GatewayError> {
        self.record("upload_part")?;

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(5)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.fail_part == Some(part_number) {
            return Err(service_error(500, "InternalError"));
        }

        let mut state = self.state.lock().unwrap();
        let (_, _, parts) = state
            .uploads
            .get_mut(upload_id)
            .ok_or_else(|| service_error(404, "NoSuchUpload"))?;
        parts.insert(part_number, body);
        Ok(format!("\"etag-{}\"", part_number))
    }

    async fn complete_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        parts: Vec<UploadedPart>,
    ) -> Result<StoredObject, GatewayError> {
        self.record("complete_multipart_upload")?;

        let mut state = self.state.lock().unwrap();
        let (_, _, stored) = state
            .uploads
            .remove(upload_id)
            .ok_or_else(|| service_error(404, "NoSuchUpload"))?;

        let numbers: Vec<i32> = parts.iter().map(|p| p.part_number).collect();
        let expected: Vec<i32> = stored.keys().copied().collect();
        assert_eq!(numbers, expected, "parts must be listed in order");

        let body: Vec<u8> = stored.into_values().flatten().collect();
        state
            .buckets
            .entry(bucket.to_string())
            .or_default()
            .insert(key.to_string(), body);

        Ok(StoredObject {
            etag: Some(format!("\"{}-{}\"", upload_id, parts.len())),
            location: Some(format!("memory://{}/{}", bucket, key)),
        })
    }

    async fn abort_multipart_upload(
        &self,
        _bucket: &str,
        _key: &str,
        upload_id: &str,
    ) -> Result<(), GatewayError> {
        self.record("abort_multipart_upload")?;
        self.state.lock().unwrap().uploads.remove(upload_id);
        Ok(())
    }
}

/// Connector handing out one shared `MemoryStore`
pub struct MemoryConnector {
    pub store: Arc<MemoryStore>,
}

impl MemoryConnector {
    pub fn new(store: MemoryStore) -> Self {
        Self {
            store: Arc::new(store),
        }
    }
}

#[async_trait]
impl Connect for MemoryConnector {
    async fn connect(&self, creds: &OperationCredentials) -> Arc<dyn ObjectStore> {
        self.store.connections.lock().unwrap().push(creds.clone());
        self.store.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_listing_pages_follow_tokens() {
        let store = MemoryStore::with_bucket("media").with_page_size(2);
        for key in ["a", "b", "c"] {
            store.insert("media", key, b"x");
        }

        let first = store.list_objects_page("media", None).await.unwrap();
        assert_eq!(first.objects.len(), 2);
        let token = first.next_token.unwrap();

        let second = store.list_objects_page("media", Some(&token)).await.unwrap();
        assert_eq!(second.objects.len(), 1);
        assert!(second.next_token.is_none());
    }
}
