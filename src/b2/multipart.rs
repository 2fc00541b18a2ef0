use std::io::SeekFrom;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::{StreamExt, TryStreamExt, stream};
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tracing::{debug, info, warn};

use super::error::GatewayError;
use super::store::{ObjectStore, StoredObject, UploadedPart};

// Size of each part (20MB) - B2 minimum is 5MB
pub const MIN_PART_SIZE: u64 = 20 * 1024 * 1024;

// Number of parts in flight at once
pub const QUEUE_SIZE: usize = 4;

// Protocol limit on parts per object
pub const MAX_PARTS: u64 = 10_000;

/// Progress after one part of an upload finished
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadProgress {
    pub key: String,
    pub part: i32,
    pub loaded: u64,
    pub total: u64,
}

impl UploadProgress {
    pub fn percentage(&self) -> f64 {
        if self.total == 0 {
            100.0
        } else {
            self.loaded as f64 / self.total as f64 * 100.0
        }
    }
}

/// Receives upload progress notifications
pub trait ProgressSink: Send + Sync {
    fn on_progress(&self, progress: &UploadProgress);
}

/// Logs one line per finished part
#[derive(Debug, Clone)]
pub struct LogProgress {
    pub file_name: String,
}

impl ProgressSink for LogProgress {
    fn on_progress(&self, progress: &UploadProgress) {
        info!(
            "{} ----- Upload Progress: ({})  {:.2}%",
            self.file_name,
            progress.part,
            progress.percentage()
        );
    }
}

#[derive(Debug, Clone)]
pub struct UploadOptions {
    pub part_size: u64,
    pub queue_size: usize,
}

impl Default for UploadOptions {
    fn default() -> Self {
        Self {
            part_size: MIN_PART_SIZE,
            queue_size: QUEUE_SIZE,
        }
    }
}

/// Upload a local file, splitting it into parts when it exceeds one part
///
/// Files that fit in a single part go up in one request. Larger files use a
/// multipart upload with at most `queue_size` parts in flight; if any part
/// fails the upload is aborted so the service keeps no parts.
///
/// # Errors
///
/// Returns `GatewayError::FileTooLarge` before any network call if the file
/// needs more than `MAX_PARTS` parts.
pub async fn upload_file(
    store: &dyn ObjectStore,
    bucket: &str,
    key: &str,
    local_path: &Path,
    options: &UploadOptions,
    sink: &dyn ProgressSink,
) -> Result<StoredObject, GatewayError> {
    let path_str = local_path.display().to_string();
    let metadata = tokio::fs::metadata(local_path)
        .await
        .map_err(|e| GatewayError::from_io(e, &path_str))?;
    let file_size = metadata.len();
    let part_size = options.part_size.max(1);
    let part_count = file_size.div_ceil(part_size).max(1);

    if part_count > MAX_PARTS {
        return Err(GatewayError::FileTooLarge {
            size: file_size,
            max: part_size * MAX_PARTS,
        });
    }

    if part_count == 1 {
        let body = tokio::fs::read(local_path)
            .await
            .map_err(|e| GatewayError::from_io(e, &path_str))?;
        let stored = store.put_object(bucket, key, body).await?;
        sink.on_progress(&UploadProgress {
            key: key.to_string(),
            part: 1,
            loaded: file_size,
            total: file_size,
        });
        return Ok(stored);
    }

    info!(
        "Starting multipart upload for {} ({} bytes, {} parts)",
        path_str, file_size, part_count
    );

    let upload_id = store.create_multipart_upload(bucket, key).await?;
    debug!("Multipart upload initiated with ID: {}", upload_id);

    let result = upload_parts(
        store,
        bucket,
        key,
        &upload_id,
        local_path,
        file_size,
        part_size,
        part_count,
        options.queue_size.max(1),
        sink,
    )
    .await;

    let result = match result {
        Ok(parts) => {
            debug!(
                "All {} parts uploaded, completing multipart upload",
                parts.len()
            );
            store
                .complete_multipart_upload(bucket, key, &upload_id, parts)
                .await
        }
        Err(e) => Err(e),
    };

    match result {
        Ok(stored) => {
            info!(
                "Successfully completed multipart upload: {} -> {}/{}",
                path_str, bucket, key
            );
            Ok(stored)
        }
        Err(e) => {
            warn!("Multipart upload of {} failed: {}", path_str, e);
            if let Err(abort_err) = store.abort_multipart_upload(bucket, key, &upload_id).await {
                warn!("Failed to abort upload {}: {}", upload_id, abort_err);
            }
            Err(e)
        }
    }
}

#[allow(clippy::too_many_arguments)]
async fn upload_parts(
    store: &dyn ObjectStore,
    bucket: &str,
    key: &str,
    upload_id: &str,
    local_path: &Path,
    file_size: u64,
    part_size: u64,
    part_count: u64,
    queue_size: usize,
    sink: &dyn ProgressSink,
) -> Result<Vec<UploadedPart>, GatewayError> {
    let loaded = AtomicU64::new(0);
    let loaded = &loaded;

    let mut parts: Vec<UploadedPart> = stream::iter(0..part_count)
        .map(|index| async move {
            let offset = index * part_size;
            let length = part_size.min(file_size - offset);
            let part_number = (index + 1) as i32;

            let body = read_range(local_path, offset, length).await?;
            debug!("Uploading part {} ({} bytes)", part_number, length);

            let etag = store
                .upload_part(bucket, key, upload_id, part_number, body)
                .await?;

            let now = loaded.fetch_add(length, Ordering::Relaxed) + length;
            sink.on_progress(&UploadProgress {
                key: key.to_string(),
                part: part_number,
                loaded: now,
                total: file_size,
            });

            Ok::<_, GatewayError>(UploadedPart { part_number, etag })
        })
        .buffer_unordered(queue_size)
        .try_collect()
        .await?;

    parts.sort_by_key(|part| part.part_number);
    Ok(parts)
}

async fn read_range(path: &Path, offset: u64, length: u64) -> Result<Vec<u8>, GatewayError> {
    let path_str = path.display().to_string();
    let io_err = |e| GatewayError::from_io(e, &path_str);

    let mut file = tokio::fs::File::open(path).await.map_err(io_err)?;
    file.seek(SeekFrom::Start(offset)).await.map_err(io_err)?;

    let mut buffer = vec![0u8; length as usize];
    file.read_exact(&mut buffer).await.map_err(io_err)?;
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::sync::Mutex;

    use super::*;
    use crate::b2::store::memory::MemoryStore;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<UploadProgress>>);

    impl ProgressSink for Recorder {
        fn on_progress(&self, progress: &UploadProgress) {
            self.0.lock().unwrap().push(progress.clone());
        }
    }

    fn small_parts() -> UploadOptions {
        UploadOptions {
            part_size: 1024,
            queue_size: QUEUE_SIZE,
        }
    }

    fn temp_file(len: usize) -> (tempfile::NamedTempFile, Vec<u8>) {
        let data: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&data).unwrap();
        file.flush().unwrap();
        (file, data)
    }

    #[tokio::test]
    async fn test_small_file_uses_single_request() {
        let store = MemoryStore::with_bucket("media");
        let (file, data) = temp_file(100);
        let recorder = Recorder::default();

        upload_file(&store, "media", "k", file.path(), &small_parts(), &recorder)
            .await
            .unwrap();

        assert_eq!(store.calls_named("put_object"), 1);
        assert_eq!(store.calls_named("create_multipart_upload"), 0);
        assert_eq!(store.object("media", "k").unwrap(), data);
        assert_eq!(recorder.0.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_multipart_reassembles_in_order() {
        let store = MemoryStore::with_bucket("media");
        let (file, data) = temp_file(10 * 1024 + 17);
        let recorder = Recorder::default();

        let stored = upload_file(&store, "media", "k", file.path(), &small_parts(), &recorder)
            .await
            .unwrap();

        assert!(stored.etag.is_some());
        assert_eq!(store.calls_named("upload_part"), 11);
        assert_eq!(store.object("media", "k").unwrap(), data);
        assert!(store.max_in_flight() <= QUEUE_SIZE);
        assert!(store.max_in_flight() > 1);

        let progress = recorder.0.lock().unwrap();
        assert_eq!(progress.len(), 11);
        let last = progress.iter().map(|p| p.loaded).max().unwrap();
        assert_eq!(last, data.len() as u64);
    }

    #[tokio::test]
    async fn test_failed_part_aborts_upload() {
        let store = MemoryStore::with_bucket("media").failing_part(3);
        let (file, _) = temp_file(8 * 1024);

        let err = upload_file(&store, "media", "k", file.path(), &small_parts(), &Recorder::default())
            .await
            .unwrap_err();

        assert_eq!(err.status(), 500);
        assert_eq!(store.calls_named("abort_multipart_upload"), 1);
        assert_eq!(store.calls_named("complete_multipart_upload"), 0);
        assert_eq!(store.pending_uploads(), 0);
        assert!(store.object("media", "k").is_none());
    }

    #[tokio::test]
    async fn test_too_many_parts_rejected_before_upload() {
        let store = MemoryStore::with_bucket("media");
        let (file, _) = temp_file(20_001);
        let options = UploadOptions {
            part_size: 2,
            queue_size: 1,
        };

        let err = upload_file(&store, "media", "k", file.path(), &options, &Recorder::default())
            .await
            .unwrap_err();

        assert_eq!(
            err,
            GatewayError::FileTooLarge {
                size: 20_001,
                max: 20_000
            }
        );
        assert!(store.calls().is_empty());
    }

    #[tokio::test]
    async fn test_missing_file_is_io_error() {
        let store = MemoryStore::with_bucket("media");

        let err = upload_file(
            &store,
            "media",
            "k",
            Path::new("/definitely/not/here.png"),
            &UploadOptions::default(),
            &Recorder::default(),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, GatewayError::Io { .. }));
        assert!(store.calls().is_empty());
    }

    #[test]
    fn test_percentage() {
        let progress = UploadProgress {
            key: "k".to_string(),
            part: 1,
            loaded: 1,
            total: 4,
        };
        assert_eq!(progress.percentage(), 25.0);
    }
}
