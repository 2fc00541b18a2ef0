use std::sync::Arc;

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_s3::Client;
use aws_sdk_s3::config::{Credentials, RequestChecksumCalculation, ResponseChecksumValidation};
use aws_sdk_s3::primitives::{ByteStream, DateTimeFormat};
use aws_sdk_s3::types::{
    BucketLocationConstraint, CompletedMultipartUpload, CompletedPart, CreateBucketConfiguration,
    Delete, ObjectIdentifier,
};
use tracing::debug;

use super::error::GatewayError;
use super::scope::OperationCredentials;
use super::store::{
    Connect, DeleteFailure, DeleteSummary, ObjectPage, ObjectStore, ObjectSummary, StoredObject,
    UploadedPart,
};

/// S3-compatible client bound to one B2 region and key pair
pub struct B2Client {
    client: Client,
}

impl B2Client {
    pub async fn new(creds: &OperationCredentials) -> Self {
        let credentials = Credentials::new(
            &creds.access_key_id,
            &creds.secret_access_key,
            None,
            None,
            "backblaze-b2",
        );

        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(creds.region.clone()))
            .endpoint_url(creds.endpoint())
            .credentials_provider(credentials)
            .load()
            .await;

        // B2 rejects the SDK's default flexible checksums on some calls
        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(true)
            .request_checksum_calculation(RequestChecksumCalculation::WhenRequired)
            .response_checksum_validation(ResponseChecksumValidation::WhenRequired)
            .build();

        debug!("B2 client initialized for {}", creds.endpoint());

        Self {
            client: Client::from_conf(s3_config),
        }
    }
}

fn build_error(err: impl std::fmt::Display) -> GatewayError {
    GatewayError::InvalidInput {
        message: err.to_string(),
    }
}

#[async_trait]
impl ObjectStore for B2Client {
    async fn list_buckets(&self) -> Result<Vec<String>, GatewayError> {
        let output = self
            .client
            .list_buckets()
            .send()
            .await
            .map_err(GatewayError::from_sdk)?;

        Ok(output
            .buckets()
            .iter()
            .filter_map(|b| b.name().map(str::to_string))
            .collect())
    }

    async fn list_objects_page(
        &self,
        bucket: &str,
        continuation: Option<&str>,
    ) -> Result<ObjectPage, GatewayError> {
        let output = self
            .client
            .list_objects_v2()
            .bucket(bucket)
            .set_continuation_token(continuation.map(str::to_string))
            .send()
            .await
            .map_err(GatewayError::from_sdk)?;

        let objects = output
            .contents()
            .iter()
            .filter_map(|object| {
                Some(ObjectSummary {
                    key: object.key()?.to_string(),
                    size: object.size().unwrap_or(0),
                    last_modified: object
                        .last_modified()
                        .and_then(|dt| dt.fmt(DateTimeFormat::DateTime).ok()),
                    etag: object.e_tag().map(str::to_string),
                })
            })
            .collect();

        let next_token = if output.is_truncated().unwrap_or(false) {
            output.next_continuation_token().map(str::to_string)
        } else {
            None
        };

        Ok(ObjectPage {
            objects,
            next_token,
        })
    }

    async fn head_bucket(&self, bucket: &str) -> Result<(), GatewayError> {
        self.client
            .head_bucket()
            .bucket(bucket)
            .send()
            .await
            .map_err(GatewayError::from_sdk)?;
        Ok(())
    }

    async fn create_bucket(&self, bucket: &str, region: &str) -> Result<(), GatewayError> {
        let configuration = CreateBucketConfiguration::builder()
            .location_constraint(BucketLocationConstraint::from(region))
            .build();

        self.client
            .create_bucket()
            .bucket(bucket)
            .create_bucket_configuration(configuration)
            .send()
            .await
            .map_err(GatewayError::from_sdk)?;
        Ok(())
    }

    async fn delete_bucket(&self, bucket: &str) -> Result<(), GatewayError> {
        self.client
            .delete_bucket()
            .bucket(bucket)
            .send()
            .await
            .map_err(GatewayError::from_sdk)?;
        Ok(())
    }

    async fn delete_objects(
        &self,
        bucket: &str,
        keys: &[String],
    ) -> Result<DeleteSummary, GatewayError> {
        let objects = keys
            .iter()
            .map(|key| ObjectIdentifier::builder().key(key).build())
            .collect::<Result<Vec<_>, _>>()
            .map_err(build_error)?;

        let delete = Delete::builder()
            .set_objects(Some(objects))
            .build()
            .map_err(build_error)?;

        let output = self
            .client
            .delete_objects()
            .bucket(bucket)
            .delete(delete)
            .send()
            .await
            .map_err(GatewayError::from_sdk)?;

        Ok(DeleteSummary {
            deleted: output
                .deleted()
                .iter()
                .filter_map(|d| d.key().map(str::to_string))
                .collect(),
            errors: output
                .errors()
                .iter()
                .map(|e| DeleteFailure {
                    key: e.key().unwrap_or_default().to_string(),
                    code: e.code().map(str::to_string),
                    message: e.message().map(str::to_string),
                })
                .collect(),
        })
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
    ) -> Result<StoredObject, GatewayError> {
        let content_length = body.len() as i64;
        let output = self
            .client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(ByteStream::from(body))
            .content_length(content_length)
            .send()
            .await
            .map_err(GatewayError::from_sdk)?;

        Ok(StoredObject {
            etag: output.e_tag().map(str::to_string),
            location: None,
        })
    }

    async fn create_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
    ) -> Result<String, GatewayError> {
        let output = self
            .client
            .create_multipart_upload()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(GatewayError::from_sdk)?;

        output
            .upload_id()
            .map(str::to_string)
            .ok_or_else(|| GatewayError::Transport {
                message: "No upload ID returned from B2".to_string(),
            })
    }

    async fn upload_part(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        part_number: i32,
        body: Vec<u8>,
    ) -> Result<String, GatewayError> {
        let output = self
            .client
            .upload_part()
            .bucket(bucket)
            .key(key)
            .upload_id(upload_id)
            .part_number(part_number)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(GatewayError::from_sdk)?;

        Ok(output.e_tag().unwrap_or_default().to_string())
    }

    async fn complete_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        parts: Vec<UploadedPart>,
    ) -> Result<StoredObject, GatewayError> {
        let parts: Vec<CompletedPart> = parts
            .into_iter()
            .map(|part| {
                CompletedPart::builder()
                    .part_number(part.part_number)
                    .e_tag(part.etag)
                    .build()
            })
            .collect();

        let completed = CompletedMultipartUpload::builder()
            .set_parts(Some(parts))
            .build();

        let output = self
            .client
            .complete_multipart_upload()
            .bucket(bucket)
            .key(key)
            .upload_id(upload_id)
            .multipart_upload(completed)
            .send()
            .await
            .map_err(GatewayError::from_sdk)?;

        Ok(StoredObject {
            etag: output.e_tag().map(str::to_string),
            location: output.location().map(str::to_string),
        })
    }

    async fn abort_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
    ) -> Result<(), GatewayError> {
        self.client
            .abort_multipart_upload()
            .bucket(bucket)
            .key(key)
            .upload_id(upload_id)
            .send()
            .await
            .map_err(GatewayError::from_sdk)?;

        debug!("Aborted multipart upload {}", upload_id);
        Ok(())
    }
}

/// Connects a fresh `B2Client` for every operation
#[derive(Debug, Clone, Copy, Default)]
pub struct B2Connector;

#[async_trait]
impl Connect for B2Connector {
    async fn connect(&self, creds: &OperationCredentials) -> Arc<dyn ObjectStore> {
        Arc::new(B2Client::new(creds).await)
    }
}
