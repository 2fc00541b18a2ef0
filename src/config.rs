use std::env;

use crate::b2::GatewayError;

/// Ambient configuration for Backblaze B2 operations
///
/// Read once at process start and handed to the gateway; every operation
/// derives its own scoped credentials from it.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub region: String,
    pub bucket: String,
    pub cdn_url: Option<String>,
}

impl Config {
    /// Load configuration from environment variables and .env file
    ///
    /// Missing values degrade to empty strings. The storage service reports
    /// them later as an authentication failure.
    pub fn from_env() -> Self {
        dotenv::dotenv().ok(); // Load .env file if it exists

        Self {
            access_key_id: env::var("BACKBLAZE_ACCESS_KEY_ID").unwrap_or_default(),
            secret_access_key: env::var("BACKBLAZE_SECRET_ACCESS_KEY").unwrap_or_default(),
            region: env::var("BACKBLAZE_REGION").unwrap_or_default(),
            bucket: env::var("BACKBLAZE_BUCKET_NAME").unwrap_or_default(),
            cdn_url: env::var("BACKBLAZE_CDN_URL")
                .ok()
                .filter(|url| !url.trim().is_empty()),
        }
    }

    /// S3-compatible endpoint for the configured region
    pub fn endpoint(&self) -> String {
        endpoint_for(&self.region)
    }

    /// Validate a bucket name according to Backblaze B2 rules
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::InvalidInput` describing the first rule broken
    pub fn validate_bucket_name(bucket: &str) -> Result<(), GatewayError> {
        let invalid = |message: String| Err(GatewayError::InvalidInput { message });

        if bucket.is_empty() {
            return invalid("Bucket name cannot be empty".to_string());
        }

        if bucket.len() < 6 || bucket.len() > 63 {
            return invalid(format!(
                "Bucket name '{}' must be between 6 and 63 characters (got {})",
                bucket,
                bucket.len()
            ));
        }

        if let Some(c) = bucket
            .chars()
            .find(|c| !c.is_ascii_alphanumeric() && *c != '-')
        {
            return invalid(format!(
                "Bucket name '{}' contains invalid character '{}'. Only letters, numbers and hyphens are allowed",
                bucket, c
            ));
        }

        if bucket.to_ascii_lowercase().starts_with("b2-") {
            return invalid(format!(
                "Bucket name '{}' cannot start with 'b2-' (reserved by Backblaze)",
                bucket
            ));
        }

        Ok(())
    }
}

/// Log filter directive: `LOG_LEVEL`, then `RUST_LOG`, then `info`
pub fn log_level() -> String {
    pick_log_level(env::var("LOG_LEVEL").ok(), env::var("RUST_LOG").ok())
}

fn pick_log_level(log_level: Option<String>, rust_log: Option<String>) -> String {
    log_level
        .into_iter()
        .chain(rust_log)
        .find(|level| !level.trim().is_empty())
        .unwrap_or_else(|| "info".to_string())
}

/// Build the path-style S3 endpoint for a B2 region
pub fn endpoint_for(region: &str) -> String {
    format!("https://s3.{}.backblazeb2.com/", region)
}
