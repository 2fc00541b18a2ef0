use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use serde_json::{Value, json};
use thiserror::Error;

/// Status reported when the service gave none
pub const FALLBACK_STATUS: u16 = 400;

/// Errors returned by storage gateway operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GatewayError {
    /// The storage service answered with an error response
    #[error("{message}")]
    Service {
        status: u16,
        code: Option<String>,
        message: String,
        request_id: Option<String>,
    },

    /// The request never produced an HTTP response
    #[error("Transport error: {message}")]
    Transport { message: String },

    /// Local file could not be read
    #[error("I/O error for {path}: {message}")]
    Io { path: String, message: String },

    /// A scoped delete matched no objects
    #[error("No Files Found")]
    NoFilesFound,

    #[error("Bucket already exists")]
    BucketAlreadyExists,

    #[error("Bucket does not exist")]
    BucketDoesNotExist,

    /// File would need more parts than a multipart upload allows
    #[error("File too large: {size} bytes (max: {max} bytes)")]
    FileTooLarge { size: u64, max: u64 },

    /// Missing or malformed command input
    #[error("{message}")]
    InvalidInput { message: String },
}

impl GatewayError {
    /// Normalize an AWS SDK error, keeping the HTTP status when there is one
    pub fn from_sdk<E>(err: SdkError<E>) -> Self
    where
        E: ProvideErrorMetadata + std::error::Error + 'static,
    {
        let Some(response) = err.raw_response() else {
            return Self::Transport {
                message: DisplayErrorContext(&err).to_string(),
            };
        };

        let status = response.status().as_u16();
        let request_id = response
            .headers()
            .get("x-amz-request-id")
            .map(str::to_string);
        let code = err.code().map(str::to_string);
        let message = err
            .message()
            .map(str::to_string)
            .or_else(|| code.clone())
            .unwrap_or_else(|| DisplayErrorContext(&err).to_string());

        Self::Service {
            status,
            code,
            message,
            request_id,
        }
    }

    pub fn from_io(error: std::io::Error, path: &str) -> Self {
        Self::Io {
            path: path.to_string(),
            message: error.to_string(),
        }
    }

    /// Status code for the result envelope
    pub fn status(&self) -> u16 {
        match self {
            Self::Service { status, .. } => *status,
            _ => FALLBACK_STATUS,
        }
    }

    /// True when the error means "nothing to do" rather than a failure
    pub fn is_benign(&self) -> bool {
        matches!(self, Self::NoFilesFound)
    }

    /// True when the service reported the target as missing
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Service { status: 404, .. })
    }

    /// Service metadata for the envelope body, if any
    pub fn body(&self) -> Option<Value> {
        match self {
            Self::Service {
                status,
                code,
                request_id,
                ..
            } => Some(json!({
                "httpStatusCode": status,
                "code": code,
                "requestId": request_id,
            })),
            _ => None,
        }
    }

    /// Get a user-friendly error message with suggestions
    pub fn user_message(&self) -> String {
        match self {
            Self::Service { status: 401, .. } | Self::Service { status: 403, .. } => {
                format!(
                    "{}\n\nPossible solutions:\n  \
                     1. Check BACKBLAZE_ACCESS_KEY_ID and BACKBLAZE_SECRET_ACCESS_KEY in .env\n  \
                     2. Verify the application key is allowed to access the bucket\n  \
                     3. Check BACKBLAZE_REGION matches the bucket region",
                    self
                )
            }
            Self::Transport { .. } => {
                format!(
                    "{}\n\nPossible solutions:\n  \
                     1. Check your internet connection\n  \
                     2. Verify BACKBLAZE_REGION is set (e.g. us-west-004)\n  \
                     3. Check if you're behind a proxy/firewall",
                    self
                )
            }
            _ => self.to_string(),
        }
    }
}
