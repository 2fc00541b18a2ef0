pub mod classify;
pub mod client;
pub mod error;
pub mod gateway;
pub mod keys;
pub mod multipart;
pub mod scope;
pub mod store;

pub use classify::{FileType, classify};
pub use client::{B2Client, B2Connector};
pub use error::GatewayError;
pub use gateway::{Gateway, ObjectListing, UploadedMedia};
pub use multipart::{LogProgress, ProgressSink, UploadOptions, UploadProgress};
pub use scope::{OperationCredentials, scope_for_query, scope_for_upload};
pub use store::{Connect, DeleteSummary, ObjectStore, ObjectSummary};
