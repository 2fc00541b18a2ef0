use std::path::PathBuf;

use clap::Parser;
use thiserror::Error;

#[derive(Parser, Debug, Clone, Default)]
#[command(
    name = "b2media",
    version = env!("CARGO_PKG_VERSION"),
    author = "Tyr Chen <tyr.chen@gmail.com>",
    about = "Upload, list and delete event media on Backblaze B2",
    long_about = "Manage event media stored in a Backblaze B2 bucket through its S3-compatible API. \
                  Media lives under events/{eventId}/media/{fileName}. The flags given select a single action; \
                  the result is printed to stdout as a {status, message, body, data} object.",
    after_help = "Examples:\n  \
                  b2media --eventId E1 --path ./photo.png         # Upload to events/E1/media/photo.png\n  \
                  b2media --eventId E1 --key photo                # List keys containing 'photo'\n  \
                  b2media --eventId E1 --post P7 --destroy        # Delete the files of post P7\n  \
                  b2media --eventId E1 --destroy                  # Delete all media of event E1\n  \
                  b2media --bucket my-bucket                      # Check that a bucket exists\n  \
                  b2media --bucket my-bucket --create             # Create a bucket\n  \
                  b2media --bucket my-bucket --burn               # Delete a bucket\n  \
                  b2media --buckets                               # List buckets\n\n\
                  Configuration (.env):\n  \
                  BACKBLAZE_ACCESS_KEY_ID=...\n  \
                  BACKBLAZE_SECRET_ACCESS_KEY=...\n  \
                  BACKBLAZE_REGION=us-west-004\n  \
                  BACKBLAZE_BUCKET_NAME=my-bucket"
)]
pub struct Cli {
    /// Event the media belongs to
    #[arg(short = 'e', long = "eventId", visible_alias = "event-id")]
    pub event_id: Option<String>,

    /// Bucket name
    #[arg(short = 'b', long)]
    pub bucket: Option<String>,

    /// File to upload
    #[arg(short = 'p', long)]
    pub path: Option<PathBuf>,

    /// Post whose files should be deleted, or the name of a single file
    #[arg(short = 'x', long)]
    pub post: Option<String>,

    /// List keys containing this text
    #[arg(short = 'k', long)]
    pub key: Option<String>,

    /// Create the bucket
    #[arg(short = 'c', long)]
    pub create: bool,

    /// Delete files (with --eventId) or the bucket (with --bucket)
    #[arg(short = 'd', long, visible_alias = "burn")]
    pub destroy: bool,

    /// List all buckets
    #[arg(short = 'B', long)]
    pub buckets: bool,

    /// List every object in the bucket
    #[arg(short = 'l', long)]
    pub list: bool,
}

/// The single action selected by a set of flags
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    FilterObjects {
        key: String,
        bucket: Option<String>,
    },
    DeleteOne {
        event_id: String,
        post_id: String,
    },
    DeleteMany {
        event_id: String,
    },
    Upload {
        path: PathBuf,
        event_id: String,
    },
    ListBuckets,
    CreateBucket {
        bucket: String,
    },
    DestroyBucket {
        bucket: String,
    },
    ListObjects {
        bucket: String,
    },
    CheckBucket {
        bucket: String,
    },
}

/// Flag combinations that do not select any action
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Please provide a bucket name")]
    MissingBucket,
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl Cli {
    /// Resolve the flags into one intent
    ///
    /// Event actions require an event id and are checked first, in the order
    /// list, delete one, delete many, upload. Bucket actions follow.
    pub fn intent(&self) -> Result<Intent, ValidationError> {
        let key = non_blank(&self.key);
        let is_list_files = key.is_some() && self.path.is_none();
        let is_delete_file = self.destroy && self.post.is_some();
        let is_delete_files = self.destroy && self.post.is_none();
        let is_upload_file = self.path.is_some() && key.is_none();

        if let Some(event_id) = non_blank(&self.event_id) {
            let event_id = event_id.to_string();

            if is_list_files {
                return Ok(Intent::FilterObjects {
                    key: key.unwrap_or_default().to_string(),
                    bucket: non_blank(&self.bucket).map(str::to_string),
                });
            }
            if is_delete_file {
                return Ok(Intent::DeleteOne {
                    event_id,
                    post_id: self.post.clone().unwrap_or_default(),
                });
            }
            if is_delete_files {
                return Ok(Intent::DeleteMany { event_id });
            }
            if is_upload_file {
                return Ok(Intent::Upload {
                    path: self.path.clone().unwrap_or_default(),
                    event_id,
                });
            }
        }

        if self.buckets {
            return Ok(Intent::ListBuckets);
        }

        let bucket = non_blank(&self.bucket)
            .ok_or(ValidationError::MissingBucket)?
            .to_string();

        Ok(if self.create {
            Intent::CreateBucket { bucket }
        } else if self.destroy {
            Intent::DestroyBucket { bucket }
        } else if self.list {
            Intent::ListObjects { bucket }
        } else {
            Intent::CheckBucket { bucket }
        })
    }
}
