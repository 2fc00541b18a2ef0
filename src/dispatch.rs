use serde_json::json;
use tracing::{error, info};

use crate::b2::{Connect, Gateway, ProgressSink};
use crate::cli::{Cli, Intent};
use crate::report::Report;

/// Resolve the flags and run the selected action
///
/// Validation failures are reported with status 400 without touching
/// the gateway.
pub async fn run<C: Connect>(gateway: &Gateway<C>, cli: &Cli, sink: &dyn ProgressSink) -> Report {
    match cli.intent() {
        Ok(intent) => dispatch(gateway, intent, sink).await,
        Err(e) => Report::new(400, e.to_string()),
    }
}

/// Run exactly one gateway operation for an intent
pub async fn dispatch<C: Connect>(
    gateway: &Gateway<C>,
    intent: Intent,
    sink: &dyn ProgressSink,
) -> Report {
    info!("Dispatching {:?}", intent);

    let result = match intent {
        Intent::FilterObjects { key, bucket } => gateway
            .filter_objects(&key, bucket.as_deref().unwrap_or_default())
            .await
            .map(|items| Report::ok(format!("Found {} files", items.len())).with_data(items)),
        Intent::DeleteOne { event_id, post_id } => gateway
            .delete_one(&event_id, &post_id)
            .await
            .map(|summary| {
                Report::ok(format!("Deleted {} files", summary.deleted.len())).with_data(summary)
            }),
        Intent::DeleteMany { event_id } => gateway.delete_many(&event_id).await.map(|summary| {
            Report::ok(format!("Deleted {} files", summary.deleted.len())).with_data(summary)
        }),
        Intent::Upload { path, event_id } => gateway
            .upload_object(&path, &event_id, sink)
            .await
            .map(|media| Report::ok("Upload Complete").with_data(media)),
        Intent::ListBuckets => gateway
            .list_buckets()
            .await
            .map(|buckets| Report::ok(format!("Found {} buckets", buckets.len())).with_data(buckets)),
        Intent::CreateBucket { bucket } => gateway
            .create_bucket(&bucket)
            .await
            .map(|()| Report::ok("Bucket Created").with_data(json!({ "name": bucket }))),
        Intent::DestroyBucket { bucket } => gateway
            .destroy_bucket(&bucket)
            .await
            .map(|()| Report::ok("Bucket Deleted").with_data(json!({ "name": bucket }))),
        Intent::ListObjects { bucket } => gateway
            .list_objects(&bucket)
            .await
            .map(|listing| Report::ok(format!("Found {} files", listing.total_items)).with_data(listing)),
        Intent::CheckBucket { bucket } => gateway
            .bucket_exists(&bucket)
            .await
            .map(|()| Report::ok("Bucket exists").with_data(json!({ "name": bucket }))),
    };

    result.unwrap_or_else(|e| {
        if e.is_benign() {
            info!("{}", e);
        } else {
            error!("{}", e);
        }
        Report::from(&e)
    })
}
