use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::llm::media::ImagePayload;
use crate::storage::client::PutObject;
use crate::storage::error::{FailureKind, StorageError, UploadError};
use crate::storage::region::{RegionResolver, StorageContext, BASELINE_REGION};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadOutcome {
    pub object_key: String,
    pub region: String,
}

pub fn generate_object_key(prefix: &str, extension: &str) -> String {
    let timestamp = Utc::now().format("%Y%m%dT%H%M%S%3fZ");
    let id = Uuid::new_v4().simple();
    if prefix.is_empty() {
        format!("{timestamp}-{id}.{extension}")
    } else {
        format!("{prefix}/{timestamp}-{id}.{extension}")
    }
}

/// Public URL for an object written to `bucket` in `region`.
pub fn public_url(bucket: &str, region: &str, key: &str, endpoint: Option<&str>) -> String {
    if let Some(endpoint) = endpoint {
        return format!("{}/{bucket}/{key}", endpoint.trim_end_matches('/'));
    }
    if region == BASELINE_REGION {
        format!("https://{bucket}.s3.amazonaws.com/{key}")
    } else {
        format!("https://{bucket}.s3.{region}.amazonaws.com/{key}")
    }
}

/// Uploads payloads under fresh keys, retrying once after a region mismatch.
pub struct ObjectWriter {
    resolver: Arc<RegionResolver>,
    folder_prefix: String,
}

impl ObjectWriter {
    pub fn new(resolver: Arc<RegionResolver>, folder_prefix: impl Into<String>) -> Self {
        Self {
            resolver,
            folder_prefix: folder_prefix.into(),
        }
    }

    pub fn resolver(&self) -> &RegionResolver {
        &self.resolver
    }

    async fn attempt(
        &self,
        ctx: &StorageContext,
        key: &str,
        payload: &ImagePayload,
    ) -> Result<(), StorageError> {
        debug!(
            "Putting {} ({} bytes) via {} client",
            key,
            payload.bytes.len(),
            ctx.client.region()
        );
        ctx.client
            .put_object(PutObject {
                bucket: self.resolver.bucket(),
                key,
                body: &payload.bytes,
                content_type: &payload.mime_type,
            })
            .await
    }

    pub async fn write(&self, payload: &ImagePayload) -> Result<UploadOutcome, UploadError> {
        let ctx = self.resolver.context().await;
        let key = generate_object_key(&self.folder_prefix, payload.extension());

        let err = match self.attempt(&ctx, &key, payload).await {
            Ok(()) => {
                info!(
                    "Stored object {} in bucket {} ({})",
                    key,
                    self.resolver.bucket(),
                    ctx.region
                );
                return Ok(UploadOutcome {
                    object_key: key,
                    region: ctx.region,
                });
            }
            Err(err) => err,
        };

        if err.classify() == FailureKind::Other {
            warn!(
                "Upload of {} to bucket {} ({}) failed: {}",
                key,
                self.resolver.bucket(),
                ctx.region,
                err
            );
            return Err(UploadError::Rejected(err));
        }

        warn!(
            "Upload of {} to bucket {} hit a region mismatch in {}: {}; rediscovering",
            key,
            self.resolver.bucket(),
            ctx.region,
            err
        );
        self.resolver.invalidate();
        let retry_ctx = self.resolver.context().await;

        match self.attempt(&retry_ctx, &key, payload).await {
            Ok(()) => {
                info!(
                    "Stored object {} in bucket {} ({}) after region retry",
                    key,
                    self.resolver.bucket(),
                    retry_ctx.region
                );
                Ok(UploadOutcome {
                    object_key: key,
                    region: retry_ctx.region,
                })
            }
            Err(retry_err) => {
                warn!(
                    "Retry upload of {} to bucket {} ({}) failed: {}",
                    key,
                    self.resolver.bucket(),
                    retry_ctx.region,
                    retry_err
                );
                Err(UploadError::RetryExhausted(retry_err))
            }
        }
    }
}
