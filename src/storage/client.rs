use std::sync::Arc;

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_credential_types::Credentials;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use serde_json::json;

use crate::config::StorageConfig;
use crate::storage::error::StorageError;
use crate::storage::region::BASELINE_REGION;
use crate::utils::timing::log_provider_timing;

#[derive(Debug, Clone, Copy)]
pub struct PutObject<'a> {
    pub bucket: &'a str,
    pub key: &'a str,
    pub body: &'a [u8],
    pub content_type: &'a str,
}

/// A storage handle bound to one region.
#[async_trait]
pub trait StorageClient: Send + Sync {
    fn region(&self) -> &str;

    /// Raw location constraint for `bucket`; `None` when the provider reports none.
    async fn bucket_location(&self, bucket: &str) -> Result<Option<String>, StorageError>;

    async fn put_object(&self, request: PutObject<'_>) -> Result<(), StorageError>;
}

/// Builds region-bound clients sharing one credential set.
pub trait StorageConnector: Send + Sync {
    fn connect(&self, region: &str) -> Arc<dyn StorageClient>;
}

pub struct S3Connector {
    base: SdkConfig,
    force_path_style: bool,
}

impl S3Connector {
    pub async fn from_config(config: &StorageConfig) -> Self {
        let credentials = Credentials::new(
            config.access_key_id.clone(),
            config.secret_access_key.clone(),
            None,
            None,
            "physiognomy-env",
        );

        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .credentials_provider(credentials)
            .region(Region::new(BASELINE_REGION));
        if let Some(endpoint) = &config.endpoint_url {
            loader = loader.endpoint_url(endpoint);
        }

        Self {
            base: loader.load().await,
            force_path_style: config.force_path_style,
        }
    }
}

impl StorageConnector for S3Connector {
    fn connect(&self, region: &str) -> Arc<dyn StorageClient> {
        let conf = aws_sdk_s3::config::Builder::from(&self.base)
            .region(Region::new(region.to_string()))
            .force_path_style(self.force_path_style)
            .build();
        Arc::new(S3StorageClient {
            client: Client::from_conf(conf),
            region: region.to_string(),
        })
    }
}

pub struct S3StorageClient {
    client: Client,
    region: String,
}

#[async_trait]
impl StorageClient for S3StorageClient {
    fn region(&self) -> &str {
        &self.region
    }

    async fn bucket_location(&self, bucket: &str) -> Result<Option<String>, StorageError> {
        let metadata = json!({ "bucket": bucket, "region": self.region });
        log_provider_timing("s3", "get_bucket_location", Some(metadata), || async {
            let output = self
                .client
                .get_bucket_location()
                .bucket(bucket)
                .send()
                .await
                .map_err(StorageError::from_sdk)?;
            Ok(output
                .location_constraint()
                .map(|constraint| constraint.as_str().to_string()))
        })
        .await
    }

    async fn put_object(&self, request: PutObject<'_>) -> Result<(), StorageError> {
        let metadata = json!({
            "bucket": request.bucket,
            "key": request.key,
            "region": self.region,
            "bytes": request.body.len(),
        });
        log_provider_timing("s3", "put_object", Some(metadata), || async {
            self.client
                .put_object()
                .bucket(request.bucket)
                .key(request.key)
                .content_type(request.content_type)
                .body(ByteStream::from(request.body.to_vec()))
                .send()
                .await
                .map_err(StorageError::from_sdk)?;
            Ok(())
        })
        .await
    }
}
