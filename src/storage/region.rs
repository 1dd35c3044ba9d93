use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{info, warn};

use crate::storage::client::{StorageClient, StorageConnector};

/// Provider default region; also the region discovery calls are issued from.
pub const BASELINE_REGION: &str = "us-east-1";

const LEGACY_REGION_ALIASES: &[(&str, &str)] = &[("EU", "eu-west-1")];

pub fn normalize_region(location: Option<&str>) -> String {
    let trimmed = location.map(str::trim).unwrap_or_default();
    if trimmed.is_empty() {
        return BASELINE_REGION.to_string();
    }
    LEGACY_REGION_ALIASES
        .iter()
        .find(|(alias, _)| *alias == trimmed)
        .map(|(_, modern)| modern.to_string())
        .unwrap_or_else(|| trimmed.to_string())
}

/// The region in use together with the client bound to it.
#[derive(Clone)]
pub struct StorageContext {
    pub region: String,
    pub client: Arc<dyn StorageClient>,
}

/// Resolves and caches the bucket's region.
///
/// Region and client are stored as one `StorageContext`, so they are always
/// set and cleared together. Concurrent invalidations may trigger duplicate
/// discovery calls; each caller still ends up with a consistent pair.
pub struct RegionResolver {
    bucket: String,
    fixed_region: Option<String>,
    connector: Arc<dyn StorageConnector>,
    context: Mutex<Option<StorageContext>>,
}

impl RegionResolver {
    pub fn new(
        bucket: impl Into<String>,
        fixed_region: Option<&str>,
        connector: Arc<dyn StorageConnector>,
    ) -> Self {
        Self {
            bucket: bucket.into(),
            fixed_region: fixed_region.map(|region| normalize_region(Some(region))),
            connector,
            context: Mutex::new(None),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    #[cfg(test)]
    pub fn cached_region(&self) -> Option<String> {
        self.context.lock().as_ref().map(|ctx| ctx.region.clone())
    }

    #[cfg(test)]
    pub async fn resolve_region(&self) -> String {
        self.context().await.region
    }

    /// Returns the cached pair, resolving and connecting on first use.
    pub async fn context(&self) -> StorageContext {
        let cached = self.context.lock().clone();
        if let Some(ctx) = cached {
            return ctx;
        }

        let region = match &self.fixed_region {
            Some(region) => region.clone(),
            None => self.discover().await,
        };
        let ctx = StorageContext {
            client: self.connector.connect(&region),
            region,
        };
        *self.context.lock() = Some(ctx.clone());
        ctx
    }

    pub fn invalidate(&self) {
        if let Some(previous) = self.context.lock().take() {
            info!(
                "Invalidated storage region {} for bucket {}",
                previous.region, self.bucket
            );
        }
    }

    async fn discover(&self) -> String {
        let client = self.connector.connect(BASELINE_REGION);
        match client.bucket_location(&self.bucket).await {
            Ok(location) => {
                let region = normalize_region(location.as_deref());
                info!(
                    "Discovered region {} for bucket {} (location={:?})",
                    region, self.bucket, location
                );
                region
            }
            Err(err) => {
                warn!(
                    "Bucket location lookup failed for {}: {}; falling back to {}",
                    self.bucket, err, BASELINE_REGION
                );
                BASELINE_REGION.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::fake::FakeStorage;
    use crate::storage::error::StorageError;

    #[test]
    fn empty_locations_normalize_to_baseline() {
        assert_eq!(normalize_region(None), BASELINE_REGION);
        assert_eq!(normalize_region(Some("")), BASELINE_REGION);
        assert_eq!(normalize_region(Some("  ")), BASELINE_REGION);
    }

    #[test]
    fn legacy_alias_maps_to_modern_region() {
        assert_eq!(normalize_region(Some("EU")), "eu-west-1");
    }

    #[test]
    fn other_locations_pass_through() {
        for region in ["eu-central-1", "ap-southeast-2", "us-west-2", "custom-zone"] {
            assert_eq!(normalize_region(Some(region)), region);
        }
    }

    #[tokio::test]
    async fn fixed_region_never_discovers() {
        let fake = FakeStorage::new().with_location(Ok(Some("eu-west-1".to_string())));
        let resolver = RegionResolver::new("bucket", Some("ap-northeast-1"), fake.connector());

        assert_eq!(resolver.resolve_region().await, "ap-northeast-1");
        resolver.invalidate();
        assert_eq!(resolver.resolve_region().await, "ap-northeast-1");
        assert_eq!(fake.discovery_calls(), 0);
    }

    #[tokio::test]
    async fn fixed_legacy_alias_is_normalized() {
        let fake = FakeStorage::new();
        let resolver = RegionResolver::new("bucket", Some("EU"), fake.connector());
        assert_eq!(resolver.resolve_region().await, "eu-west-1");
    }

    #[tokio::test]
    async fn discovery_runs_from_baseline_and_is_cached() {
        let fake = FakeStorage::new().with_location(Ok(Some("eu-central-1".to_string())));
        let resolver = RegionResolver::new("bucket", None, fake.connector());

        assert_eq!(resolver.resolve_region().await, "eu-central-1");
        assert_eq!(resolver.resolve_region().await, "eu-central-1");
        assert_eq!(fake.discovery_calls(), 1);
        assert_eq!(fake.discovery_regions(), vec![BASELINE_REGION.to_string()]);
        assert_eq!(resolver.cached_region().as_deref(), Some("eu-central-1"));
    }

    #[tokio::test]
    async fn discovery_failure_falls_back_to_baseline() {
        let fake = FakeStorage::new().with_location(Err(StorageError::new(
            Some(403),
            Some("AccessDenied"),
            "Access Denied",
        )));
        let resolver = RegionResolver::new("bucket", None, fake.connector());

        assert_eq!(resolver.resolve_region().await, BASELINE_REGION);
        assert_eq!(resolver.cached_region().as_deref(), Some(BASELINE_REGION));
    }

    #[tokio::test]
    async fn invalidate_clears_region_and_client_together() {
        let fake = FakeStorage::new().with_location(Ok(None));
        let resolver = RegionResolver::new("bucket", None, fake.connector());

        let first = resolver.context().await;
        assert_eq!(first.region, BASELINE_REGION);
        assert_eq!(first.client.region(), first.region);

        fake.set_location(Ok(Some("EU".to_string())));
        resolver.invalidate();
        assert_eq!(resolver.cached_region(), None);

        let second = resolver.context().await;
        assert_eq!(second.region, "eu-west-1");
        assert_eq!(second.client.region(), "eu-west-1");
        assert_eq!(fake.discovery_calls(), 2);
    }
}
