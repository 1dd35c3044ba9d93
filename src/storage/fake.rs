//! Scripted in-memory storage used by the storage, service and handler tests.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::storage::client::{PutObject, StorageClient, StorageConnector};
use crate::storage::error::StorageError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedPut {
    pub region: String,
    pub bucket: String,
    pub key: String,
    pub content_type: String,
    pub len: usize,
}

#[derive(Default)]
struct FakeState {
    location: Option<Result<Option<String>, StorageError>>,
    put_results: VecDeque<Result<(), StorageError>>,
    connects: Vec<String>,
    discovery_regions: Vec<String>,
    puts: Vec<RecordedPut>,
    put_gate: Option<Arc<Notify>>,
}

#[derive(Clone, Default)]
pub struct FakeStorage {
    state: Arc<Mutex<FakeState>>,
}

impl FakeStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_location(self, location: Result<Option<String>, StorageError>) -> Self {
        self.set_location(location);
        self
    }

    /// Queues outcomes for successive puts; once drained, puts succeed.
    pub fn with_put_results(self, results: Vec<Result<(), StorageError>>) -> Self {
        self.state.lock().put_results.extend(results);
        self
    }

    /// Holds every put after it is recorded until the gate is notified.
    pub fn with_put_gate(self, gate: Arc<Notify>) -> Self {
        self.state.lock().put_gate = Some(gate);
        self
    }

    pub fn set_location(&self, location: Result<Option<String>, StorageError>) {
        self.state.lock().location = Some(location);
    }

    pub fn connector(&self) -> Arc<dyn StorageConnector> {
        Arc::new(self.clone())
    }

    pub fn connects(&self) -> Vec<String> {
        self.state.lock().connects.clone()
    }

    pub fn discovery_calls(&self) -> usize {
        self.state.lock().discovery_regions.len()
    }

    pub fn discovery_regions(&self) -> Vec<String> {
        self.state.lock().discovery_regions.clone()
    }

    pub fn puts(&self) -> Vec<RecordedPut> {
        self.state.lock().puts.clone()
    }
}

impl StorageConnector for FakeStorage {
    fn connect(&self, region: &str) -> Arc<dyn StorageClient> {
        self.state.lock().connects.push(region.to_string());
        Arc::new(FakeClient {
            region: region.to_string(),
            state: self.state.clone(),
        })
    }
}

struct FakeClient {
    region: String,
    state: Arc<Mutex<FakeState>>,
}

#[async_trait]
impl StorageClient for FakeClient {
    fn region(&self) -> &str {
        &self.region
    }

    async fn bucket_location(&self, _bucket: &str) -> Result<Option<String>, StorageError> {
        let mut state = self.state.lock();
        state.discovery_regions.push(self.region.clone());
        state.location.clone().unwrap_or(Ok(None))
    }

    async fn put_object(&self, request: PutObject<'_>) -> Result<(), StorageError> {
        let gate = {
            let mut state = self.state.lock();
            state.puts.push(RecordedPut {
                region: self.region.clone(),
                bucket: request.bucket.to_string(),
                key: request.key.to_string(),
                content_type: request.content_type.to_string(),
                len: request.body.len(),
            });
            state.put_gate.clone()
        };
        if let Some(gate) = gate {
            gate.notified().await;
        }
        self.state.lock().put_results.pop_front().unwrap_or(Ok(()))
    }
}
