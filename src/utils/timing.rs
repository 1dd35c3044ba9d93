use std::future::Future;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use tracing::info;

pub const TIMING_TARGET: &str = "app.timing";

#[derive(Debug)]
pub struct RequestTimer {
    route: String,
    request_id: String,
    started_at: DateTime<Utc>,
    started_perf: Instant,
    status: String,
    detail: Option<String>,
    completed: bool,
}

impl RequestTimer {
    pub fn start(route: &str, request_id: &str) -> Self {
        let timer = RequestTimer {
            route: route.to_string(),
            request_id: request_id.to_string(),
            started_at: Utc::now(),
            started_perf: Instant::now(),
            status: "success".to_string(),
            detail: None,
            completed: false,
        };
        info!(
            target: TIMING_TARGET,
            "event=request_received route={} request_id={} received_at={}",
            timer.route,
            timer.request_id,
            timer.started_at.to_rfc3339()
        );
        timer
    }

    pub fn complete(&mut self, status: &str, detail: Option<String>) {
        if self.completed {
            return;
        }
        self.status = status.to_string();
        self.detail = detail;
        self.completed = true;
        let completed_at = Utc::now();
        let duration = self.started_perf.elapsed().as_secs_f64();
        info!(
            target: TIMING_TARGET,
            "event=request_completed route={} request_id={} started_at={} responded_at={} duration_s={:.3} status={} detail={}",
            self.route,
            self.request_id,
            self.started_at.to_rfc3339(),
            completed_at.to_rfc3339(),
            duration,
            self.status,
            self.detail.clone().unwrap_or_default()
        );
    }
}

impl Drop for RequestTimer {
    fn drop(&mut self) {
        if !self.completed {
            self.complete("dropped", None);
        }
    }
}

/// Wraps an outbound provider call with received/completed timing events.
pub async fn log_provider_timing<T, E, F, Fut>(
    provider: &str,
    operation: &str,
    metadata: Option<JsonValue>,
    call: F,
) -> Result<T, E>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let started_at = Utc::now();
    let started_perf = Instant::now();
    let metadata_text = metadata
        .as_ref()
        .map(|value| value.to_string())
        .unwrap_or_else(|| "{}".to_string());
    info!(
        target: TIMING_TARGET,
        "event=provider_request provider={} operation={} started_at={} metadata={}",
        provider,
        operation,
        started_at.to_rfc3339(),
        metadata_text
    );

    let result = call().await;
    let status = if result.is_ok() { "success" } else { "error" };

    let duration = started_perf.elapsed().as_secs_f64();
    info!(
        target: TIMING_TARGET,
        "event=provider_response provider={} operation={} completed_at={} duration_s={:.3} status={} metadata={}",
        provider,
        operation,
        Utc::now().to_rfc3339(),
        duration,
        status,
        metadata_text
    );

    result
}
