pub mod gemini;
pub mod media;
pub mod reading;

use async_trait::async_trait;

pub use gemini::GeminiAnalyzer;
pub use media::{decode_image, ImagePayload, ValidationError};
pub use reading::Reading;

#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("analysis request failed: {0}")]
    Request(String),
    #[error("analysis provider returned status {status}: {detail}")]
    Status { status: u16, detail: String },
    #[error("analysis provider returned no content")]
    EmptyResponse,
    #[error("analysis response was not a valid reading: {0}")]
    Malformed(String),
}

/// External vision model that turns a photo into a structured reading.
#[async_trait]
pub trait Analyzer: Send + Sync {
    async fn analyze(&self, image: &ImagePayload) -> Result<Reading, AnalysisError>;
}
