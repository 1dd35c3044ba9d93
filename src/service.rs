use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::llm::{decode_image, AnalysisError, Analyzer, Reading, ValidationError};
use crate::storage::{public_url, ObjectWriter, UploadError};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadingResponse {
    pub analysis: Reading,
    pub record_id: String,
    pub s3_url: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Analysis(#[from] AnalysisError),
    #[error(transparent)]
    Upload(#[from] UploadError),
}

impl ServiceError {
    pub fn is_client_error(&self) -> bool {
        matches!(self, ServiceError::Validation(_))
    }

    /// Message safe to return to callers; storage internals stay in the logs.
    pub fn public_detail(&self) -> String {
        match self {
            ServiceError::Validation(err) => err.to_string(),
            ServiceError::Analysis(err) => format!("Face reading failed: {err}"),
            ServiceError::Upload(_) => "Failed to store the uploaded photo".to_string(),
        }
    }
}

/// Runs the model reading and the photo upload for one request.
pub struct ReadingService {
    analyzer: Arc<dyn Analyzer>,
    writer: ObjectWriter,
    endpoint_url: Option<String>,
}

impl ReadingService {
    pub fn new(
        analyzer: Arc<dyn Analyzer>,
        writer: ObjectWriter,
        endpoint_url: Option<String>,
    ) -> Self {
        Self {
            analyzer,
            writer,
            endpoint_url,
        }
    }

    /// Both halves must succeed. The first failure wins and the other future is
    /// dropped; an object already written is not deleted.
    pub async fn handle(&self, image: &str) -> Result<ReadingResponse, ServiceError> {
        let payload = decode_image(image)?;

        let analysis = async {
            self.analyzer
                .analyze(&payload)
                .await
                .map_err(ServiceError::from)
        };
        let upload = async { self.writer.write(&payload).await.map_err(ServiceError::from) };

        let (analysis, outcome) = match tokio::try_join!(analysis, upload) {
            Ok(joined) => joined,
            Err(err) => {
                warn!("Reading request failed: {}", err);
                return Err(err);
            }
        };

        let bucket = self.writer.resolver().bucket();
        let s3_url = public_url(
            bucket,
            &outcome.region,
            &outcome.object_key,
            self.endpoint_url.as_deref(),
        );
        info!(
            "Reading complete: archetype={} score={} key={} region={}",
            analysis.archetype, analysis.score, outcome.object_key, outcome.region
        );

        Ok(ReadingResponse {
            analysis,
            record_id: outcome.object_key,
            s3_url,
        })
    }
}
