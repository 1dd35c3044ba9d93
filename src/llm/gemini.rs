use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::config::{GeminiConfig, READING_SYSTEM_PROMPT, READING_USER_INSTRUCTION};
use crate::llm::media::ImagePayload;
use crate::llm::reading::{parse_reading, response_schema, Reading};
use crate::llm::{AnalysisError, Analyzer};
use crate::utils::http::get_http_client;
use crate::utils::timing::log_provider_timing;
use crate::utils::truncate_for_log;

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    candidates: Option<Vec<GeminiCandidate>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    content: Option<GeminiContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiContent {
    parts: Option<Vec<GeminiPart>>,
}

#[derive(Debug, Deserialize)]
struct GeminiPart {
    text: Option<String>,
}

const GEMINI_MAX_RETRY_ATTEMPTS: usize = 2;
const GEMINI_RETRY_BASE_DELAY_MS: u64 = 900;

fn gemini_should_retry_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect()
}

fn gemini_should_retry_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS
        || status == StatusCode::REQUEST_TIMEOUT
        || status.is_server_error()
}

fn gemini_retry_delay(attempt: usize) -> Duration {
    let attempt = attempt.max(1) as u64;
    Duration::from_millis(GEMINI_RETRY_BASE_DELAY_MS.saturating_mul(attempt))
}

fn summarize_error_body(body: &str) -> (Option<String>, String) {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return (None, "empty response body".to_string());
    }

    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        let message = value
            .pointer("/error/message")
            .and_then(|v| v.as_str())
            .map(|v| v.to_string())
            .or_else(|| {
                value
                    .get("message")
                    .and_then(|v| v.as_str())
                    .map(|v| v.to_string())
            });
        return (message, truncate_for_log(&value.to_string(), 2000));
    }

    (None, truncate_for_log(trimmed, 2000))
}

fn extract_text_from_response(response: GeminiResponse) -> Result<String, AnalysisError> {
    let mut text_parts = Vec::new();
    let mut finish_reason = None;
    for candidate in response.candidates.unwrap_or_default() {
        if finish_reason.is_none() {
            finish_reason = candidate.finish_reason;
        }
        let parts = candidate
            .content
            .and_then(|content| content.parts)
            .unwrap_or_default();
        for part in parts {
            if let Some(text) = part.text {
                if !text.trim().is_empty() {
                    text_parts.push(text);
                }
            }
        }
        if !text_parts.is_empty() {
            break;
        }
    }

    if text_parts.is_empty() {
        if let Some(reason) = finish_reason {
            warn!("Gemini returned no text (finishReason={})", reason);
        }
        return Err(AnalysisError::EmptyResponse);
    }
    Ok(text_parts.join(""))
}

/// Reading client for the Gemini `generateContent` API.
pub struct GeminiAnalyzer {
    client: Client,
    config: GeminiConfig,
}

impl GeminiAnalyzer {
    pub fn new(config: GeminiConfig) -> Self {
        Self {
            client: get_http_client().clone(),
            config,
        }
    }

    fn redact(&self, text: &str) -> String {
        let key = self.config.api_key.trim();
        if key.is_empty() {
            return text.to_string();
        }
        text.replace(key, "[redacted]")
    }

    fn build_payload(&self, image: &ImagePayload) -> Value {
        json!({
            "systemInstruction": { "parts": [{ "text": READING_SYSTEM_PROMPT }] },
            "contents": [{
                "role": "user",
                "parts": [
                    {
                        "inlineData": {
                            "mimeType": image.mime_type,
                            "data": general_purpose::STANDARD.encode(&image.bytes)
                        }
                    },
                    { "text": READING_USER_INSTRUCTION }
                ]
            }],
            "generationConfig": {
                "temperature": self.config.temperature,
                "maxOutputTokens": self.config.max_output_tokens,
                "responseMimeType": "application/json",
                "responseSchema": response_schema(),
            },
        })
    }

    async fn generate_content(&self, payload: &Value) -> Result<GeminiResponse, AnalysisError> {
        let url = format!(
            "{}/models/{}:generateContent",
            self.config.api_base, self.config.model
        );

        let mut attempt = 0usize;
        loop {
            attempt += 1;
            let response = match self
                .client
                .post(&url)
                .header("x-goog-api-key", &self.config.api_key)
                .json(payload)
                .send()
                .await
            {
                Ok(response) => response,
                Err(err) => {
                    let err_text = self.redact(&err.to_string());
                    let should_retry =
                        gemini_should_retry_error(&err) && attempt < GEMINI_MAX_RETRY_ATTEMPTS;
                    warn!(
                        "Gemini request failed to send: {} (timeout={}, connect={}, retrying={})",
                        err_text,
                        err.is_timeout(),
                        err.is_connect(),
                        should_retry
                    );
                    if should_retry {
                        tokio::time::sleep(gemini_retry_delay(attempt)).await;
                        continue;
                    }
                    return Err(AnalysisError::Request(err_text));
                }
            };

            if !response.status().is_success() {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                let (message, body_summary) = summarize_error_body(&body);
                let should_retry =
                    gemini_should_retry_status(status) && attempt < GEMINI_MAX_RETRY_ATTEMPTS;
                warn!(
                    "Gemini API error: status={}, body={}, retrying={}",
                    status,
                    self.redact(&body_summary),
                    should_retry
                );
                if should_retry {
                    tokio::time::sleep(gemini_retry_delay(attempt)).await;
                    continue;
                }
                return Err(AnalysisError::Status {
                    status: status.as_u16(),
                    detail: self.redact(&message.unwrap_or(body_summary)),
                });
            }

            return response
                .json::<GeminiResponse>()
                .await
                .map_err(|err| AnalysisError::Malformed(self.redact(&err.to_string())));
        }
    }
}

#[async_trait]
impl Analyzer for GeminiAnalyzer {
    async fn analyze(&self, image: &ImagePayload) -> Result<Reading, AnalysisError> {
        let payload = self.build_payload(image);
        let metadata = json!({
            "model": self.config.model,
            "mimeType": image.mime_type,
            "bytes": image.bytes.len(),
        });

        log_provider_timing("gemini", "generate_content", Some(metadata), || async {
            let response = self.generate_content(&payload).await?;
            let text = extract_text_from_response(response)?;
            debug!(target: "llm.gemini", model = %self.config.model, text = %truncate_for_log(&text, 400));
            parse_reading(&text).map_err(|err| {
                warn!(
                    "Gemini reading did not match schema: {} (text={})",
                    err,
                    truncate_for_log(&text, 400)
                );
                AnalysisError::Malformed(err.to_string())
            })
        })
        .await
    }
}
