use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};
use tracing::{error, info};
use uuid::Uuid;

use crate::handlers::ANALYZE_ROUTE;
use crate::state::AppState;
use crate::utils::timing::RequestTimer;

fn detail(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "detail": message.into() }))).into_response()
}

/// Pulls the `image` string out of a JSON body, rejecting anything else as a client error.
fn extract_image(body: &[u8]) -> Result<String, &'static str> {
    let value: Value =
        serde_json::from_slice(body).map_err(|_| "Request body must be a JSON object")?;
    match value.get("image") {
        Some(Value::String(image)) if !image.trim().is_empty() => Ok(image.clone()),
        Some(Value::String(_)) => Err("image must not be empty"),
        Some(_) => Err("image must be a base64-encoded string"),
        None => Err("image is required"),
    }
}

pub async fn analyze_handler(State(state): State<AppState>, body: Bytes) -> Response {
    let request_id = Uuid::new_v4().to_string();
    let mut timer = RequestTimer::start(ANALYZE_ROUTE, &request_id);

    let image = match extract_image(&body) {
        Ok(image) => image,
        Err(message) => {
            info!("Rejected request {}: {}", request_id, message);
            timer.complete("bad_request", Some(message.to_string()));
            return detail(StatusCode::BAD_REQUEST, message);
        }
    };

    match state.service.handle(&image).await {
        Ok(response) => {
            timer.complete("success", None);
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(err) if err.is_client_error() => {
            info!("Rejected request {}: {}", request_id, err);
            timer.complete("bad_request", Some(err.to_string()));
            detail(StatusCode::BAD_REQUEST, err.public_detail())
        }
        Err(err) => {
            error!("Request {} failed: {}", request_id, err);
            timer.complete("error", Some(err.to_string()));
            detail(StatusCode::INTERNAL_SERVER_ERROR, err.public_detail())
        }
    }
}

pub async fn method_not_allowed() -> Response {
    let mut response = detail(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed");
    response
        .headers_mut()
        .insert(header::ALLOW, header::HeaderValue::from_static("POST"));
    response
}
