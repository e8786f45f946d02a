use crate::state::AppState;
use axum::{
    Json,
    extract::{Multipart, State, multipart::MultipartError},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use inference::{InferenceError, PredictionResult};
use serde_json::{Value, json};

/// Error response with a `{"detail": ...}` body.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    detail: String,
}

impl ApiError {
    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            detail: detail.into(),
        }
    }

    pub fn internal(detail: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            detail: detail.into(),
        }
    }
}

impl From<InferenceError> for ApiError {
    fn from(e: InferenceError) -> Self {
        if e.is_client_error() {
            ApiError::bad_request(e.to_string())
        } else {
            ApiError::internal(format!("Failed to process image: {}", e))
        }
    }
}

impl From<MultipartError> for ApiError {
    fn from(e: MultipartError) -> Self {
        Self {
            status: e.status(),
            detail: e.body_text(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "detail": self.detail }))).into_response()
    }
}

pub async fn root() -> Json<Value> {
    Json(json!({ "message": "Plant leaf disease classifier API" }))
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

/// Classify the uploaded `file` field.
pub async fn predict(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<PredictionResult>, ApiError> {
    let (content_type, bytes) = loop {
        let Some(field) = multipart.next_field().await? else {
            return Err(ApiError::bad_request("Missing `file` upload"));
        };
        if field.name() != Some("file") {
            continue;
        }

        let content_type = field.content_type().unwrap_or_default().to_string();
        if !content_type.starts_with("image/") {
            return Err(ApiError::bad_request("File must be an image"));
        }

        break (content_type, field.bytes().await?);
    };

    tracing::debug!(content_type = %content_type, bytes = bytes.len(), "Received upload");

    let classifier = state.classifier.clone();
    let top_k = state.top_k;
    let result = tokio::task::spawn_blocking(move || classifier.predict_from_bytes(&bytes, top_k))
        .await
        .map_err(|e| ApiError::internal(format!("Inference task failed: {}", e)))??;

    Ok(Json(result))
}
