use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use verdict::VerdictError;

/// Error returned by route handlers, rendered as `{"error": "..."}`.
#[derive(Debug)]
pub enum ApiError {
    Verdict(VerdictError),
    BadRequest(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Verdict(VerdictError::Validation(_)) => StatusCode::BAD_REQUEST,
            ApiError::Verdict(VerdictError::NotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Verdict(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<VerdictError> for ApiError {
    fn from(err: VerdictError) -> Self {
        ApiError::Verdict(err)
    }
}

impl From<verdict::StoreError> for ApiError {
    fn from(err: verdict::StoreError) -> Self {
        ApiError::Verdict(VerdictError::Store(err))
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            ApiError::Verdict(err) => err.to_string(),
            ApiError::BadRequest(message) => message,
        };

        if status.is_server_error() {
            log::error!("Request failed: {}", message);
        }

        (status, Json(json!({ "error": message }))).into_response()
    }
}
