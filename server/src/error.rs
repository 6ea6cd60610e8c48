use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chati_core::api::ErrorReply;
use chati_core::ProviderError;

/// Every route failure becomes `{ "error": ... }` with HTTP 500. There is no
/// distinction between retryable and fatal failures.
#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error("{0}")]
    InvalidBody(String),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::InvalidBody(rejection.body_text())
    }
}

impl ApiError {
    fn logged_reply(&self) -> ErrorReply {
        tracing::error!(error = %self, "proxy request failed");
        ErrorReply {
            error: self.to_string(),
            voices: None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (StatusCode::INTERNAL_SERVER_ERROR, Json(self.logged_reply())).into_response()
    }
}

/// Failure of the voice catalogue route, which still answers with an empty list.
#[derive(Debug)]
pub struct VoicesError(pub ApiError);

impl From<ProviderError> for VoicesError {
    fn from(err: ProviderError) -> Self {
        Self(ApiError::Provider(err))
    }
}

impl IntoResponse for VoicesError {
    fn into_response(self) -> Response {
        let mut reply = self.0.logged_reply();
        reply.voices = Some(Vec::new());
        (StatusCode::INTERNAL_SERVER_ERROR, Json(reply)).into_response()
    }
}
