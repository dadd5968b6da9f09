use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;
use std::time::Duration;

pub const QUOTA_EXCEEDED_MESSAGE: &str = "Limite atteinte. Réessayez dans une heure.";
pub const GENERATION_FAILED_MESSAGE: &str = "Erreur lors de la génération";
pub const INVALID_REQUEST_MESSAGE: &str = "Requête invalide";

// Failures talking to the generation API
#[derive(thiserror::Error, Debug)]
pub enum GenerationError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("upstream returned {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("malformed upstream response: {0}")]
    Malformed(String),

    #[error("no response within {0:?}")]
    Timeout(Duration),
}

// Display of an error followed by every source below it
pub fn error_chain(err: &dyn std::error::Error) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        out.push_str(": ");
        out.push_str(&cause.to_string());
        source = cause.source();
    }
    out
}

#[derive(thiserror::Error, Debug)]
pub enum GatewayError {
    #[error("quota exceeded")]
    QuotaExceeded,

    #[error("generation failed: {0}")]
    GenerationFailed(#[from] GenerationError),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

// Only fixed messages go back to the client, causes stay in the logs
impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            GatewayError::QuotaExceeded => (StatusCode::TOO_MANY_REQUESTS, QUOTA_EXCEEDED_MESSAGE),
            GatewayError::GenerationFailed(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, GENERATION_FAILED_MESSAGE)
            }
            GatewayError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, INVALID_REQUEST_MESSAGE),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
