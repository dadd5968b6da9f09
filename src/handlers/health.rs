use axum::{Json, response::IntoResponse};

// liveness probe
pub async fn root_handler() -> impl IntoResponse {
    Json(serde_json::json!({ "message": "Backend Inspiration App fonctionne !" }))
}

pub async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}
