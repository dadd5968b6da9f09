use axum::{
    Json,
    extract::{ConnectInfo, State, rejection::JsonRejection},
    http::HeaderMap,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, warn};

use crate::error::{GatewayError, GenerationError, error_chain};
use crate::language::Language;
use crate::metrics::{GENERATION_FAILURES, QUOTA_REJECTIONS, REQUEST_LATENCY, REQUEST_TOTAL};
use crate::models::{CompletionRequest, GenerateRequest, GenerateResponse};
use crate::state::AppState;

// Client key for the quota table: peer IP, or the first X-Forwarded-For hop
// when the gateway sits behind a trusted proxy.
pub fn client_identity(peer: SocketAddr, headers: &HeaderMap, trust_proxy: bool) -> String {
    if trust_proxy {
        let forwarded = headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty());
        if let Some(ip) = forwarded {
            return ip.to_string();
        }
    }
    peer.ip().to_string()
}

/// Runs one request through the gate: quota, prompt composition, upstream call.
///
/// The quota unit is taken before the upstream call, so a failed generation
/// still counts against the client.
pub async fn generate(
    state: &AppState,
    request: GenerateRequest,
    client: &str,
) -> Result<GenerateResponse, GatewayError> {
    let remaining = match state.rate_limiter.check(client) {
        Ok(remaining) => remaining,
        Err(exceeded) => {
            QUOTA_REJECTIONS.inc();
            warn!(
                client,
                limit = exceeded.limit,
                retry_after = ?exceeded.retry_after,
                "quota exceeded"
            );
            return Err(GatewayError::QuotaExceeded);
        }
    };

    let language = Language::from_code(request.language.as_deref());
    let completion = CompletionRequest::user(
        &state.model,
        state.max_tokens,
        language.compose(&request.prompt),
    );

    let start_time = Instant::now();
    let result = match tokio::time::timeout(
        state.upstream_timeout,
        state.generator.generate(&completion),
    )
    .await
    {
        Ok(result) => result,
        Err(_) => Err(GenerationError::Timeout(state.upstream_timeout)),
    };

    match result {
        Ok(text) => {
            REQUEST_LATENCY.observe(start_time.elapsed().as_secs_f64());
            debug!(client, ?language, remaining, "generation succeeded");
            Ok(GenerateResponse {
                content: text.trim().to_string(),
                remaining_requests: remaining,
            })
        }
        Err(e) => {
            GENERATION_FAILURES.inc();
            error!(client, error = %error_chain(&e), "generation failed");
            Err(GatewayError::GenerationFailed(e))
        }
    }
}

pub async fn generate_handler(
    State(state): State<Arc<AppState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    payload: Result<Json<GenerateRequest>, JsonRejection>,
) -> Result<Json<GenerateResponse>, GatewayError> {
    REQUEST_TOTAL.inc();

    // a bad body never reaches the quota table
    let Json(payload) = payload.map_err(|rejection| {
        warn!(error = %rejection, "rejected generate body");
        GatewayError::InvalidRequest(rejection.body_text())
    })?;

    let client = client_identity(peer, &headers, state.trust_proxy);
    generate(&state, payload, &client).await.map(Json)
}
