use std::sync::Arc;
use std::time::Duration;

use crate::generator::Generator;
use crate::rate_limit::RateLimiter;

// app's shared state, built once in main and injected into the handlers
pub struct AppState {
    pub generator: Arc<dyn Generator>,
    pub rate_limiter: RateLimiter,
    pub model: String,
    pub max_tokens: u32,
    pub upstream_timeout: Duration, // bound on a single generation call
    pub trust_proxy: bool,          // read client identity from X-Forwarded-For
}
