mod config;
mod error;
mod generator;
mod handlers;
mod language;
mod metrics;
mod models;
mod rate_limit;
mod state;

use anyhow::{Context, Result};
use clap::Parser;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::Args;
use crate::generator::AnthropicClient;
use crate::rate_limit::RateLimiter;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // values from a local .env fill in for unset environment variables
    if let Err(e) = config::load_env_file(Path::new(".env")) {
        tracing::warn!(error = %e, "failed to load .env");
    }

    // parse cli arguments, a missing api key stops us here
    let args = Args::parse();

    let generator = AnthropicClient::new(&args.api_url, &args.api_key)
        .context("failed to build the Anthropic client")?;
    let rate_limiter = RateLimiter::new(args.rate_limit, args.rate_window());

    if let Some(every) = args.sweep_interval() {
        tokio::spawn(rate_limit::sweeper(rate_limiter.clone(), every));
    }

    let state = Arc::new(AppState {
        generator: Arc::new(generator),
        rate_limiter,
        model: args.model.clone(),
        max_tokens: args.max_tokens,
        upstream_timeout: args.upstream_timeout(),
        trust_proxy: args.trust_proxy,
    });

    let app = handlers::router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    info!(port = args.port, "gateway running on http://localhost:{}", args.port);
    info!(
        url = %args.api_url,
        model = %args.model,
        max_tokens = args.max_tokens,
        "forwarding to Anthropic"
    );
    info!(
        "rate limit: {} requests per {} seconds per client",
        args.rate_limit, args.rate_window
    );

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
}
