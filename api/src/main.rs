//! Shipyard API Server
//!
//! Connects GitHub and GitLab accounts over OAuth and receives their
//! webhooks. Uses hexagonal (ports & adapters) architecture: provider
//! adapters implement one contract and are shared through a registry.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tower_governor::governor::GovernorConfigBuilder;
use tower_governor::key_extractor::PeerIpKeyExtractor;
use tower_governor::GovernorLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod adapters;
mod app;
mod config;
mod domain;
mod error;
mod handlers;
mod routes;

#[cfg(test)]
mod test_utils;

use app::ProviderRegistry;
use config::Config;
use domain::entities::ProviderKind;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub registry: Arc<ProviderRegistry>,
    /// Client for the OAuth token exchange
    pub http: reqwest::Client,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,shipyard_api=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Shipyard API...");

    // Load configuration
    let config = Config::from_env();
    for kind in ProviderKind::ALL {
        if config.is_configured(kind) {
            tracing::info!(provider = %kind, "OAuth enabled");
        } else {
            tracing::warn!(provider = %kind, "OAuth not configured; connect flow disabled");
        }
    }

    let port = config.port;
    let state = AppState {
        config,
        registry: Arc::new(ProviderRegistry::new()),
        http: reqwest::Client::new(),
    };

    // Rate limiting config: 2 req/sec sustained, burst of 5
    // Uses PeerIpKeyExtractor to get client IP from socket connection
    let governor_config = Arc::new(
        GovernorConfigBuilder::default()
            .key_extractor(PeerIpKeyExtractor)
            .per_second(2)
            .burst_size(5)
            .finish()
            .context("Failed to build governor config")?,
    );

    let app = routes::api_routes()
        .merge(routes::auth_routes().layer(GovernorLayer {
            config: governor_config,
        }))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .context("Server error")?;

    Ok(())
}
