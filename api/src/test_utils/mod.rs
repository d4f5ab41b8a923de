//! Test utilities
//!
//! Manual mock implementations, fixtures, and in-process fake provider
//! servers for unit testing.
//!
//! Why manual mocks instead of mockall?
//! - mockall has lifetime issues with traits containing `&str` parameters
//! - Manual mocks are more explicit and easier to debug
//! - We control exactly what they return without macro magic
//!
//! The fakes are small axum apps bound to an ephemeral port, so adapters run
//! their real reqwest code path against them.

pub mod fake_github;
pub mod fake_oauth;
pub mod fixtures;

use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;

use crate::app::ProviderRegistry;
use crate::AppState;

pub use fixtures::*;
pub use mocks::*;

/// Bind an ephemeral local port, returning the listener and its base URL
pub async fn bind() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    (listener, base)
}

/// Serve a router on a bound listener in the background
pub fn serve(listener: TcpListener, router: Router) {
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
}

/// One server hosting the GitHub, GitLab and OAuth fakes side by side
///
/// GitHub routes live at the root, GitLab routes under `/api/v4`.
pub async fn spawn_fake_providers() -> FakeProviders {
    let (listener, base) = bind().await;
    let github = fake_github::FakeGitHubState::shared(&base);
    let gitlab = fake_gitlab::FakeGitLabState::shared(&base);

    let router = Router::new()
        .merge(fake_github::router(github.clone()))
        .merge(fake_gitlab::router(gitlab.clone()))
        .merge(fake_oauth::router());
    serve(listener, router);

    FakeProviders {
        base,
        github,
        gitlab,
    }
}

pub struct FakeProviders {
    pub base: String,
    pub github: fake_github::SharedState,
    pub gitlab: fake_gitlab::SharedState,
}

/// App state wired to real adapters, with every provider URL at `provider_base`
pub fn test_state(provider_base: &str) -> AppState {
    AppState {
        config: test_config(provider_base),
        registry: Arc::new(ProviderRegistry::new()),
        http: reqwest::Client::new(),
    }
}

/// The full router without rate limiting
pub fn test_app(state: AppState) -> Router {
    crate::routes::api_routes()
        .merge(crate::routes::auth_routes())
        .with_state(state)
}
