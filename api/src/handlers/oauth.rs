//! OAuth handlers
//!
//! Connects a provider account: redirect to the provider, then exchange the
//! returned code and cache an adapter authenticated with the user's token.

use axum::{
    extract::{Path, Query, State},
    response::Redirect,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Deserialize;
use uuid::Uuid;

use super::provider_from_path;
use crate::adapters::oauth;
use crate::error::AppError;
use crate::AppState;

/// Cookie binding the authorize redirect to its callback
pub const STATE_COOKIE: &str = "shipyard_oauth_state";

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
}

fn state_cookie(value: String) -> Cookie<'static> {
    Cookie::build((STATE_COOKIE, value))
        .path("/api/auth")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

/// GET /api/auth/:provider
///
/// Redirect the user to the provider's consent screen.
pub async fn authorize(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    jar: CookieJar,
) -> Result<(CookieJar, Redirect), AppError> {
    let kind = provider_from_path(&provider)?;
    let config = state
        .config
        .provider_config(kind)
        .ok_or_else(|| AppError::Internal(format!("{} OAuth not configured", kind)))?;

    let oauth_state = Uuid::new_v4().to_string();
    let url = oauth::authorize_url(kind, &config, &state.config.oauth_endpoints(), &oauth_state);

    tracing::debug!(provider = %kind, "Redirecting to provider authorization");
    Ok((jar.add(state_cookie(oauth_state)), Redirect::temporary(&url)))
}

/// GET /api/auth/:provider/callback
///
/// Exchange the code, replace any cached adapter with one using the new
/// token, and send the user back to the app.
pub async fn callback(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    jar: CookieJar,
    Query(query): Query<CallbackQuery>,
) -> Result<(CookieJar, Redirect), AppError> {
    let kind = provider_from_path(&provider)?;

    let code = query
        .code
        .ok_or_else(|| AppError::BadRequest("No code provided".to_string()))?;

    let expected = jar.get(STATE_COOKIE).map(|c| c.value().to_string());
    if expected.is_none() || expected != query.state {
        tracing::warn!(provider = %kind, "OAuth state mismatch");
        return Err(AppError::BadRequest("OAuth state mismatch".to_string()));
    }

    let config = state
        .config
        .provider_config(kind)
        .ok_or_else(|| AppError::Internal(format!("{} OAuth not configured", kind)))?;

    let token = oauth::exchange_code(
        &state.http,
        kind,
        &config,
        &state.config.oauth_endpoints(),
        &code,
    )
    .await?;

    let client = state
        .registry
        .replace_service(kind, config.with_access_token(token))
        .await?;
    let user = client.current_user().await?;

    tracing::info!(provider = %kind, login = %user.login, "Git provider connected");

    let jar = jar.remove(Cookie::build(STATE_COOKIE).path("/api/auth"));
    let redirect = format!("{}/?{}_connected=true", state.config.app_url, kind);
    Ok((jar, Redirect::temporary(&redirect)))
}
