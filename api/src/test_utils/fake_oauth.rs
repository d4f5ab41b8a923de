//! In-process fake of the GitHub and GitLab OAuth token endpoints

use std::collections::HashMap;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Form, Json, Router};
use serde_json::json;

use super::fixtures::{GITHUB_EXCHANGED_TOKEN, GITLAB_EXCHANGED_TOKEN, GOOD_CODE};

pub async fn spawn_fake_oauth() -> String {
    let (listener, base) = super::bind().await;
    super::serve(listener, router());
    base
}

pub fn router() -> Router {
    Router::new()
        .route("/login/oauth/access_token", post(github_token))
        .route("/oauth/token", post(gitlab_token))
}

fn has_client(form: &HashMap<String, String>) -> bool {
    form.contains_key("client_id") && form.contains_key("client_secret")
}

/// GitHub answers 200 even for a rejected code
async fn github_token(Form(form): Form<HashMap<String, String>>) -> Response {
    if has_client(&form) && form.get("code").map(String::as_str) == Some(GOOD_CODE) {
        Json(json!({
            "access_token": GITHUB_EXCHANGED_TOKEN,
            "token_type": "bearer",
            "scope": "repo,read:user",
        }))
        .into_response()
    } else {
        Json(json!({
            "error": "bad_verification_code",
            "error_description": "The code passed is incorrect or expired.",
        }))
        .into_response()
    }
}

async fn gitlab_token(Form(form): Form<HashMap<String, String>>) -> Response {
    let valid = has_client(&form)
        && form.get("grant_type").map(String::as_str) == Some("authorization_code")
        && form.get("code").map(String::as_str) == Some(GOOD_CODE);

    if valid {
        Json(json!({
            "access_token": GITLAB_EXCHANGED_TOKEN,
            "token_type": "Bearer",
            "expires_in": 7200,
        }))
        .into_response()
    } else {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "error": "invalid_grant",
                "error_description": "The provided authorization grant is invalid.",
            })),
        )
            .into_response()
    }
}
