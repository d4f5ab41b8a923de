//! In-process fake of the GitHub REST API
//!
//! Knows one repository, `acme/widget`, and a user with `REPO_COUNT`
//! repositories spread over two pages.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::extract::{Path, Query, State};
use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, put};
use axum::{Json, Router};
use serde_json::{json, Value};

use super::fixtures::{GITHUB_EXCHANGED_TOKEN, TEST_TOKEN};

pub const REPO_COUNT: usize = 150;

#[derive(Default)]
pub struct FakeGitHubState {
    pub base: String,
    pub hooks: Vec<Value>,
    /// Secret sent with each created hook, by id
    pub hook_secrets: HashMap<u64, String>,
    /// Protection bodies as last PUT, by branch
    pub protections: HashMap<String, Value>,
    next_hook_id: u64,
}

pub type SharedState = Arc<Mutex<FakeGitHubState>>;

impl FakeGitHubState {
    pub fn shared(base: &str) -> SharedState {
        Arc::new(Mutex::new(FakeGitHubState {
            base: base.to_string(),
            next_hook_id: 1,
            ..Default::default()
        }))
    }
}

pub async fn spawn_fake_github() -> (String, SharedState) {
    let (listener, base) = super::bind().await;
    let state = FakeGitHubState::shared(&base);
    super::serve(listener, router(state.clone()));
    (base, state)
}

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/user", get(current_user))
        .route("/user/repos", get(list_repos))
        .route("/repos/:owner/:repo", get(get_repo))
        .route("/repos/:owner/:repo/branches", get(list_branches))
        .route("/repos/:owner/:repo/hooks", get(list_hooks).post(create_hook))
        .route(
            "/repos/:owner/:repo/hooks/:id",
            axum::routing::delete(delete_hook),
        )
        .route(
            "/repos/:owner/:repo/branches/:branch/protection",
            put(put_protection)
                .get(get_protection)
                .delete(delete_protection),
        )
        .with_state(state)
}

fn error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "message": message }))).into_response()
}

fn guard(headers: &HeaderMap) -> Result<(), Response> {
    let auth = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok());
    let accepted = [TEST_TOKEN, GITHUB_EXCHANGED_TOKEN]
        .iter()
        .any(|token| auth == Some(format!("Bearer {}", token).as_str()));
    if accepted {
        Ok(())
    } else {
        Err(error(StatusCode::UNAUTHORIZED, "Bad credentials"))
    }
}

fn guard_repo(headers: &HeaderMap, owner: &str, repo: &str) -> Result<(), Response> {
    guard(headers)?;
    if owner == "acme" && repo == "widget" {
        Ok(())
    } else {
        Err(error(StatusCode::NOT_FOUND, "Not Found"))
    }
}

fn repo_json(id: usize, name: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "full_name": format!("acme/{}", name),
        "private": id % 2 == 0,
        "description": null,
        "default_branch": "main",
        "clone_url": format!("https://github.com/acme/{}.git", name),
    })
}

async fn current_user(headers: HeaderMap) -> Response {
    if let Err(resp) = guard(&headers) {
        return resp;
    }
    Json(json!({
        "id": 583231,
        "login": "octocat",
        "name": "The Octocat",
        "email": null,
        "avatar_url": "https://avatars.githubusercontent.com/u/583231",
    }))
    .into_response()
}

async fn list_repos(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    if let Err(resp) = guard(&headers) {
        return resp;
    }
    let per_page: usize = query
        .get("per_page")
        .and_then(|p| p.parse().ok())
        .unwrap_or(30);
    let page: usize = query.get("page").and_then(|p| p.parse().ok()).unwrap_or(1);

    let start = (page - 1) * per_page;
    let end = (start + per_page).min(REPO_COUNT);
    let repos: Vec<Value> = (start..end)
        .map(|i| repo_json(i + 1, &format!("repo-{}", i)))
        .collect();

    let mut response = Json(repos).into_response();
    if end < REPO_COUNT {
        let base = state.lock().unwrap().base.clone();
        let link = format!(
            "<{}/user/repos?affiliation=owner,collaborator&per_page={}&page={}>; rel=\"next\", <{}/user/repos?page=2>; rel=\"last\"",
            base,
            per_page,
            page + 1,
            base
        );
        response
            .headers_mut()
            .insert("link", link.parse().unwrap());
    }
    response
}

async fn get_repo(headers: HeaderMap, Path((owner, repo)): Path<(String, String)>) -> Response {
    if let Err(resp) = guard_repo(&headers, &owner, &repo) {
        return resp;
    }
    let mut body = repo_json(1296269, "widget");
    body["description"] = json!("A widget");
    body["private"] = json!(false);
    Json(body).into_response()
}

async fn list_branches(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Path((owner, repo)): Path<(String, String)>,
) -> Response {
    if let Err(resp) = guard_repo(&headers, &owner, &repo) {
        return resp;
    }
    let protected = state.lock().unwrap().protections.contains_key("main");
    Json(json!([
        {
            "name": "main",
            "commit": {
                "sha": "c5b97d5ae6c19d5c5df71a34c7fbeeda2479ccbc",
                "url": "https://api.github.com/repos/acme/widget/commits/c5b97d5ae6c19d5c5df71a34c7fbeeda2479ccbc",
            },
            "protected": protected,
        },
        {
            "name": "feature/login",
            "commit": {
                "sha": "553c2077f0edc3d5dc5d17262f6aa498e69d6f8e",
                "url": "https://api.github.com/repos/acme/widget/commits/553c2077f0edc3d5dc5d17262f6aa498e69d6f8e",
            },
            "protected": false,
        },
    ]))
    .into_response()
}

async fn create_hook(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Path((owner, repo)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> Response {
    if let Err(resp) = guard_repo(&headers, &owner, &repo) {
        return resp;
    }
    if body["name"] != "web" || body["config"]["url"].as_str().is_none() {
        return error(StatusCode::UNPROCESSABLE_ENTITY, "Validation Failed");
    }

    let mut state = state.lock().unwrap();
    let id = state.next_hook_id;
    state.next_hook_id += 1;

    if let Some(secret) = body["config"]["secret"].as_str() {
        state.hook_secrets.insert(id, secret.to_string());
    }
    let hook = json!({
        "id": id,
        "name": "web",
        "active": body["active"].as_bool().unwrap_or(true),
        "events": body["events"],
        "config": {
            "url": body["config"]["url"],
            "content_type": body["config"]["content_type"],
            "insecure_ssl": "0",
        },
        "created_at": "2026-10-17T09:30:00Z",
        "updated_at": "2026-10-17T09:30:00Z",
    });
    state.hooks.push(hook.clone());

    (StatusCode::CREATED, Json(hook)).into_response()
}

async fn list_hooks(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Path((owner, repo)): Path<(String, String)>,
) -> Response {
    if let Err(resp) = guard_repo(&headers, &owner, &repo) {
        return resp;
    }
    let hooks = state.lock().unwrap().hooks.clone();
    Json(hooks).into_response()
}

async fn delete_hook(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Path((owner, repo, id)): Path<(String, String, String)>,
) -> Response {
    if let Err(resp) = guard_repo(&headers, &owner, &repo) {
        return resp;
    }
    let mut state = state.lock().unwrap();
    let before = state.hooks.len();
    state.hooks.retain(|h| h["id"].to_string() != id);

    if state.hooks.len() == before {
        error(StatusCode::NOT_FOUND, "Not Found")
    } else {
        StatusCode::NO_CONTENT.into_response()
    }
}

async fn put_protection(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Path((owner, repo, branch)): Path<(String, String, String)>,
    Json(body): Json<Value>,
) -> Response {
    if let Err(resp) = guard_repo(&headers, &owner, &repo) {
        return resp;
    }
    // Every top-level key is mandatory, even when null
    for key in [
        "required_status_checks",
        "enforce_admins",
        "required_pull_request_reviews",
        "restrictions",
    ] {
        if body.get(key).is_none() {
            return error(StatusCode::UNPROCESSABLE_ENTITY, "Invalid request");
        }
    }

    state
        .lock()
        .unwrap()
        .protections
        .insert(branch, body.clone());
    Json(body).into_response()
}

async fn get_protection(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Path((owner, repo, branch)): Path<(String, String, String)>,
) -> Response {
    if let Err(resp) = guard_repo(&headers, &owner, &repo) {
        return resp;
    }
    match state.lock().unwrap().protections.get(&branch) {
        Some(body) => Json(body.clone()).into_response(),
        None => error(StatusCode::NOT_FOUND, "Branch not protected"),
    }
}

async fn delete_protection(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Path((owner, repo, branch)): Path<(String, String, String)>,
) -> Response {
    if let Err(resp) = guard_repo(&headers, &owner, &repo) {
        return resp;
    }
    match state.lock().unwrap().protections.remove(&branch) {
        Some(_) => StatusCode::NO_CONTENT.into_response(),
        None => error(StatusCode::NOT_FOUND, "Branch not protected"),
    }
}
