#![allow(dead_code)]

use anyhow::{Context, Result};
use axum::body::Body;
use axum::http::{header::CONTENT_TYPE, HeaderMap, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use todo_api::{app, AppState};

/// Fresh application over the in-memory store backend
pub fn test_app() -> Router {
    app(AppState::in_memory())
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

/// Drive one request through the router without binding a socket
pub async fn send(
    app: &Router,
    method: &str,
    path: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> Result<TestResponse> {
    let mut builder = Request::builder().method(method).uri(path);

    if let Some(token) = token {
        builder = builder.header("x-auth", token);
    }

    let request = match body {
        Some(value) => builder
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(value.to_string()))?,
        None => builder.body(Body::empty())?,
    };

    let response = app.clone().oneshot(request).await?;

    let status = response.status();
    let headers = response.headers().clone();
    let bytes = response.into_body().collect().await?.to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)?
    };

    Ok(TestResponse { status, headers, body })
}

/// Register an account and return its session token from the x-auth header
pub async fn register(app: &Router, email: &str, password: &str) -> Result<String> {
    let res = send(
        app,
        "POST",
        "/users",
        None,
        Some(json!({ "email": email, "password": password })),
    )
    .await?;

    anyhow::ensure!(
        res.status == StatusCode::OK,
        "registration failed: {} {:?}",
        res.status,
        res.body
    );

    auth_header(&res)
}

/// Log in and return the fresh session token
pub async fn login(app: &Router, email: &str, password: &str) -> Result<String> {
    let res = send(
        app,
        "POST",
        "/users/login",
        None,
        Some(json!({ "email": email, "password": password })),
    )
    .await?;

    anyhow::ensure!(
        res.status == StatusCode::OK,
        "login failed: {} {:?}",
        res.status,
        res.body
    );

    auth_header(&res)
}

/// Create a todo and return its id
pub async fn create_todo(app: &Router, token: &str, text: &str) -> Result<String> {
    let res = send(app, "POST", "/todos", Some(token), Some(json!({ "text": text }))).await?;

    anyhow::ensure!(
        res.status == StatusCode::OK,
        "todo creation failed: {} {:?}",
        res.status,
        res.body
    );

    res.body["id"]
        .as_str()
        .map(str::to_string)
        .context("created todo has no id")
}

fn auth_header(res: &TestResponse) -> Result<String> {
    Ok(res
        .headers
        .get("x-auth")
        .context("missing x-auth response header")?
        .to_str()?
        .to_string())
}
