#![allow(dead_code)]

use anyhow::{Context, Result};
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use schoolhouse_api::config::AppConfig;
use schoolhouse_api::App;

pub const ADMIN_EMAIL: &str = "admin@example.com";
pub const ADMIN_PASSWORD: &str = "admin-password";

pub fn test_config() -> AppConfig {
    let mut config = AppConfig::development();
    config.security.auth_token_secret = "integration-secret".to_string();
    config.security.super_admin_email = ADMIN_EMAIL.to_string();
    config.security.super_admin_password = ADMIN_PASSWORD.to_string();
    config.stack.middleware_timeout_ms = 2_000;
    config
}

pub fn router() -> Router {
    App::load(test_config()).expect("route table builds").router()
}

/// Send one request through the router, returning status and JSON body
pub async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> Result<(StatusCode, Value)> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&body)?))?,
        None => builder.body(Body::empty())?,
    };

    let response = app.clone().oneshot(request).await?;
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).with_context(|| format!("non-JSON body for {} {}", method, uri))?
    };
    Ok((status, json))
}

pub async fn login(app: &Router, email: &str, password: &str) -> Result<String> {
    let (status, body) = send(
        app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "email": email, "password": password })),
    )
    .await?;
    anyhow::ensure!(status == StatusCode::OK, "login failed: {}", body);
    body["data"]["token"]
        .as_str()
        .map(str::to_string)
        .context("token missing from login response")
}

/// Seed the super admin and return their token
pub async fn admin_token(app: &Router) -> Result<String> {
    let (status, _) = send(app, "GET", "/api/seed/admin", None, None).await?;
    anyhow::ensure!(status == StatusCode::CREATED, "seeding failed with {}", status);
    login(app, ADMIN_EMAIL, ADMIN_PASSWORD).await
}

/// Create a school plus an admin for it; returns (school id, admin token)
pub async fn school_with_admin(app: &Router, admin: &str, name: &str, email: &str) -> Result<(String, String)> {
    let (status, body) = send(
        app,
        "POST",
        "/api/school/create",
        Some(admin),
        Some(json!({
            "name": name,
            "address": "100 Main Street, Springfield",
            "contactEmail": "office@school.edu",
            "phone": "5551234567"
        })),
    )
    .await?;
    anyhow::ensure!(status == StatusCode::CREATED, "school create failed: {}", body);
    let school_id = body["data"]["school"]["_id"]
        .as_str()
        .context("school id missing")?
        .to_string();

    let (status, body) = send(
        app,
        "POST",
        "/api/user/create",
        Some(admin),
        Some(json!({
            "firstName": "Sandra",
            "lastName": "Keller",
            "email": email,
            "password": "school-admin-pass",
            "role": "school_admin",
            "schoolId": school_id
        })),
    )
    .await?;
    anyhow::ensure!(status == StatusCode::CREATED, "user create failed: {}", body);

    let token = login(app, email, "school-admin-pass").await?;
    Ok((school_id, token))
}

/// Bind the full service on a free port; returns its base URL
pub async fn spawn_server() -> Result<String> {
    let port = portpicker::pick_unused_port().context("failed to pick free port")?;
    let listener = tokio::net::TcpListener::bind(("127.0.0.1", port)).await?;
    let app = router();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok(format!("http://127.0.0.1:{}", port))
}
