mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::json;

#[tokio::test]
async fn ping_responds_with_pong() -> Result<()> {
    let base_url = common::spawn_server().await?;
    let client = reqwest::Client::new();

    let res = client.get(format!("{}/api/ping", base_url)).send().await?;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.text().await?, "Pong");
    Ok(())
}

#[tokio::test]
async fn seed_and_login_over_http() -> Result<()> {
    let base_url = common::spawn_server().await?;
    let client = reqwest::Client::new();

    let res = client.get(format!("{}/api/seed/admin", base_url)).send().await?;
    assert_eq!(res.status(), StatusCode::CREATED);
    let body = res.json::<serde_json::Value>().await?;
    assert_eq!(body["ok"], true);
    assert_eq!(body["data"]["user"]["role"], "super_admin");
    assert!(body["data"]["user"].get("password").is_none(), "password leaked: {}", body);

    let res = client
        .post(format!("{}/api/auth/login", base_url))
        .json(&json!({ "email": common::ADMIN_EMAIL, "password": common::ADMIN_PASSWORD }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body = res.json::<serde_json::Value>().await?;
    assert_eq!(body["message"], "Login successful");
    assert!(body["data"]["token"].as_str().is_some_and(|t| !t.is_empty()));
    Ok(())
}

#[tokio::test]
async fn envelope_shape_is_uniform() -> Result<()> {
    let base_url = common::spawn_server().await?;
    let client = reqwest::Client::new();

    let res = client.get(format!("{}/api/school/getAll", base_url)).send().await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body = res.json::<serde_json::Value>().await?;
    for key in ["ok", "message", "data", "errors", "code"] {
        assert!(body.get(key).is_some(), "missing '{}' in {}", key, body);
    }
    assert_eq!(body["code"], 401);
    Ok(())
}
