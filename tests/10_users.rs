mod common;

use anyhow::Result;
use axum::http::StatusCode;
use serde_json::json;

#[tokio::test]
async fn register_then_me_roundtrips_email() -> Result<()> {
    let app = common::test_app();

    let token = common::register(&app, "alice@example.com", "secret-pass").await?;
    let res = common::send(&app, "GET", "/users/me", Some(&token), None).await?;

    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["email"], "alice@example.com");
    Ok(())
}

#[tokio::test]
async fn responses_never_contain_password_or_tokens() -> Result<()> {
    let app = common::test_app();

    let res = common::send(
        &app,
        "POST",
        "/users",
        None,
        Some(json!({ "email": "bob@example.com", "password": "secret-pass" })),
    )
    .await?;

    assert_eq!(res.status, StatusCode::OK);
    assert!(res.body.get("password").is_none());
    assert!(res.body.get("password_hash").is_none());
    assert!(res.body.get("tokens").is_none());

    let token = res.headers.get("x-auth").unwrap().to_str()?.to_string();
    let me = common::send(&app, "GET", "/users/me", Some(&token), None).await?;
    assert!(me.body.get("password_hash").is_none());
    assert!(me.body.get("tokens").is_none());
    Ok(())
}

#[tokio::test]
async fn register_drops_unknown_body_fields() -> Result<()> {
    let app = common::test_app();

    // serde only reads the allow-listed fields; the rest never reaches the store
    let res = common::send(
        &app,
        "POST",
        "/users",
        None,
        Some(json!({
            "email": "carol@example.com",
            "password": "secret-pass",
            "admin": true,
            "tokens": ["forged"]
        })),
    )
    .await?;

    assert_eq!(res.status, StatusCode::OK);
    assert!(res.body.get("admin").is_none());

    // The forged token list was ignored; only the issued token authenticates
    let bad = common::send(&app, "GET", "/users/me", Some("forged"), None).await?;
    assert_eq!(bad.status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn register_rejects_duplicate_email() -> Result<()> {
    let app = common::test_app();

    common::register(&app, "dave@example.com", "secret-pass").await?;

    let res = common::send(
        &app,
        "POST",
        "/users",
        None,
        Some(json!({ "email": "dave@example.com", "password": "other-pass" })),
    )
    .await?;

    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.body["code"], "VALIDATION_ERROR");
    Ok(())
}

#[tokio::test]
async fn register_validates_email_and_password() -> Result<()> {
    let app = common::test_app();

    let res = common::send(
        &app,
        "POST",
        "/users",
        None,
        Some(json!({ "email": "not-an-email", "password": "secret-pass" })),
    )
    .await?;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);

    let res = common::send(
        &app,
        "POST",
        "/users",
        None,
        Some(json!({ "email": "short@example.com", "password": "abc" })),
    )
    .await?;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn login_failures_are_uniform() -> Result<()> {
    let app = common::test_app();

    common::register(&app, "erin@example.com", "secret-pass").await?;

    let wrong_password = common::send(
        &app,
        "POST",
        "/users/login",
        None,
        Some(json!({ "email": "erin@example.com", "password": "wrong-pass" })),
    )
    .await?;

    let unknown_email = common::send(
        &app,
        "POST",
        "/users/login",
        None,
        Some(json!({ "email": "nobody@example.com", "password": "secret-pass" })),
    )
    .await?;

    // No distinguishing signal between the two failure modes
    assert_eq!(wrong_password.status, StatusCode::BAD_REQUEST);
    assert_eq!(unknown_email.status, wrong_password.status);
    assert_eq!(unknown_email.body, wrong_password.body);
    assert!(wrong_password.headers.get("x-auth").is_none());
    Ok(())
}

#[tokio::test]
async fn login_issues_working_token() -> Result<()> {
    let app = common::test_app();

    common::register(&app, "frank@example.com", "secret-pass").await?;
    let token = common::login(&app, "frank@example.com", "secret-pass").await?;

    let res = common::send(&app, "GET", "/users/me", Some(&token), None).await?;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["email"], "frank@example.com");
    Ok(())
}

#[tokio::test]
async fn logout_revokes_only_the_presenting_token() -> Result<()> {
    let app = common::test_app();

    // Two concurrent sessions for the same account
    let first = common::register(&app, "grace@example.com", "secret-pass").await?;
    let second = common::login(&app, "grace@example.com", "secret-pass").await?;

    let res = common::send(&app, "DELETE", "/users/me/token", Some(&first), None).await?;
    assert_eq!(res.status, StatusCode::OK);

    // The logged-out token still verifies cryptographically but must now
    // fail authentication on every request
    let revoked = common::send(&app, "GET", "/users/me", Some(&first), None).await?;
    assert_eq!(revoked.status, StatusCode::UNAUTHORIZED);

    // The other device's session is untouched
    let alive = common::send(&app, "GET", "/users/me", Some(&second), None).await?;
    assert_eq!(alive.status, StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn protected_routes_reject_missing_or_garbage_tokens() -> Result<()> {
    let app = common::test_app();

    let res = common::send(&app, "GET", "/users/me", None, None).await?;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);

    let res = common::send(&app, "GET", "/users/me", Some("garbage"), None).await?;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);

    let res = common::send(&app, "GET", "/todos", None, None).await?;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    Ok(())
}
