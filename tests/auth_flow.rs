mod common;

use anyhow::Result;
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use tower::ServiceExt;

#[tokio::test]
async fn health_endpoint_responds() -> Result<()> {
    let app = common::test_app().await?;

    let (status, body) = common::request(&app, Method::GET, "/health", None, None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["database"], "ok");
    Ok(())
}

#[tokio::test]
async fn first_account_becomes_admin() -> Result<()> {
    let app = common::test_app().await?;

    let first = common::sign_up(&app, "Admin Satu", "admin@example.com", "admin").await?;
    let (status, body) =
        common::request(&app, Method::GET, "/api/auth/whoami", Some(&first), None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["role"], "admin");

    let second = common::sign_up(&app, "Budi Santoso", "budi@example.com", "budi").await?;
    let (_, body) =
        common::request(&app, Method::GET, "/api/auth/whoami", Some(&second), None).await?;
    assert_eq!(body["data"]["role"], "user");
    Ok(())
}

#[tokio::test]
async fn sign_in_issues_working_token_and_rejects_bad_credentials() -> Result<()> {
    let app = common::test_app().await?;
    common::sign_up(&app, "Budi Santoso", "budi@example.com", "budi").await?;

    let (status, body) = common::request(
        &app,
        Method::POST,
        "/auth/sign-in",
        None,
        Some(common::form(&[("username", "budi"), ("password", "rahasia-123")])),
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    let token = body["data"]["token"].as_str().unwrap().to_string();

    let (status, body) =
        common::request(&app, Method::GET, "/api/auth/whoami", Some(&token), None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["username"], "budi");

    let (status, body) = common::request(
        &app,
        Method::POST,
        "/auth/sign-in",
        None,
        Some(common::form(&[("username", "budi"), ("password", "salah-total")])),
    )
    .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
    Ok(())
}

#[tokio::test]
async fn protected_routes_reject_missing_and_stale_sessions() -> Result<()> {
    let app = common::test_app().await?;

    // No session at all
    let (status, body) =
        common::request(&app, Method::GET, "/api/data/families", None, None).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);

    // A token nobody issued
    let (status, _) =
        common::request(&app, Method::GET, "/api/auth/whoami", Some("deadbeef"), None).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // A revoked token
    let token = common::sign_up(&app, "Budi Santoso", "budi@example.com", "budi").await?;
    let (status, _) =
        common::request(&app, Method::DELETE, "/auth/session", Some(&token), None).await?;
    assert_eq!(status, StatusCode::OK);
    let (status, _) =
        common::request(&app, Method::GET, "/api/auth/whoami", Some(&token), None).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn session_cookie_authenticates_browser_requests() -> Result<()> {
    let app = common::test_app().await?;
    common::sign_up(&app, "Budi Santoso", "budi@example.com", "budi").await?;

    let response = common::send(
        &app,
        Method::POST,
        "/auth/sign-in",
        None,
        Some(common::form(&[("username", "budi"), ("password", "rahasia-123")])),
    )
    .await?;
    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .expect("sign-in sets a session cookie")
        .to_string();
    assert!(cookie.starts_with("sid="));

    let session_pair = cookie.split(';').next().unwrap().to_string();
    let request = Request::builder()
        .method(Method::GET)
        .uri("/api/auth/whoami")
        .header(header::COOKIE, session_pair)
        .body(Body::empty())?;
    let response = app.clone().oneshot(request).await?;
    assert_eq!(response.status(), StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn dashboard_redirects_without_session() -> Result<()> {
    let app = common::test_app().await?;

    let response = common::send(&app, Method::GET, "/dashboard", None, None).await?;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        response.headers().get(header::LOCATION).and_then(|v| v.to_str().ok()),
        Some("/sign-in")
    );

    let token = common::admin_token(&app).await?;
    let (status, body) =
        common::request(&app, Method::GET, "/dashboard", Some(&token), None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["counts"]["families"], 0);
    Ok(())
}

#[tokio::test]
async fn removed_account_loses_access_and_frees_identifiers() -> Result<()> {
    let app = common::test_app().await?;
    let admin = common::admin_token(&app).await?;
    let user = common::sign_up(&app, "Budi Santoso", "budi@example.com", "budi").await?;

    let (_, body) = common::request(&app, Method::GET, "/api/auth/whoami", Some(&user), None).await?;
    let user_id = body["data"]["id"].as_i64().unwrap();

    let (status, _) = common::request(
        &app,
        Method::DELETE,
        &format!("/api/users/{user_id}"),
        Some(&admin),
        None,
    )
    .await?;
    assert_eq!(status, StatusCode::OK);

    // Their live session is gone and credentials no longer work
    let (status, _) = common::request(&app, Method::GET, "/api/auth/whoami", Some(&user), None).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = common::request(
        &app,
        Method::POST,
        "/auth/sign-in",
        None,
        Some(common::form(&[("username", "budi"), ("password", "rahasia-123")])),
    )
    .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // The identifiers are free for a new account
    common::sign_up(&app, "Budi Baru", "budi@example.com", "budi").await?;
    Ok(())
}

#[tokio::test]
async fn account_admin_rules() -> Result<()> {
    let app = common::test_app().await?;
    let admin = common::admin_token(&app).await?;
    let user = common::sign_up(&app, "Budi Santoso", "budi@example.com", "budi").await?;

    // Listing accounts is admin only
    let (status, _) = common::request(&app, Method::GET, "/api/users", Some(&user), None).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, body) = common::request(&app, Method::GET, "/api/users", Some(&admin), None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().map(Vec::len), Some(2));

    // A user may rename themselves but not someone else
    let (_, body) = common::request(&app, Method::GET, "/api/auth/whoami", Some(&user), None).await?;
    let user_id = body["data"]["id"].as_i64().unwrap();

    let (status, body) = common::request(
        &app,
        Method::PUT,
        &format!("/api/users/{user_id}"),
        Some(&user),
        Some(common::form(&[("name", "Budi Pratama")])),
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "Budi Pratama");

    let (status, _) = common::request(
        &app,
        Method::PUT,
        "/api/users/1",
        Some(&user),
        Some(common::form(&[("name", "Penyusup")])),
    )
    .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // An admin cannot remove their own account
    let (status, _) =
        common::request(&app, Method::DELETE, "/api/users/1", Some(&admin), None).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    Ok(())
}
