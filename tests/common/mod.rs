// Shared helpers: drive the router in process against an in-memory
// database, so every test file gets an isolated application with no
// network or filesystem footprint.
#![allow(dead_code)]

use anyhow::{anyhow, ensure, Context, Result};
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use serde_json::Value;
use tower::ServiceExt;

use pendata_api::{database, router, AppState};

/// A fresh application over its own empty in-memory database.
pub async fn test_app() -> Result<Router> {
    let db = database::connect_in_memory().await?;
    Ok(router(AppState { db }))
}

/// Sends one request and returns the raw response.
pub async fn send(
    app: &Router,
    method: Method,
    path: &str,
    token: Option<&str>,
    body: Option<(&'static str, String)>,
) -> Result<Response> {
    let mut builder = Request::builder().method(method).uri(path);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }

    let request = match body {
        Some((content_type, payload)) => builder
            .header(header::CONTENT_TYPE, content_type)
            .body(Body::from(payload))?,
        None => builder.body(Body::empty())?,
    };

    Ok(app.clone().oneshot(request).await?)
}

/// Sends one request and parses the JSON body.
pub async fn request(
    app: &Router,
    method: Method,
    path: &str,
    token: Option<&str>,
    body: Option<(&'static str, String)>,
) -> Result<(StatusCode, Value)> {
    let response = send(app, method, path, token, body).await?;
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)
            .with_context(|| format!("non-JSON body for {path}: {:?}", bytes))?
    };
    Ok((status, json))
}

/// Form-urlencodes key/value pairs the way a browser form would.
pub fn form(pairs: &[(&str, &str)]) -> (&'static str, String) {
    let encoded = pairs
        .iter()
        .map(|(k, v)| format!("{}={}", escape(k), escape(v)))
        .collect::<Vec<_>>()
        .join("&");
    ("application/x-www-form-urlencoded", encoded)
}

pub fn json(value: Value) -> (&'static str, String) {
    ("application/json", value.to_string())
}

fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for byte in raw.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            b' ' => out.push('+'),
            other => out.push_str(&format!("%{other:02X}")),
        }
    }
    out
}

/// Signs up a fresh account and returns its bearer token.
pub async fn sign_up(app: &Router, name: &str, email: &str, username: &str) -> Result<String> {
    let (status, body) = request(
        app,
        Method::POST,
        "/auth/sign-up",
        None,
        Some(form(&[
            ("name", name),
            ("email", email),
            ("username", username),
            ("password", "rahasia-123"),
        ])),
    )
    .await?;
    ensure!(status == StatusCode::CREATED, "sign-up failed ({status}): {body}");

    body["data"]["token"]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| anyhow!("sign-up response missing token: {body}"))
}

/// First account on a fresh app, which bootstraps as the administrator.
pub async fn admin_token(app: &Router) -> Result<String> {
    sign_up(app, "Admin Satu", "admin@example.com", "admin").await
}

pub async fn create_record(
    app: &Router,
    token: &str,
    route: &str,
    fields: &[(&str, &str)],
) -> Result<i64> {
    let path = format!("/api/data/{route}");
    let (status, body) = request(app, Method::POST, &path, Some(token), Some(form(fields))).await?;
    ensure!(status == StatusCode::CREATED, "create {route} failed ({status}): {body}");

    body["data"]["id"].as_i64().ok_or_else(|| anyhow!("created {route} has no id: {body}"))
}

pub async fn create_geo_unit(app: &Router, token: &str) -> Result<i64> {
    create_record(
        app,
        token,
        "geo-units",
        &[
            ("province_code", "32"),
            ("province_name", "Jawa Barat"),
            ("regency_code", "01"),
            ("regency_name", "Kabupaten Bogor"),
            ("district_code", "010"),
            ("district_name", "Cibinong"),
            ("village_code", "001"),
            ("village_name", "Pakansari"),
        ],
    )
    .await
}

pub async fn create_family(
    app: &Router,
    token: &str,
    geo_unit_id: i64,
    card_number: &str,
) -> Result<i64> {
    let geo = geo_unit_id.to_string();
    create_record(
        app,
        token,
        "families",
        &[
            ("card_number", card_number),
            ("head_name", "Budi Santoso"),
            ("member_total", "4"),
            ("address", "Jl. Merdeka No. 1"),
            ("geo_unit_id", &geo),
        ],
    )
    .await
}

pub async fn create_member(
    app: &Router,
    token: &str,
    family_id: i64,
    seq_no: &str,
    nik: &str,
) -> Result<i64> {
    let family = family_id.to_string();
    create_record(
        app,
        token,
        "members",
        &[
            ("family_id", &family),
            ("seq_no", seq_no),
            ("name", "Siti Aminah"),
            ("nik", nik),
            ("gender", "female"),
            ("relation", "spouse"),
            ("marital_status", "married"),
            ("religion", "islam"),
            ("education", "senior_high"),
            ("birth_date", "1988-04-12"),
        ],
    )
    .await
}
