// handlers/system.rs - service endpoints and HTML pages

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Json, Response};
use serde_json::{json, Map, Value};

use crate::database::{self, Repository};
use crate::entity;
use crate::extract::PageUser;
use crate::response::{ApiResponse, ApiResult};
use crate::AppState;

/// GET / - Service descriptor
pub async fn root() -> Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    Json(json!({
        "success": true,
        "data": {
            "name": "Pendata API",
            "version": version,
            "description": "Household census administration backend",
            "endpoints": {
                "home": "/ (public)",
                "health": "/health (public)",
                "sign_in_page": "/sign-in (public)",
                "auth": "/auth/sign-up, /auth/sign-in (public), /auth/session (session)",
                "whoami": "/api/auth/whoami (session)",
                "users": "/api/users[/:id] (session, admin for list and delete)",
                "data": "/api/data/:entity[/:id] (session)",
                "dashboard": "/dashboard (session, redirects to /sign-in)",
            },
            "entities": entity::REGISTRY.iter().map(|def| def.route).collect::<Vec<_>>(),
        }
    }))
}

/// GET /health - Liveness plus database reachability
pub async fn health(State(state): State<AppState>) -> Response {
    let now = chrono::Utc::now();

    match database::health_check(&state.db).await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok"
                }
            })),
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "success": false,
                    "error": "database unavailable",
                    "data": {
                        "status": "degraded",
                        "timestamp": now,
                    }
                })),
            )
                .into_response()
        }
    }
}

/// GET /sign-in - Minimal form for browser sessions
pub async fn sign_in_page() -> Html<&'static str> {
    Html(SIGN_IN_PAGE)
}

/// GET /dashboard - Record counts per entity; no session redirects to /sign-in
pub async fn dashboard(State(state): State<AppState>, PageUser(user): PageUser) -> ApiResult<Value> {
    let mut counts = Map::new();
    for def in entity::REGISTRY {
        let n = Repository::new(def, &state.db).count().await?;
        counts.insert(def.route.to_string(), json!(n));
    }

    Ok(ApiResponse::success(json!({
        "user": user,
        "counts": counts,
    })))
}

const SIGN_IN_PAGE: &str = r#"<!doctype html>
<html lang="id">
<head>
  <meta charset="utf-8">
  <title>Pendata - Masuk</title>
</head>
<body>
  <h1>Masuk</h1>
  <form method="post" action="/auth/sign-in">
    <label>Nama pengguna <input name="username" autocomplete="username"></label>
    <label>Kata sandi <input name="password" type="password" autocomplete="current-password"></label>
    <button type="submit">Masuk</button>
  </form>
</body>
</html>
"#;
