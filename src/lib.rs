pub mod actions;
pub mod config;
pub mod database;
pub mod entity;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod response;
pub mod session;
pub mod validate;

use axum::extract::FromRef;
use axum::routing::{delete, get, post, put};
use axum::Router;
use sqlx::sqlite::SqlitePool;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
}

impl FromRef<AppState> for SqlitePool {
    fn from_ref(state: &AppState) -> Self {
        state.db.clone()
    }
}

/// Builds the full application router. Tests drive this directly; main
/// serves it.
pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(public_routes())
        .merge(page_routes())
        .merge(auth_routes())
        .merge(user_routes())
        .merge(data_routes())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn public_routes() -> Router<AppState> {
    use handlers::system;

    Router::new()
        .route("/", get(system::root))
        .route("/health", get(system::health))
}

fn page_routes() -> Router<AppState> {
    use handlers::system;

    Router::new()
        .route("/sign-in", get(system::sign_in_page))
        .route("/dashboard", get(system::dashboard))
}

fn auth_routes() -> Router<AppState> {
    use handlers::auth;

    Router::new()
        .route("/auth/sign-up", post(auth::sign_up))
        .route("/auth/sign-in", post(auth::sign_in))
        .route("/auth/session", delete(auth::sign_out))
        .route("/api/auth/whoami", get(auth::whoami))
}

fn user_routes() -> Router<AppState> {
    use handlers::users;

    Router::new()
        .route("/api/users", get(users::list))
        .route("/api/users/:id", put(users::update).delete(users::remove))
}

fn data_routes() -> Router<AppState> {
    use handlers::data;

    Router::new()
        .route("/api/data/:entity", post(data::create).get(data::list))
        .route(
            "/api/data/:entity/:id",
            get(data::get).put(data::update).delete(data::delete),
        )
}
