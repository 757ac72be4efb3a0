use tracing::info;

use pendata_api::{config, database, router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, PORT, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt::init();

    let config = config::config();
    info!("Starting pendata-api in {:?} mode", config.environment);

    let db = database::connect(&config.database).await?;
    let app = router(AppState { db });

    let bind_addr = format!("0.0.0.0:{}", config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("pendata-api listening on http://{}", bind_addr);

    axum::serve(listener, app).await?;
    Ok(())
}
