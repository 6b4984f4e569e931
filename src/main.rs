use std::net::SocketAddr;

use axum::Server;
use supervision_backend::{AppState, config::Config, db, init_tracing, routes};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env()?;
    init_tracing(&config);

    let pool = db::create_pool(&config.database())?;
    let redis = redis::Client::open(config.redis_url.as_str())?;
    let addr: SocketAddr = config.server_address().parse()?;

    let state = std::sync::Arc::new(AppState::new(pool, redis, config));
    let app = routes::create_router(state);

    tracing::info!(%addr, "Supervision server listening");
    Server::bind(&addr)
        .serve(app.into_make_service())
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutdown signal received");
        })
        .await?;
    Ok(())
}
