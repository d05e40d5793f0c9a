use anyhow::Context;
use std::net::SocketAddr;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use city_events::{
    app,
    cache::CacheService,
    config::Config,
    database::Database,
    services::{ReservationService, RetryPolicy},
    AppState,
};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    // В production логи в JSON, иначе обычный текст
    let json_logs = config.app.environment == "production";
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&config.app.rust_log))
        .with(json_logs.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json_logs).then(tracing_subscriber::fmt::layer))
        .init();

    info!(environment = %config.app.environment, "Starting City Events reservation service");

    let db = Database::connect(&config.database)
        .await
        .context("failed to connect to database")?;
    db.run_migrations()
        .await
        .context("failed to run migrations")?;

    // Кеш поиска необязателен, бронирование от него не зависит
    let cache = match &config.redis.url {
        Some(url) => match CacheService::connect(url, config.redis.search_ttl_seconds).await {
            Ok(cache) => Some(cache),
            Err(e) => {
                warn!("Redis unavailable, search cache disabled: {:?}", e);
                None
            }
        },
        None => None,
    };

    let reservations =
        ReservationService::new(db.order_store(), RetryPolicy::from(&config.reservation));
    let addr: SocketAddr = format!("{}:{}", config.app.host, config.app.port)
        .parse()
        .context("HOST/PORT do not form a socket address")?;
    let state = AppState::new(reservations, cache);

    info!("Server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app(state).into_make_service()).await?;
    Ok(())
}
