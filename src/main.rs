use std::sync::Arc;

use redis::Client as RedisClient;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use knowledge_api::{
    build_router, config::Config, db, services::payments::StripeClient, AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Arc::new(Config::from_env()?);

    let pool = db::create_pool(&config.database_url).await?;
    db::run_migrations(&pool).await?;
    info!("Database connected and migrations applied");

    let redis_client = RedisClient::open(config.redis_url.as_str())?;

    let payments = Arc::new(StripeClient::new(
        config.stripe_secret_key.clone(),
        config.stripe_api_base.clone(),
    )?);
    info!("Payment provider configured at {}", config.stripe_api_base);

    let state = AppState::new(pool, redis_client, config.clone(), payments);
    let app = build_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    info!("knowledge API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
