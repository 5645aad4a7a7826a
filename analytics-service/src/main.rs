use analytics_service::config::Settings;
use analytics_service::domain::Consumer;
use analytics_service::store::SqlxUserStatsRepository;
use analytics_service::{http, AppConsumer};
use anyhow::Context;
use bus::KafkaBus;
use db_pool::{create_pool, DbConfig, TransactionManager};
use idempotent_consumer::IdempotencyStore;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,analytics_service=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let settings = Settings::load().context("failed to load configuration")?;
    tracing::info!("analytics-service starting");

    let db_config = DbConfig::for_service("analytics-service");
    db_config.log_config();
    let pool = create_pool(db_config)
        .await
        .context("failed to create database pool")?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("failed to run migrations")?;

    let txm = TransactionManager::new(pool.clone(), Duration::from_millis(3000));
    let stats = Arc::new(SqlxUserStatsRepository);
    let idempotency = IdempotencyStore::new(pool.clone());

    let bus = Arc::new(
        KafkaBus::new_subscriber(
            &settings.broker.url,
            &settings.broker.exchange,
            &settings.broker.queue,
            &settings.broker.binding_pattern,
        )
        .context("failed to connect bus subscriber")?,
    );

    let consumer: Arc<AppConsumer> = Arc::new(Consumer::new(txm, stats, idempotency, bus));

    let shutdown = CancellationToken::new();
    let consumer_shutdown = shutdown.clone();
    let consumer_handle = consumer.clone();
    tokio::spawn(async move {
        consumer_handle.run(consumer_shutdown).await;
    });

    let app = http::router();
    let listener = tokio::net::TcpListener::bind(&settings.http.addr)
        .await
        .with_context(|| format!("failed to bind {}", settings.http.addr))?;

    tracing::info!(addr = %settings.http.addr, "http server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            shutdown.cancel();
            tracing::info!("shutdown signal received");
        })
        .await
        .context("http server error")
}
