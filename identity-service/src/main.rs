use anyhow::Context;
use bus::KafkaBus;
use db_pool::{create_pool, DbConfig, TransactionManager};
use identity_service::config::Settings;
use identity_service::domain::UserService;
use identity_service::store::SqlxUserRepository;
use identity_service::{http, AppUserService};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use transactional_outbox::{metrics::OutboxMetrics, OutboxRelay, SqlxOutboxRepository};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,identity_service=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let settings = Settings::load().context("failed to load configuration")?;
    tracing::info!("identity-service starting");

    let db_config = DbConfig::for_service("identity-service");
    db_config.log_config();
    let pool = create_pool(db_config)
        .await
        .context("failed to create database pool")?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("failed to run migrations")?;

    let txm = TransactionManager::new(pool.clone(), Duration::from_millis(settings.lock_timeout_ms));

    let users = Arc::new(SqlxUserRepository);
    let outbox = Arc::new(SqlxOutboxRepository::new(pool.clone()));

    let user_service: Arc<AppUserService> =
        Arc::new(UserService::new(txm.clone(), users, outbox.clone()));

    let publisher = Arc::new(
        KafkaBus::new_publisher(&settings.broker.url).context("failed to connect bus publisher")?,
    );

    let relay = OutboxRelay::new(
        outbox,
        publisher,
        txm,
        settings.broker.exchange.clone(),
        settings.outbox.batch_size,
        Duration::from_millis(settings.outbox.poll_interval_ms),
    )
    .with_metrics(OutboxMetrics::new("identity-service"));

    let shutdown = CancellationToken::new();
    let relay_shutdown = shutdown.clone();
    tokio::spawn(async move {
        relay.run(relay_shutdown).await;
    });

    let app = http::router(user_service);
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
