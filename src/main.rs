//! e-mart commerce backend

use anyhow::{Context, Result};
use emart_commerce::api::{self, AppState, AuthKeys};
use emart_commerce::config::Config;
use emart_commerce::repository::Repositories;
use emart_commerce::services::{
    EventPublisher, HttpSmsGateway, LogPublisher, LogSmsGateway, NatsPublisher, PaymentGateway, SmsGateway, StripeGateway,
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load()?;
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let db = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .connect(&config.database_url)
        .await
        .context("connecting to database")?;
    sqlx::migrate!("./migrations").run(&db).await.context("running migrations")?;

    let events: Arc<dyn EventPublisher> = match &config.nats_url {
        Some(url) => match async_nats::connect(url.as_str()).await {
            Ok(client) => Arc::new(NatsPublisher::new(client)),
            Err(e) => {
                tracing::warn!(error = %e, "NATS unavailable, domain events will only be logged");
                Arc::new(LogPublisher)
            }
        },
        None => Arc::new(LogPublisher),
    };
    let sms: Arc<dyn SmsGateway> = match &config.sms {
        Some(c) => Arc::new(HttpSmsGateway::new(c)),
        None => {
            tracing::warn!("SMS gateway not configured, delivery OTPs will not be sent");
            Arc::new(LogSmsGateway)
        }
    };
    let payments = config.payment.as_ref().map(|c| Arc::new(StripeGateway::new(c)) as Arc<dyn PaymentGateway>);

    let state = AppState::new(
        Repositories::postgres(db),
        sms,
        payments,
        events,
        AuthKeys::new(&config.access_token_secret, config.token_ttl_secs),
    );
    let app = api::router(state, &config.cors_origins);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await.with_context(|| format!("binding {addr}"))?;
    tracing::info!("e-mart commerce listening on {}", addr);
    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
    tracing::info!("shutting down");
}
