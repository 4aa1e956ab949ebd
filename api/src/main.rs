use actix_web::{web, HttpServer};
use anyhow::Context;
use std::{collections::HashMap, sync::Arc, time::Duration};
use tracing::info;
use tracing_actix_web::TracingLogger;

use og_api::{create_app, telemetry, AppState};
use og_core::repositories::{InMemoryOtpStore, OtpStore};
use og_core::services::{ProviderRegistry, VerificationService, VerificationServiceConfig};
use og_infra::{build_registry, RedisOtpStore};
use og_shared::config::{AppConfig, StoreKind};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load().context("loading configuration")?;
    telemetry::init_tracing(&config.logging());

    info!(
        environment = %config.environment,
        store = ?config.store.kind,
        event = "startup",
        "Starting OTP gateway"
    );

    let providers = Arc::new(build_registry(&config.providers).context("loading providers")?);
    info!(providers = ?providers.ids(), "Providers loaded");

    match config.store.kind {
        StoreKind::Redis => {
            let store = RedisOtpStore::connect(&config.store.redis)
                .await
                .context("connecting to Redis")?;
            serve(Arc::new(store), providers, &config).await
        }
        StoreKind::Memory => {
            if config.environment.is_production() {
                tracing::warn!("Using the in-memory store in production; records are lost on restart");
            }
            let store = InMemoryOtpStore::with_prefix(config.store.redis.key_prefix.clone());
            serve(Arc::new(store), providers, &config).await
        }
    }
}

async fn serve<S: OtpStore + 'static>(
    store: Arc<S>,
    providers: Arc<ProviderRegistry>,
    config: &AppConfig,
) -> anyhow::Result<()> {
    let service = Arc::new(VerificationService::new(
        store,
        providers,
        VerificationServiceConfig::from(&config.app),
    ));
    let state = web::Data::new(AppState::new(service));
    let credentials: Arc<HashMap<String, String>> = Arc::new(config.auth_map());

    let bind_address = config.server.bind_address();
    info!(address = %bind_address, "Listening");

    let mut server = HttpServer::new(move || {
        create_app(state.clone(), Arc::clone(&credentials)).wrap(TracingLogger::default())
    })
    .client_request_timeout(Duration::from_secs(config.server.request_timeout));

    if config.server.workers > 0 {
        server = server.workers(config.server.workers);
    }

    server.bind(&bind_address)?.run().await?;

    info!(event = "shutdown", "OTP gateway stopped");
    Ok(())
}
