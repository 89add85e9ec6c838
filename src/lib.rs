pub mod app;
pub mod db;
pub mod events;
pub mod handlers;
pub mod instance;
mod group_store;
mod config;
mod error;
mod observability;
mod openapi;
pub mod wa;

use std::sync::Arc;

use app::{AppState, build_router};
use config::Config;
use db::auth_store::InMemoryAuthStore;
use instance::{InstanceManager, RunnerConfig};
use tokio::time::Duration;

/// Starts the chatwarp-api runtime.
pub async fn run() -> anyhow::Result<()> {
    let _ = tracing_subscriber::fmt::try_init();

    let config = Config::from_env()?;
    let bind_addr = config.bind_addr;
    let connect_wait_ms = config.instance_connect_wait_ms;
    let max_body_bytes = config.server_body_limit_kb.saturating_mul(1024);

    tracing::info!(
        %bind_addr,
        connect_wait_ms,
        max_body_bytes,
        wa_ws_url = %config.wa_ws_url,
        "starting chatwarp-api"
    );

    let runner_config = RunnerConfig {
        handshake_timeout: Duration::from_millis(config.handshake_timeout_ms),
        response_timeout: Duration::from_millis(config.response_timeout_ms),
        keepalive_interval: Duration::from_millis(config.keepalive_interval_ms),
        qr_rotation: Duration::from_millis(config.qr_rotation_ms),
        qr_pairing_expiry: Duration::from_millis(config.qr_pairing_expiry_ms),
        reconnect_base: Duration::from_millis(config.reconnect_base_ms),
        reconnect_max_attempts: config.reconnect_max_attempts,
        prekey_low_watermark: config.prekey_low_watermark,
        prekey_refill_batch: config.prekey_refill_batch,
    };
    let instance_manager = InstanceManager::new_with_runtime(
        Arc::new(InMemoryAuthStore::new()),
        config.wa_ws_url.clone(),
        runner_config,
    );

    let state = AppState::with_instance_manager(
        instance_manager,
        Duration::from_millis(connect_wait_ms),
        max_body_bytes,
    );
    state.set_ready(true);

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    axum::serve(listener, build_router(state)).await?;

    Ok(())
}
