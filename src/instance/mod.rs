pub mod error;
pub mod handle;
pub mod runner;

use std::{
    collections::HashMap,
    sync::Arc,
    time::Duration,
};

use tokio::sync::{RwLock, broadcast, mpsc};

use crate::{
    db::auth_store::{
        AuthStore,
        InMemoryAuthStore,
    },
    wa::events::Event,
};

pub use error::InstanceError;
pub use handle::{ConnectionState, InstanceCommand, InstanceHandle, InstanceStatus};

/// Configuration used when creating a new instance task.
#[derive(Debug, Clone, Default)]
pub struct InstanceConfig {
    /// Whether to trigger initial connect command after creation.
    pub auto_connect: bool,
}

/// Timing and retry knobs shared by every instance runner task.
#[derive(Debug, Clone, Copy)]
pub struct RunnerConfig {
    pub handshake_timeout: Duration,
    pub response_timeout: Duration,
    pub keepalive_interval: Duration,
    pub qr_rotation: Duration,
    pub qr_pairing_expiry: Duration,
    pub reconnect_base: Duration,
    pub reconnect_max_attempts: u32,
    pub prekey_low_watermark: u32,
    pub prekey_refill_batch: u32,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            handshake_timeout: Duration::from_millis(15_000),
            response_timeout: Duration::from_millis(20_000),
            keepalive_interval: Duration::from_millis(25_000),
            qr_rotation: Duration::from_millis(20_000),
            qr_pairing_expiry: Duration::from_millis(60_000),
            reconnect_base: Duration::from_millis(3_000),
            reconnect_max_attempts: 5,
            prekey_low_watermark: 10,
            prekey_refill_batch: 100,
        }
    }
}

/// In-memory manager for multiple WA instances.
#[derive(Clone)]
pub struct InstanceManager {
    instances: Arc<RwLock<HashMap<String, InstanceHandle>>>,
    auth_store: Arc<dyn AuthStore>,
    wa_ws_url: String,
    runner_config: RunnerConfig,
}

impl InstanceManager {
    const DEFAULT_WA_WS_URL: &'static str = "wss://web.whatsapp.com/ws/chat";

    /// Creates a new empty manager using defaults suited to local runs/tests.
    pub fn new() -> Self {
        Self::new_with_runtime(
            Arc::new(InMemoryAuthStore::new()),
            Self::DEFAULT_WA_WS_URL.to_owned(),
            RunnerConfig::default(),
        )
    }

    /// Creates a manager with explicit auth store, ws endpoint and runner timings.
    pub fn new_with_runtime(
        auth_store: Arc<dyn AuthStore>,
        wa_ws_url: String,
        runner_config: RunnerConfig,
    ) -> Self {
        Self {
            instances: Arc::new(RwLock::new(HashMap::new())),
            auth_store,
            wa_ws_url,
            runner_config,
        }
    }

    /// Creates a new instance and starts its runner task.
    pub async fn create(&self, name: &str, config: InstanceConfig) -> Result<(), InstanceError> {
        let name = normalize_instance_name(name)?;
        let handle = {
            let mut instances = self.instances.write().await;
            if instances.contains_key(name) {
                return Err(InstanceError::AlreadyExists);
            }

            let (tx, rx) = mpsc::channel(64);
            let (event_tx, _) = broadcast::channel::<Event>(256);
            let status = Arc::new(RwLock::new(InstanceStatus::default()));
            let handle = InstanceHandle::new(tx, status.clone(), event_tx.clone());

            tokio::spawn(runner::run(runner::RunnerContext {
                name: name.to_owned(),
                status,
                command_rx: rx,
                event_tx,
                auth_store: self.auth_store.clone(),
                wa_ws_url: self.wa_ws_url.clone(),
                config: self.runner_config,
            }));
            instances.insert(name.to_owned(), handle.clone());
            handle
        };

        if config.auto_connect {
            handle.connect().await?;
        }

        Ok(())
    }

    /// Returns an instance handle by name.
    pub async fn get(&self, name: &str) -> Option<InstanceHandle> {
        let name = name.trim();
        if name.is_empty() {
            return None;
        }

        self.instances.read().await.get(name).cloned()
    }

    /// Returns the current total number of tracked instances.
    pub async fn count(&self) -> usize {
        self.instances.read().await.len()
    }

    /// Deletes an instance and asks its runner to shutdown.
    pub async fn delete(&self, name: &str) -> Result<(), InstanceError> {
        let name = normalize_instance_name(name)?;
        let handle = {
            let mut instances = self.instances.write().await;
            instances.remove(name).ok_or(InstanceError::NotFound)?
        };

        handle
            .tx
            .send(InstanceCommand::Shutdown)
            .await
            .map_err(|_| InstanceError::CommandChannelClosed)?;

        let _ = self.auth_store.remove(name).await;

        Ok(())
    }

    /// Disconnects an instance without removing it; it stays addressable for
    /// a later `connect`.
    pub async fn disconnect(&self, name: &str) -> Result<(), InstanceError> {
        let name = normalize_instance_name(name)?;
        let handle = self.get(name).await.ok_or(InstanceError::NotFound)?;
        handle.disconnect().await
    }

    /// Disconnects then reconnects an instance, reusing whatever credentials
    /// are already persisted for it.
    pub async fn restart(&self, name: &str) -> Result<(), InstanceError> {
        let name = normalize_instance_name(name)?;
        let handle = self.get(name).await.ok_or(InstanceError::NotFound)?;
        handle.disconnect().await?;
        handle.connect().await
    }

    /// Wipes persisted credentials for an instance and reconnects it from
    /// scratch, forcing a fresh QR pairing cycle.
    pub async fn reset(&self, name: &str) -> Result<(), InstanceError> {
        let name = normalize_instance_name(name)?;
        let handle = self.get(name).await.ok_or(InstanceError::NotFound)?;
        handle.disconnect().await?;
        let _ = self.auth_store.remove(name).await;
        handle.connect().await
    }

    /// Lists the names of every tracked instance.
    pub async fn list(&self) -> Vec<String> {
        self.instances.read().await.keys().cloned().collect()
    }

    /// Clears the currently displayed QR and forces a fresh pairing cycle by
    /// reconnecting, so the engine accepts the next server-driven QR batch.
    pub async fn generate_new_qr(&self, name: &str) -> Result<(), InstanceError> {
        let name = normalize_instance_name(name)?;
        let handle = self.get(name).await.ok_or(InstanceError::NotFound)?;
        handle.disconnect().await?;
        handle.connect().await
    }
}

impl Default for InstanceManager {
    fn default() -> Self {
        Self::new()
    }
}

fn normalize_instance_name(name: &str) -> Result<&str, InstanceError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(InstanceError::InvalidName);
    }

    Ok(trimmed)
}
