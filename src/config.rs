use std::{net::SocketAddr, str::FromStr};

use thiserror::Error;

/// Runtime configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Socket address for binding the HTTP server.
    pub bind_addr: SocketAddr,
    /// Max wait for connect route to receive QR event.
    pub instance_connect_wait_ms: u64,
    /// Max HTTP request body size in KiB.
    pub server_body_limit_kb: usize,
    /// Websocket endpoint used for WA transport.
    pub wa_ws_url: String,
    /// Deadline for the Noise handshake to complete before giving up.
    pub handshake_timeout_ms: u64,
    /// Deadline waiting on a single server response during bootstrap.
    pub response_timeout_ms: u64,
    /// Interval between keepalive pings once a session is open.
    pub keepalive_interval_ms: u64,
    /// How often the current QR code is rotated while awaiting pairing.
    pub qr_rotation_ms: u64,
    /// How long an unscanned QR pairing window stays valid before expiry.
    pub qr_pairing_expiry_ms: u64,
    /// Base delay for exponential reconnect backoff.
    pub reconnect_base_ms: u64,
    /// Maximum number of reconnect attempts before giving up.
    pub reconnect_max_attempts: u32,
    /// Minimum number of unused pre-keys kept uploaded before a refill.
    pub prekey_low_watermark: u32,
    /// Batch size used when replenishing pre-keys.
    pub prekey_refill_batch: u32,
}

impl Config {
    /// Loads runtime configuration using environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        let port = env_parsed("SERVER_PORT", 8080, ConfigError::InvalidPort)?;
        let instance_connect_wait_ms =
            env_parsed("INSTANCE_CONNECT_WAIT_MS", 300, ConfigError::InvalidConnectWait)?;
        let server_body_limit_kb =
            env_parsed("SERVER_BODY_LIMIT_KB", 256, ConfigError::InvalidBodyLimit)?;
        let handshake_timeout_ms =
            env_parsed("WA_HANDSHAKE_TIMEOUT_MS", 15_000, ConfigError::InvalidTiming)?;
        let response_timeout_ms =
            env_parsed("WA_RESPONSE_TIMEOUT_MS", 20_000, ConfigError::InvalidTiming)?;
        let keepalive_interval_ms =
            env_parsed("WA_KEEPALIVE_INTERVAL_MS", 25_000, ConfigError::InvalidTiming)?;
        let qr_rotation_ms = env_parsed("WA_QR_ROTATION_MS", 20_000, ConfigError::InvalidTiming)?;
        let qr_pairing_expiry_ms =
            env_parsed("WA_QR_PAIRING_EXPIRY_MS", 60_000, ConfigError::InvalidTiming)?;
        let reconnect_base_ms = env_parsed("WA_RECONNECT_BASE_MS", 3_000, ConfigError::InvalidTiming)?;
        let reconnect_max_attempts =
            env_parsed("WA_RECONNECT_MAX_ATTEMPTS", 5, ConfigError::InvalidTiming)?;
        let prekey_low_watermark =
            env_parsed("WA_PREKEY_LOW_WATERMARK", 10, ConfigError::InvalidTiming)?;
        let prekey_refill_batch =
            env_parsed("WA_PREKEY_REFILL_BATCH", 100, ConfigError::InvalidTiming)?;

        let wa_ws_url = std::env::var("WA_WS_URL")
            .unwrap_or_else(|_| "wss://web.whatsapp.com/ws/chat".to_owned());

        Ok(Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], port)),
            instance_connect_wait_ms,
            server_body_limit_kb,
            wa_ws_url,
            handshake_timeout_ms,
            response_timeout_ms,
            keepalive_interval_ms,
            qr_rotation_ms,
            qr_pairing_expiry_ms,
            reconnect_base_ms,
            reconnect_max_attempts,
            prekey_low_watermark,
            prekey_refill_batch,
        })
    }
}

fn env_parsed<T>(key: &str, default: T, to_error: fn(String) -> ConfigError) -> Result<T, ConfigError>
where
    T: FromStr,
{
    match std::env::var(key) {
        Ok(raw) => raw.parse::<T>().map_err(|_| to_error(raw)),
        Err(_) => Ok(default),
    }
}

/// Errors while loading runtime configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid SERVER_PORT value: {0}")]
    InvalidPort(String),
    #[error("invalid INSTANCE_CONNECT_WAIT_MS value: {0}")]
    InvalidConnectWait(String),
    #[error("invalid SERVER_BODY_LIMIT_KB value: {0}")]
    InvalidBodyLimit(String),
    #[error("invalid timing/retry configuration value: {0}")]
    InvalidTiming(String),
}
