use serde::Serialize;

/// Events emitted by WA runtime components.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum Event {
    /// QR code payload generated for login, along with its rotation index.
    QrCode { instance_name: String, code: String, count: u32 },
    /// QR pairing window expired without a scan; session moved to closed.
    QrExpired { instance_name: String },
    /// Instance has entered connecting state (handshake in progress).
    Connecting { instance_name: String },
    /// Instance has entered connected (`open`) state.
    Connected { instance_name: String },
    /// Instance has entered disconnected state.
    Disconnected { instance_name: String, reason: String },
    /// Outbound payload acknowledged by runner.
    OutboundAck { instance_name: String, message_id: String, bytes: usize },
    /// Reconnect backoff has been scheduled.
    ReconnectScheduled { instance_name: String, delay_secs: u64 },
}

impl Event {
    /// Stable lower_snake_case tag used in routing keys and logs.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::QrCode { .. } => "qr_code",
            Self::QrExpired { .. } => "qr_expired",
            Self::Connecting { .. } => "connecting",
            Self::Connected { .. } => "connected",
            Self::Disconnected { .. } => "disconnected",
            Self::OutboundAck { .. } => "outbound_ack",
            Self::ReconnectScheduled { .. } => "reconnect_scheduled",
        }
    }
}
