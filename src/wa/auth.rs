use std::collections::HashMap;

use rand_core::{OsRng, RngCore};
use serde::{Deserialize, Serialize};

use crate::wa::keys::{KeyPair, generate_keypair, generate_registration_id, sign_message};

/// Batch size for pre-key replenishment once the low watermark is hit.
pub const PRE_KEY_REFILL_BATCH: u32 = 100;
/// Minimum number of unused pre-keys kept on the server before a refill.
pub const PRE_KEY_LOW_WATERMARK: u32 = 10;

/// WhatsApp account information available after successful login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeInfo {
    /// Full JID for the connected account.
    pub jid: String,
    /// Optional profile display name.
    pub push_name: Option<String>,
    /// Linked-identity JID ("lid"), present on multi-device accounts.
    pub lid: Option<String>,
}

/// Browser identity reported in the client payload and device props.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrowserInfo {
    /// Operating system label, e.g. "Mac OS" or "Windows".
    pub os: String,
    /// Operating system version string.
    pub os_version: String,
}

impl Default for BrowserInfo {
    fn default() -> Self {
        Self {
            os: "Mac OS".to_owned(),
            os_version: "10.15.7".to_owned(),
        }
    }
}

/// Session metadata that evolves after authentication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionMetadata {
    /// Information about the currently logged in account.
    pub me: Option<MeInfo>,
    /// Opaque routing hint carried in the noise intro header, when present.
    pub routing_info: Option<Vec<u8>>,
    /// Reported browser identity.
    pub browser: BrowserInfo,
    /// Two-letter locale country code, defaults to "US" when unset.
    pub country_code: String,
    /// Companion platform string reported by the server after pairing.
    pub platform: String,
    /// Whether this session has completed device pairing.
    pub registered: bool,
    /// Unix timestamp of the last successful account metadata sync.
    pub last_account_sync_timestamp: Option<i64>,
}

impl Default for SessionMetadata {
    fn default() -> Self {
        Self {
            me: None,
            routing_info: None,
            browser: BrowserInfo::default(),
            country_code: "US".to_owned(),
            platform: String::new(),
            registered: false,
            last_account_sync_timestamp: None,
        }
    }
}

/// Identity and pre-key material persisted per instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityState {
    /// Static identity key used by Signal-compatible flows.
    pub identity_key: KeyPair,
    /// Registration identifier (14-bit) for the account.
    pub registration_id: u32,
    /// Signed pre-key pair.
    pub signed_pre_key: KeyPair,
    /// Signature for the signed pre-key.
    #[serde(with = "serde_sig64")]
    pub signed_pre_key_sig: [u8; 64],
    /// One-time pre-keys consumed during session bootstrap.
    pub one_time_pre_keys: Vec<KeyPair>,
    /// Next pre-key id to hand out when generating replenishment batches.
    pub next_pre_key_id: u32,
    /// Lowest pre-key id not yet confirmed uploaded to the server.
    pub first_unuploaded_pre_key_id: u32,
    /// Whether the server currently holds at least one of our pre-keys.
    pub server_has_pre_keys: bool,
}

/// Full auth state persisted for each instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthState {
    /// Ephemeral-lived static key used only for the Noise handshake.
    pub noise_key: KeyPair,
    /// Identity-related cryptographic state.
    pub identity: IdentityState,
    /// Session metadata unrelated to cryptographic identity.
    pub metadata: SessionMetadata,
    /// Shared secret used to derive the `adv` signature key for account sync.
    pub adv_secret_key: [u8; 32],
    /// Ephemeral key generated while a QR/pairing-code flow is in flight.
    pub pairing_ephemeral_key: Option<KeyPair>,
    /// Signal sender-key state, keyed by group/sender identifier.
    pub sender_keys: HashMap<String, Vec<u8>>,
    /// Raw app-state sync keys, keyed by key id.
    pub app_state_sync_keys: HashMap<String, Vec<u8>>,
    /// Last-seen app-state collection version, keyed by collection name.
    pub app_state_versions: HashMap<String, u64>,
}

impl AuthState {
    /// Creates a new auth state with generated identity and pre-keys.
    pub fn new() -> Self {
        let identity_key = generate_keypair();
        let signed_pre_key = generate_keypair();
        let signature = sign_message(identity_key.private, identity_key.public, &signed_pre_key.public);

        let mut adv_secret_key = [0_u8; 32];
        OsRng.fill_bytes(&mut adv_secret_key);

        let one_time_pre_keys: Vec<KeyPair> = (0..16).map(|_| generate_keypair()).collect();
        let next_pre_key_id = one_time_pre_keys.len() as u32;

        Self {
            noise_key: generate_keypair(),
            identity: IdentityState {
                identity_key,
                registration_id: generate_registration_id(),
                signed_pre_key,
                signed_pre_key_sig: signature,
                one_time_pre_keys,
                next_pre_key_id,
                first_unuploaded_pre_key_id: 0,
                server_has_pre_keys: false,
            },
            metadata: SessionMetadata::default(),
            adv_secret_key,
            pairing_ephemeral_key: None,
            sender_keys: HashMap::new(),
            app_state_sync_keys: HashMap::new(),
            app_state_versions: HashMap::new(),
        }
    }

    /// Whether this session holds enough credentials to attempt a reconnect
    /// without falling back to QR pairing.
    pub fn is_reconnect_eligible(&self) -> bool {
        self.metadata.registered && self.metadata.me.is_some()
    }

    /// Generates and appends a batch of pre-keys, advancing `next_pre_key_id`.
    pub fn refill_pre_keys(&mut self, batch: u32) {
        for _ in 0..batch {
            self.identity.one_time_pre_keys.push(generate_keypair());
            self.identity.next_pre_key_id += 1;
        }
        self.identity.server_has_pre_keys = false;
    }
}

impl Default for AuthState {
    fn default() -> Self {
        Self::new()
    }
}

mod serde_sig64 {
    use serde::{Deserialize, Deserializer, Serializer, de::Error as DeError};

    pub fn serialize<S>(value: &[u8; 64], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_bytes(value)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<[u8; 64], D::Error>
    where
        D: Deserializer<'de>,
    {
        let bytes = Vec::<u8>::deserialize(deserializer)?;
        if bytes.len() != 64 {
            return Err(D::Error::invalid_length(bytes.len(), &"64 bytes"));
        }

        let mut out = [0_u8; 64];
        out.copy_from_slice(&bytes);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_state_is_not_reconnect_eligible() {
        let state = AuthState::new();
        assert!(!state.is_reconnect_eligible());
    }

    #[test]
    fn refill_appends_requested_batch() {
        let mut state = AuthState::new();
        let before = state.identity.one_time_pre_keys.len();
        state.refill_pre_keys(PRE_KEY_REFILL_BATCH);
        assert_eq!(state.identity.one_time_pre_keys.len(), before + PRE_KEY_REFILL_BATCH as usize);
        assert!(!state.identity.server_has_pre_keys);
    }
}
