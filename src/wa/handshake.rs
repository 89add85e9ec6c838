use std::collections::HashMap;

use bytes::Bytes;
use prost::Message;

use crate::wa::{
    binary_node::{self, BinaryNode, NodeContent},
    error::{HandshakeError, HandshakePhase},
    auth::AuthState,
    keys::{KEY_BUNDLE_TYPE, generate_keypair},
    noise_md::NoiseMdState,
    proto::wa::{self, handshake_message},
    transport::WsTransport,
    version::WaWebVersion,
};

/// Handshake result for real WA MD bootstrap.
#[derive(Debug, Clone)]
pub struct MdHandshakeOutcome {
    /// Initialized MD noise transport state.
    pub noise: NoiseMdState,
    /// Optional QR references extracted from early server stanzas.
    pub qr_references: Vec<String>,
    /// Raw payloads received immediately after client finish.
    pub server_payloads: Vec<Vec<u8>>,
    /// Optional JID when server confirms resumed login.
    pub login_jid: Option<String>,
    /// Client Noise public key used to build QR payload.
    pub noise_public: [u8; 32],
}

/// Performs WA MD Noise XX handshake using Baileys-compatible protobuf payloads.
pub async fn do_handshake_md(
    transport: &mut WsTransport,
    auth: &AuthState,
    version: WaWebVersion,
) -> Result<MdHandshakeOutcome, HandshakeError> {
    let ephemeral = generate_keypair();
    let mut noise = NoiseMdState::new(ephemeral.public, auth.metadata.routing_info.as_deref());

    let client_hello = NoiseMdState::build_client_hello(ephemeral.public);
    let mut client_hello_payload = Vec::new();
    client_hello
        .encode(&mut client_hello_payload)
        .map_err(|error| HandshakeError::with_phase(HandshakePhase::ClientHello, error.to_string()))?;

    let framed_client_hello = noise.encode_frame(&client_hello_payload)?;
    transport
        .send_raw(&framed_client_hello)
        .await
        .map_err(|error| HandshakeError::with_phase(HandshakePhase::ClientHello, error.to_string()))?;

    let server_hello_raw = transport
        .next_raw_frame()
        .await
        .map_err(|error| HandshakeError::with_phase(HandshakePhase::ServerHello, error.to_string()))?;
    let server_hello_message = decode_md_server_hello_message(&mut noise, server_hello_raw.as_ref())?;
    let server_hello = server_hello_message
        .server_hello
        .as_ref()
        .ok_or_else(|| HandshakeError::with_phase(HandshakePhase::ServerHello, "missing server_hello"))?;

    let encrypted_static = noise.process_server_hello(server_hello, &auth.noise_key, &ephemeral)?;
    let client_payload = build_client_payload(auth, version)?;
    let mut encoded_client_payload = Vec::new();
    client_payload
        .encode(&mut encoded_client_payload)
        .map_err(|error| HandshakeError::with_phase(HandshakePhase::ClientFinish, error.to_string()))?;

    let encrypted_payload = noise.encrypt_handshake_payload(&encoded_client_payload)?;
    let client_finish = wa::HandshakeMessage {
        client_hello: None,
        server_hello: None,
        client_finish: Some(handshake_message::ClientFinish {
            r#static: encrypted_static,
            payload: encrypted_payload,
            extended_ciphertext: Vec::new(),
        }),
    };
    let mut client_finish_payload = Vec::new();
    client_finish
        .encode(&mut client_finish_payload)
        .map_err(|error| HandshakeError::with_phase(HandshakePhase::ClientFinish, error.to_string()))?;

    let framed_client_finish = noise.encode_frame(&client_finish_payload)?;
    transport
        .send_raw(&framed_client_finish)
        .await
        .map_err(|error| HandshakeError::with_phase(HandshakePhase::ClientFinish, error.to_string()))?;

    noise.finish_init();

    let mut qr_references = Vec::new();
    let mut server_payloads = Vec::new();
    let mut login_jid = None;

    let first_transport_frame = transport
        .next_raw_frame()
        .await
        .map_err(|error| HandshakeError::with_phase(HandshakePhase::PostFinish, error.to_string()))?;
    let first_payloads = noise.decode_frames(first_transport_frame.as_ref())?;
    for payload in first_payloads {
        qr_references.extend(extract_qr_references_from_real_payload(&payload));
        if login_jid.is_none() {
            login_jid = extract_login_jid_from_real_payload(&payload);
        }
        server_payloads.push(payload);
    }

    Ok(MdHandshakeOutcome {
        noise,
        qr_references,
        server_payloads,
        login_jid,
        noise_public: ephemeral.public,
    })
}

fn decode_md_server_hello_message(
    noise: &mut NoiseMdState,
    raw_frame: &[u8],
) -> Result<wa::HandshakeMessage, HandshakeError> {
    let mut candidates: Vec<Vec<u8>> = Vec::new();
    if let Ok(frames) = noise.decode_frames(raw_frame) {
        candidates.extend(frames);
    }
    candidates.push(raw_frame.to_vec());
    if let Some(unframed) = maybe_unframe(raw_frame) {
        candidates.push(unframed.to_vec());
    }

    for payload in candidates {
        let Ok(message) = wa::HandshakeMessage::decode(payload.as_slice()) else {
            continue;
        };
        if message.server_hello.is_some() {
            return Ok(message);
        }
    }

    Err(HandshakeError::with_phase(
        HandshakePhase::ServerHello,
        format!(
            "unable to decode server_hello (raw_len={}, head={})",
            raw_frame.len(),
            preview_hex(raw_frame, 24)
        ),
    ))
}

fn build_client_payload(auth: &AuthState, version: WaWebVersion) -> Result<wa::ClientPayload, HandshakeError> {
    let browser = &auth.metadata.browser;
    let country_code = auth.metadata.country_code.trim();
    let locale_country = if country_code.is_empty() {
        "US"
    } else {
        country_code
    };

    let user_agent = wa::client_payload::UserAgent {
        platform: wa::client_payload::user_agent::Platform::Web as i32,
        app_version: Some(wa::client_payload::user_agent::AppVersion {
            primary: version.major,
            secondary: version.minor,
            tertiary: version.patch,
            quaternary: 0,
            quinary: 0,
        }),
        mcc: "000".to_owned(),
        mnc: "000".to_owned(),
        os_version: browser.os_version.clone(),
        manufacturer: String::new(),
        device: "Desktop".to_owned(),
        os_build_number: "0.1".to_owned(),
        phone_id: String::new(),
        release_channel: wa::client_payload::user_agent::ReleaseChannel::Release as i32,
        locale_language_iso_639_1: "en".to_owned(),
        locale_country_iso_3166_1_alpha_2: locale_country.to_owned(),
    };

    let web_sub_platform = match browser.os.as_str() {
        "Mac OS" => wa::client_payload::web_info::WebSubPlatform::Darwin as i32,
        "Windows" => wa::client_payload::web_info::WebSubPlatform::Win32 as i32,
        _ => wa::client_payload::web_info::WebSubPlatform::WebBrowser as i32,
    };

    let mut payload = wa::ClientPayload {
        username: 0,
        passive: false,
        user_agent: Some(user_agent),
        web_info: Some(wa::client_payload::WebInfo {
            web_sub_platform,
        }),
        push_name: auth
            .metadata
            .me
            .as_ref()
            .and_then(|me| me.push_name.clone())
            .unwrap_or_else(|| "Chatwarp".to_owned()),
        connect_type: wa::client_payload::ConnectType::WifiUnknown as i32,
        connect_reason: wa::client_payload::ConnectReason::UserActivated as i32,
        device: 0,
        device_pairing_data: None,
        pull: false,
        lid_db_migrated: false,
    };

    if let Some(me) = auth.metadata.me.as_ref() {
        let (username, device) = parse_jid_for_login(&me.jid)
            .ok_or_else(|| HandshakeError::with_phase(HandshakePhase::ClientFinish, "invalid persisted me.jid"))?;
        payload.username = username;
        payload.device = device;
        payload.pull = true;
        payload.lid_db_migrated = false;
    } else {
        payload.device_pairing_data = Some(build_registration_payload(auth, version));
    }

    Ok(payload)
}

fn build_registration_payload(
    auth: &AuthState,
    version: WaWebVersion,
) -> wa::client_payload::DevicePairingRegistrationData {
    let build_hash = md5::compute(format!("{}.{}.{}", version.major, version.minor, version.patch));
    let device_props = wa::DeviceProps {
        os: auth.metadata.browser.os.clone(),
        version: Some(wa::device_props::AppVersion {
            primary: 10,
            secondary: 15,
            tertiary: 7,
            quaternary: 0,
            quinary: 0,
        }),
        platform_type: wa::device_props::PlatformType::Chrome as i32,
        require_full_sync: false,
        history_sync_config: Some(default_history_sync_config()),
    };
    let mut encoded_device_props = Vec::new();
    let _ = device_props.encode(&mut encoded_device_props);

    wa::client_payload::DevicePairingRegistrationData {
        e_regid: encode_big_endian(auth.identity.registration_id, 4),
        e_keytype: vec![5],
        e_ident: auth.identity.identity_key.public.to_vec(),
        e_skey_id: encode_big_endian(1, 3),
        e_skey_val: auth.identity.signed_pre_key.public.to_vec(),
        e_skey_sig: auth.identity.signed_pre_key_sig.to_vec(),
        build_hash: build_hash.0.to_vec(),
        device_props: encoded_device_props,
    }
}

fn default_history_sync_config() -> wa::device_props::HistorySyncConfig {
    wa::device_props::HistorySyncConfig {
        storage_quota_mb: 10240,
        inline_initial_payload_in_e2ee_msg: true,
        support_call_log_history: false,
        support_bot_user_agent_chat_history: true,
        support_cag_reactions_and_polls: true,
        support_biz_hosted_msg: true,
        support_recent_sync_chunk_message_count_tuning: true,
        support_hosted_group_msg: true,
        support_fbid_bot_chat_history: true,
        support_message_association: true,
        support_group_history: false,
    }
}

fn encode_big_endian(value: u32, width: usize) -> Vec<u8> {
    let mut out = vec![0_u8; width];
    for (index, byte) in out.iter_mut().enumerate() {
        let shift = ((width - 1 - index) * 8) as u32;
        *byte = ((value >> shift) & 0xFF) as u8;
    }
    out
}

fn parse_jid_for_login(jid: &str) -> Option<(u64, u32)> {
    let (user_part, _) = jid.split_once('@')?;
    let (user_raw, device_raw) = if let Some((user, device)) = user_part.split_once(':') {
        (user, Some(device))
    } else {
        (user_part, None)
    };
    let username = user_raw.parse::<u64>().ok()?;
    let device = device_raw.and_then(|value| value.parse::<u32>().ok()).unwrap_or(0);
    Some((username, device))
}

/// Extracts every `ref` value carried by a `pair-device` iq (or a bare `ref`
/// node), in server order, so the caller can rotate through the full batch
/// rather than only ever showing the first one.
pub(crate) fn extract_qr_references_from_real_payload(payload: &[u8]) -> Vec<String> {
    let Ok(node) = binary_node::decode_real(payload) else {
        return Vec::new();
    };

    if node.tag == "ref" {
        return match &node.content {
            NodeContent::Bytes(bytes) => std::str::from_utf8(bytes)
                .ok()
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(ToOwned::to_owned)
                .into_iter()
                .collect(),
            _ => Vec::new(),
        };
    }

    if node.tag != "iq" {
        return Vec::new();
    }

    let NodeContent::Nodes(children) = &node.content else {
        return Vec::new();
    };
    let Some(pair_device) = children.iter().find(|child| child.tag == "pair-device") else {
        return Vec::new();
    };
    let NodeContent::Nodes(pair_children) = &pair_device.content else {
        return Vec::new();
    };

    pair_children
        .iter()
        .filter(|child| child.tag == "ref")
        .filter_map(|child| match &child.content {
            NodeContent::Bytes(bytes) => std::str::from_utf8(bytes)
                .ok()
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(ToOwned::to_owned),
            _ => None,
        })
        .collect()
}

/// Whether a decoded stanza is the bare top-level `<success/>` node a real
/// server sends to confirm a resumed (non-pairing) login.
pub(crate) fn is_success_stanza(payload: &[u8]) -> bool {
    binary_node::decode_real(payload)
        .map(|node| node.tag == "success")
        .unwrap_or(false)
}

/// Extracts `(id, type)` off any top-level `iq` stanza, for matching replies
/// against an outstanding request-by-id (ping, pre-key upload).
pub(crate) fn extract_iq_envelope(payload: &[u8]) -> Option<(String, String)> {
    let node = binary_node::decode_real(payload).ok()?;
    if node.tag != "iq" {
        return None;
    }
    let id = node.attrs.get("id")?.clone();
    let kind = node.attrs.get("type")?.clone();
    Some((id, kind))
}

/// Returns the `id` of an inbound `iq type="set"` stanza that carries a
/// `pair-device` or `pair-success` child, which must be ack'd with a matching
/// `iq type="result"` reply.
pub(crate) fn extract_ack_target_from_real_payload(payload: &[u8]) -> Option<String> {
    let node = binary_node::decode_real(payload).ok()?;
    if node.tag != "iq" {
        return None;
    }
    if node.attrs.get("type").map(String::as_str) != Some("set") {
        return None;
    }
    let id = node.attrs.get("id")?.clone();
    let NodeContent::Nodes(children) = &node.content else {
        return None;
    };
    let has_pair_child = children
        .iter()
        .any(|child| child.tag == "pair-device" || child.tag == "pair-success");
    has_pair_child.then_some(id)
}

/// Builds the `iq type="result"` ack reply for a pair-device/pair-success request.
pub(crate) fn build_ack_node(id: &str) -> BinaryNode {
    let mut attrs = HashMap::new();
    attrs.insert("id".to_owned(), id.to_owned());
    attrs.insert("type".to_owned(), "result".to_owned());
    BinaryNode {
        tag: "iq".to_owned(),
        attrs,
        content: NodeContent::Empty,
    }
}

/// Builds a `urn:xmpp:ping`-style keepalive iq with the given stanza id.
pub(crate) fn build_ping_node(id: &str) -> BinaryNode {
    let mut attrs = HashMap::new();
    attrs.insert("id".to_owned(), id.to_owned());
    attrs.insert("type".to_owned(), "get".to_owned());
    attrs.insert("xmlns".to_owned(), "w:p".to_owned());
    attrs.insert("to".to_owned(), "s.whatsapp.net".to_owned());
    BinaryNode {
        tag: "iq".to_owned(),
        attrs,
        content: NodeContent::Nodes(vec![BinaryNode {
            tag: "ping".to_owned(),
            attrs: HashMap::new(),
            content: NodeContent::Empty,
        }]),
    }
}

/// Builds the `iq type="set" xmlns="encrypt"` pre-key upload stanza for every
/// one-time pre-key at or past `first_unuploaded_pre_key_id`, plus the current
/// identity/signed pre-key bundle.
pub(crate) fn build_prekey_upload_node(auth: &AuthState, id: &str) -> BinaryNode {
    let mut attrs = HashMap::new();
    attrs.insert("id".to_owned(), id.to_owned());
    attrs.insert("type".to_owned(), "set".to_owned());
    attrs.insert("xmlns".to_owned(), "encrypt".to_owned());
    attrs.insert("to".to_owned(), "s.whatsapp.net".to_owned());

    let registration = BinaryNode {
        tag: "registration".to_owned(),
        attrs: HashMap::new(),
        content: NodeContent::Bytes(Bytes::from(encode_big_endian(auth.identity.registration_id, 4))),
    };
    let key_type = BinaryNode {
        tag: "type".to_owned(),
        attrs: HashMap::new(),
        content: NodeContent::Bytes(Bytes::from(vec![KEY_BUNDLE_TYPE])),
    };
    let identity = BinaryNode {
        tag: "identity".to_owned(),
        attrs: HashMap::new(),
        content: NodeContent::Bytes(Bytes::copy_from_slice(&auth.identity.identity_key.public)),
    };

    let start = auth.identity.first_unuploaded_pre_key_id as usize;
    let pending_keys = auth.identity.one_time_pre_keys.get(start..).unwrap_or(&[]);
    let key_nodes = pending_keys
        .iter()
        .enumerate()
        .map(|(offset, key)| BinaryNode {
            tag: "key".to_owned(),
            attrs: HashMap::new(),
            content: NodeContent::Nodes(vec![
                BinaryNode {
                    tag: "id".to_owned(),
                    attrs: HashMap::new(),
                    content: NodeContent::Bytes(Bytes::from(encode_big_endian(
                        start as u32 + offset as u32,
                        3,
                    ))),
                },
                BinaryNode {
                    tag: "value".to_owned(),
                    attrs: HashMap::new(),
                    content: NodeContent::Bytes(Bytes::copy_from_slice(&key.public)),
                },
            ]),
        })
        .collect();

    let list = BinaryNode {
        tag: "list".to_owned(),
        attrs: HashMap::new(),
        content: NodeContent::Nodes(key_nodes),
    };

    let skey = BinaryNode {
        tag: "skey".to_owned(),
        attrs: HashMap::new(),
        content: NodeContent::Nodes(vec![
            BinaryNode {
                tag: "id".to_owned(),
                attrs: HashMap::new(),
                content: NodeContent::Bytes(Bytes::from(encode_big_endian(1, 3))),
            },
            BinaryNode {
                tag: "value".to_owned(),
                attrs: HashMap::new(),
                content: NodeContent::Bytes(Bytes::copy_from_slice(&auth.identity.signed_pre_key.public)),
            },
            BinaryNode {
                tag: "signature".to_owned(),
                attrs: HashMap::new(),
                content: NodeContent::Bytes(Bytes::copy_from_slice(&auth.identity.signed_pre_key_sig)),
            },
        ]),
    };

    BinaryNode {
        tag: "iq".to_owned(),
        attrs,
        content: NodeContent::Nodes(vec![registration, key_type, identity, list, skey]),
    }
}

pub(crate) fn extract_login_jid_from_real_payload(payload: &[u8]) -> Option<String> {
    let node = binary_node::decode_real(payload).ok()?;
    if node.tag != "iq" {
        return None;
    }

    let NodeContent::Nodes(children) = &node.content else {
        return None;
    };

    let pair = children.iter().find(|child| child.tag == "pair-success")?;
    if let Some(jid) = pair.attrs.get("jid") {
        let trimmed = jid.trim();
        if !trimmed.is_empty() {
            return Some(trimmed.to_owned());
        }
    }

    let device = if let NodeContent::Nodes(pair_children) = &pair.content {
        pair_children.iter().find(|child| child.tag == "device")
    } else {
        None
    }?;
    device.attrs.get("jid").map(ToOwned::to_owned)
}

/// Device identity and platform info parsed out of a `pair-success` stanza.
#[derive(Debug, Clone)]
pub(crate) struct PairSuccessInfo {
    pub jid: String,
    pub business_name: Option<String>,
    pub lid: Option<String>,
    pub platform: String,
}

pub(crate) fn extract_pair_success_from_real_payload(payload: &[u8]) -> Option<PairSuccessInfo> {
    let node = binary_node::decode_real(payload).ok()?;
    if node.tag != "iq" {
        return None;
    }

    let NodeContent::Nodes(children) = &node.content else {
        return None;
    };
    let pair = children.iter().find(|child| child.tag == "pair-success")?;
    let NodeContent::Nodes(pair_children) = &pair.content else {
        return None;
    };
    let device = pair_children.iter().find(|child| child.tag == "device")?;

    let jid = device.attrs.get("jid")?.trim().to_owned();
    if jid.is_empty() {
        return None;
    }

    Some(PairSuccessInfo {
        jid,
        business_name: device.attrs.get("biz_name").map(ToOwned::to_owned),
        lid: device.attrs.get("lid").map(ToOwned::to_owned),
        platform: device
            .attrs
            .get("platform")
            .cloned()
            .unwrap_or_else(|| "smba".to_owned()),
    })
}

fn maybe_unframe(raw: &[u8]) -> Option<&[u8]> {
    if raw.len() < 3 {
        return None;
    }

    let expected_len = ((raw[0] as usize) << 16) | ((raw[1] as usize) << 8) | raw[2] as usize;
    let payload = &raw[3..];
    if payload.len() >= expected_len {
        return Some(&payload[..expected_len]);
    }

    None
}

fn preview_hex(bytes: &[u8], max_len: usize) -> String {
    let take = bytes.len().min(max_len);
    let mut out = String::with_capacity((take * 3).saturating_sub(1));
    for (index, byte) in bytes[..take].iter().enumerate() {
        if index > 0 {
            out.push(' ');
        }
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{byte:02x}");
    }
    out
}
