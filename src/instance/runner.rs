use std::collections::VecDeque;
use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use tokio::sync::{RwLock, broadcast, mpsc};
use tokio::time::{Duration, Instant, sleep, timeout};

use crate::{
    db::auth_store::AuthStore,
    instance::{
        RunnerConfig,
        handle::{ConnectionState, InstanceCommand, InstanceStatus, QrCodeStatus},
    },
    wa::{
        auth::{AuthState, MeInfo, PRE_KEY_REFILL_BATCH},
        binary_node::{self, BinaryNode},
        do_handshake_md,
        events::Event,
        generate_qr_string,
        handshake::{
            build_ack_node, build_ping_node, build_prekey_upload_node,
            extract_ack_target_from_real_payload, extract_iq_envelope,
            extract_pair_success_from_real_payload, extract_qr_references_from_real_payload,
            is_success_stanza,
        },
        noise_md::NoiseMdState,
        qr::emit_qr_code,
        transport::WsTransport,
        version::WaWebVersion,
    },
};

/// Everything a single instance runner task needs to own for its lifetime.
pub struct RunnerContext {
    pub name: String,
    pub status: Arc<RwLock<InstanceStatus>>,
    pub command_rx: mpsc::Receiver<InstanceCommand>,
    pub event_tx: broadcast::Sender<Event>,
    pub auth_store: Arc<dyn AuthStore>,
    pub wa_ws_url: String,
    pub config: RunnerConfig,
}

/// How a single connection attempt ended, driving the outer reconnect loop.
enum AttemptOutcome {
    /// Caller asked us to stop for good.
    Shutdown,
    /// Session closed; caller should back off and retry.
    Retry { reason: String, reconnect_eligible: bool },
    /// Caller explicitly asked to disconnect while connected.
    Disconnected,
}

/// Main task loop for a single instance: owns the command channel for its
/// entire lifetime and drives connect/reconnect attempts in response to
/// `InstanceCommand::Connect`.
pub async fn run(mut ctx: RunnerContext) {
    let mut pending_attempt = false;
    let mut attempt: u32 = 0;

    loop {
        if !pending_attempt {
            match ctx.command_rx.recv().await {
                Some(InstanceCommand::Connect) => {}
                Some(InstanceCommand::Disconnect) => {
                    set_disconnected(&ctx, "manual_disconnect").await;
                    continue;
                }
                Some(InstanceCommand::MarkConnected) => {
                    mark_connected(&ctx).await;
                    continue;
                }
                Some(InstanceCommand::SendMessage { message_id, payload }) => {
                    let guard = ctx.status.read().await;
                    if guard.state == ConnectionState::Connected {
                        let _ = ctx.event_tx.send(Event::OutboundAck {
                            instance_name: ctx.name.clone(),
                            message_id,
                            bytes: payload.len(),
                        });
                    }
                    continue;
                }
                Some(InstanceCommand::Shutdown) | None => break,
            }
        }
        pending_attempt = false;

        match attempt_connection(&mut ctx).await {
            AttemptOutcome::Shutdown => break,
            AttemptOutcome::Disconnected => {
                attempt = 0;
            }
            AttemptOutcome::Retry { reason, reconnect_eligible } => {
                if !reconnect_eligible {
                    tracing::warn!(instance = %ctx.name, reason, "wa connection dropped without reusable credentials, not retrying");
                    set_disconnected(&ctx, "reconnect_ineligible").await;
                    attempt = 0;
                    continue;
                }

                if attempt >= ctx.config.reconnect_max_attempts {
                    set_disconnected(&ctx, "reconnect_attempts_exhausted").await;
                    attempt = 0;
                    continue;
                }

                let delay = backoff(ctx.config.reconnect_base, attempt);
                attempt += 1;
                let _ = ctx.event_tx.send(Event::ReconnectScheduled {
                    instance_name: ctx.name.clone(),
                    delay_secs: delay.as_secs(),
                });
                tracing::warn!(instance = %ctx.name, reason, delay_secs = delay.as_secs(), "wa connection dropped, retrying");

                tokio::select! {
                    _ = sleep(delay) => {
                        pending_attempt = true;
                    }
                    command = ctx.command_rx.recv() => {
                        match command {
                            Some(InstanceCommand::Shutdown) | None => break,
                            Some(InstanceCommand::Disconnect) => {
                                set_disconnected(&ctx, "manual_disconnect").await;
                                attempt = 0;
                            }
                            _ => { pending_attempt = true; }
                        }
                    }
                }
            }
        }
    }
}

async fn set_state(ctx: &RunnerContext, state: ConnectionState) {
    let mut guard = ctx.status.write().await;
    guard.state = state;
}

async fn set_disconnected(ctx: &RunnerContext, reason: &str) {
    {
        let mut guard = ctx.status.write().await;
        guard.state = ConnectionState::Disconnected;
        guard.last_error = Some(reason.to_owned());
    }
    let _ = ctx.event_tx.send(Event::Disconnected {
        instance_name: ctx.name.clone(),
        reason: reason.to_owned(),
    });
}

async fn mark_connected(ctx: &RunnerContext) {
    set_state(ctx, ConnectionState::Connected).await;
    let _ = ctx.event_tx.send(Event::Connected {
        instance_name: ctx.name.clone(),
    });
}

/// Pushes the next queued QR reference into view, promoting the instance to
/// `QrPending` if it wasn't already. No-op if the queue is empty.
async fn publish_next_qr(ctx: &RunnerContext, auth: &AuthState, qr_queue: &mut VecDeque<String>) {
    let Some(next) = qr_queue.pop_front() else {
        return;
    };
    let count = publish_qr_references(ctx, auth, std::slice::from_ref(&next)).await;
    let mut guard = ctx.status.write().await;
    guard.state = ConnectionState::QrPending;
    guard.qrcode.count = count;
}

/// Runs exactly one connect-handshake-session attempt to completion.
async fn attempt_connection(ctx: &mut RunnerContext) -> AttemptOutcome {
    set_state(ctx, ConnectionState::Connecting).await;
    let _ = ctx.event_tx.send(Event::Connecting {
        instance_name: ctx.name.clone(),
    });

    let mut auth = match ctx.auth_store.load(&ctx.name).await {
        Ok(Some(existing)) => existing,
        Ok(None) => AuthState::new(),
        Err(error) => return AttemptOutcome::Retry { reason: error.to_string(), reconnect_eligible: true },
    };

    let mut transport = match WsTransport::connect(&ctx.wa_ws_url).await {
        Ok(transport) => transport,
        Err(error) => {
            return AttemptOutcome::Retry {
                reason: error.to_string(),
                reconnect_eligible: auth.is_reconnect_eligible(),
            };
        }
    };

    let handshake = timeout(
        ctx.config.handshake_timeout,
        do_handshake_md(&mut transport, &auth, WaWebVersion::fallback()),
    )
    .await;

    let outcome = match handshake {
        Ok(Ok(outcome)) => outcome,
        Ok(Err(error)) => {
            return AttemptOutcome::Retry {
                reason: error.to_string(),
                reconnect_eligible: auth.is_reconnect_eligible(),
            };
        }
        Err(_) => {
            return AttemptOutcome::Retry {
                reason: "handshake timed out".to_owned(),
                reconnect_eligible: auth.is_reconnect_eligible(),
            };
        }
    };

    let mut noise = outcome.noise;

    // Ack any pair-device/pair-success request already captured during the
    // handshake's own post-finish frame read, and note whether a bare
    // `<success>` confirmation arrived in that same frame.
    let mut initial_success = false;
    for payload in &outcome.server_payloads {
        if let Some(id) = extract_ack_target_from_real_payload(payload) {
            let ack = build_ack_node(&id);
            let _ = send_node(&mut noise, &mut transport, &ack).await;
        }
        if is_success_stanza(payload) {
            initial_success = true;
        }
    }

    let mut success_handled = false;
    let mut pair_success_handled = false;
    let mut pre_key_upload_in_flight: Option<String> = None;
    let mut qr_queue: VecDeque<String> = VecDeque::new();

    if let Some(jid) = outcome.login_jid.clone() {
        auth.metadata.registered = true;
        if auth.metadata.me.is_none() {
            auth.metadata.me = Some(MeInfo { jid, push_name: None, lid: None });
        }
        pair_success_handled = true;
        maybe_refill_pre_keys(ctx, &mut auth).await;
        let _ = ctx.auth_store.save(&ctx.name, &auth).await;
        mark_connected(ctx).await;
        success_handled = true;
        maybe_start_prekey_upload(ctx, &auth, &mut noise, &mut transport, &mut pre_key_upload_in_flight).await;
    } else if initial_success && auth.metadata.registered {
        mark_connected(ctx).await;
        success_handled = true;
        maybe_start_prekey_upload(ctx, &auth, &mut noise, &mut transport, &mut pre_key_upload_in_flight).await;
    } else if !outcome.qr_references.is_empty() {
        qr_queue = outcome.qr_references.iter().cloned().collect();
        publish_next_qr(ctx, &auth, &mut qr_queue).await;
    }
    // Otherwise: a registered session with no confirming stanza yet (or a
    // fresh session still mid pairing) stays in `Connecting` and waits below,
    // bounded by `confirmation_deadline`. We never mark `Connected` on
    // persisted metadata alone.

    let qr_deadline = sleep(ctx.config.qr_pairing_expiry);
    tokio::pin!(qr_deadline);
    let mut qr_rotation_deadline = sleep(ctx.config.qr_rotation);
    tokio::pin!(qr_rotation_deadline);
    let mut keepalive_deadline = sleep(ctx.config.keepalive_interval);
    tokio::pin!(keepalive_deadline);
    let mut confirmation_deadline = sleep(ctx.config.response_timeout);
    tokio::pin!(confirmation_deadline);

    loop {
        tokio::select! {
            command = ctx.command_rx.recv() => {
                match command {
                    Some(InstanceCommand::Disconnect) => {
                        set_disconnected(ctx, "manual_disconnect").await;
                        return AttemptOutcome::Disconnected;
                    }
                    Some(InstanceCommand::Shutdown) | None => return AttemptOutcome::Shutdown,
                    Some(InstanceCommand::MarkConnected) => {
                        mark_connected(ctx).await;
                        success_handled = true;
                    }
                    Some(InstanceCommand::SendMessage { message_id, payload }) => {
                        let is_connected = ctx.status.read().await.state == ConnectionState::Connected;
                        if is_connected {
                            let framed = match noise.encode_frame(&payload) {
                                Ok(framed) => framed,
                                Err(error) => {
                                    return AttemptOutcome::Retry {
                                        reason: error.to_string(),
                                        reconnect_eligible: auth.is_reconnect_eligible(),
                                    };
                                }
                            };
                            if transport.send_raw(&framed).await.is_err() {
                                return AttemptOutcome::Retry {
                                    reason: "send failed".to_owned(),
                                    reconnect_eligible: auth.is_reconnect_eligible(),
                                };
                            }
                            let _ = ctx.event_tx.send(Event::OutboundAck {
                                instance_name: ctx.name.clone(),
                                message_id,
                                bytes: payload.len(),
                            });
                        }
                    }
                    Some(InstanceCommand::Connect) => {}
                }
            }
            frame = transport.next_raw_frame() => {
                let frame = match frame {
                    Ok(frame) => frame,
                    Err(error) => {
                        return AttemptOutcome::Retry {
                            reason: error.to_string(),
                            reconnect_eligible: auth.is_reconnect_eligible(),
                        };
                    }
                };
                let payloads = match noise.decode_frames(frame.as_ref()) {
                    Ok(payloads) => payloads,
                    Err(error) => {
                        return AttemptOutcome::Retry {
                            reason: error.to_string(),
                            reconnect_eligible: auth.is_reconnect_eligible(),
                        };
                    }
                };

                for payload in payloads {
                    if let Some(id) = extract_ack_target_from_real_payload(&payload) {
                        let ack = build_ack_node(&id);
                        let _ = send_node(&mut noise, &mut transport, &ack).await;
                    }

                    if let Some((id, kind)) = extract_iq_envelope(&payload) {
                        if pre_key_upload_in_flight.as_deref() == Some(id.as_str()) {
                            if kind == "result" {
                                auth.identity.server_has_pre_keys = true;
                                auth.identity.first_unuploaded_pre_key_id = auth.identity.next_pre_key_id;
                                let _ = ctx.auth_store.save(&ctx.name, &auth).await;
                            }
                            pre_key_upload_in_flight = None;
                        }
                    }

                    if is_success_stanza(&payload) {
                        if !success_handled {
                            mark_connected(ctx).await;
                            success_handled = true;
                            maybe_start_prekey_upload(ctx, &auth, &mut noise, &mut transport, &mut pre_key_upload_in_flight).await;
                        }
                    } else if let Some(info) = extract_pair_success_from_real_payload(&payload) {
                        if !pair_success_handled {
                            auth.metadata.me = Some(MeInfo {
                                jid: info.jid,
                                push_name: info.business_name,
                                lid: info.lid,
                            });
                            auth.metadata.platform = info.platform;
                            auth.metadata.registered = true;
                            pair_success_handled = true;
                            maybe_refill_pre_keys(ctx, &mut auth).await;
                            let _ = ctx.auth_store.save(&ctx.name, &auth).await;
                            if !success_handled {
                                mark_connected(ctx).await;
                                success_handled = true;
                            }
                            maybe_start_prekey_upload(ctx, &auth, &mut noise, &mut transport, &mut pre_key_upload_in_flight).await;
                        }
                    } else {
                        let references = extract_qr_references_from_real_payload(&payload);
                        if !references.is_empty() {
                            qr_queue.extend(references);
                            let is_pending = ctx.status.read().await.state == ConnectionState::QrPending;
                            if !is_pending {
                                publish_next_qr(ctx, &auth, &mut qr_queue).await;
                            }
                        }
                    }
                }
            }
            _ = &mut qr_deadline, if !auth.metadata.registered => {
                let is_pending = ctx.status.read().await.state == ConnectionState::QrPending;
                if is_pending {
                    let _ = ctx.event_tx.send(Event::QrExpired { instance_name: ctx.name.clone() });
                    set_disconnected(ctx, "qr_pairing_expired").await;
                    return AttemptOutcome::Disconnected;
                }
            }
            _ = &mut qr_rotation_deadline, if !auth.metadata.registered => {
                let is_pending = ctx.status.read().await.state == ConnectionState::QrPending;
                if is_pending {
                    if qr_queue.is_empty() {
                        let _ = ctx.event_tx.send(Event::QrExpired { instance_name: ctx.name.clone() });
                        set_disconnected(ctx, "qr_list_exhausted").await;
                        return AttemptOutcome::Disconnected;
                    }
                    publish_next_qr(ctx, &auth, &mut qr_queue).await;
                }
                qr_rotation_deadline.as_mut().reset(Instant::now() + ctx.config.qr_rotation);
            }
            _ = &mut keepalive_deadline => {
                let is_connected = ctx.status.read().await.state == ConnectionState::Connected;
                if is_connected {
                    let id = uuid::Uuid::new_v4().to_string();
                    let ping = build_ping_node(&id);
                    if send_node(&mut noise, &mut transport, &ping).await.is_err() {
                        return AttemptOutcome::Retry {
                            reason: "keepalive ping send failed".to_owned(),
                            reconnect_eligible: auth.is_reconnect_eligible(),
                        };
                    }
                }
                keepalive_deadline.as_mut().reset(Instant::now() + ctx.config.keepalive_interval);
            }
            _ = &mut confirmation_deadline, if !success_handled && auth.metadata.registered && qr_queue.is_empty() => {
                return AttemptOutcome::Retry {
                    reason: "timed out waiting for login confirmation".to_owned(),
                    reconnect_eligible: auth.is_reconnect_eligible(),
                };
            }
        }
    }
}

/// Tops up the local pre-key pool once it drops below the configured watermark.
async fn maybe_refill_pre_keys(ctx: &RunnerContext, auth: &mut AuthState) {
    let watermark = ctx.config.prekey_low_watermark as usize;
    if auth.identity.one_time_pre_keys.len() >= watermark {
        return;
    }

    let before = auth.identity.one_time_pre_keys.len();
    auth.refill_pre_keys(ctx.config.prekey_refill_batch);
    tracing::info!(
        instance = %ctx.name,
        before,
        after = auth.identity.one_time_pre_keys.len(),
        "refilled local pre-key pool below watermark"
    );
}

/// Whether the server-side pre-key bundle needs a (re)upload: either it has
/// never been uploaded, or enough fresh keys have piled up since the last one.
fn needs_prekey_upload(auth: &AuthState) -> bool {
    !auth.identity.server_has_pre_keys
        || auth
            .identity
            .next_pre_key_id
            .saturating_sub(auth.identity.first_unuploaded_pre_key_id)
            >= PRE_KEY_REFILL_BATCH
}

/// Sends the pre-key upload iq if one isn't already in flight and the
/// watermark conditions call for it; records the stanza id so the reply can
/// be matched when it arrives.
async fn maybe_start_prekey_upload(
    ctx: &RunnerContext,
    auth: &AuthState,
    noise: &mut NoiseMdState,
    transport: &mut WsTransport,
    in_flight: &mut Option<String>,
) {
    if in_flight.is_some() || !needs_prekey_upload(auth) {
        return;
    }

    let id = uuid::Uuid::new_v4().to_string();
    let node = build_prekey_upload_node(auth, &id);
    if send_node(noise, transport, &node).await.is_ok() {
        *in_flight = Some(id);
    } else {
        tracing::warn!(instance = %ctx.name, "pre-key upload send failed");
    }
}

/// Encodes a node, frames it through the noise transport and writes it out.
async fn send_node(noise: &mut NoiseMdState, transport: &mut WsTransport, node: &BinaryNode) -> Result<(), String> {
    let encoded = binary_node::encode(node).map_err(|error| error.to_string())?;
    let framed = noise.encode_frame(&encoded).map_err(|error| error.to_string())?;
    transport.send_raw(&framed).await.map_err(|error| error.to_string())
}

async fn publish_qr_references(ctx: &RunnerContext, auth: &AuthState, references: &[String]) -> u32 {
    let adv_secret_b64 = STANDARD.encode(auth.adv_secret_key);
    let mut count = ctx.status.read().await.qrcode.count;

    for reference in references {
        count += 1;
        let payload = generate_qr_string(
            reference,
            &auth.noise_key.public,
            &auth.identity.identity_key.public,
            &adv_secret_b64,
        );

        {
            let mut guard = ctx.status.write().await;
            guard.qrcode = QrCodeStatus {
                count,
                code: Some(payload.clone()),
                base64: crate::wa::qr::render_qr_svg_data_url(&payload).ok(),
                pairing_code: None,
            };
        }

        let _ = emit_qr_code(&ctx.event_tx, ctx.name.clone(), payload, count);
    }

    count
}

/// Returns reconnection delay using capped exponential backoff.
pub fn backoff(base: Duration, attempt: u32) -> Duration {
    let factor = 1_u32.checked_shl(attempt.min(4)).unwrap_or(16);
    base.saturating_mul(factor)
}
