#![allow(dead_code)]

use std::collections::HashMap;

use aes_gcm::{
    Aes256Gcm, Nonce,
    aead::{Aead, KeyInit, Payload},
};
use hkdf::Hkdf;
use prost::Message;
use sha2::{Digest, Sha256};
use tokio_tungstenite::{WebSocketStream, tungstenite::Message as WsMessage};
use x25519_dalek::{PublicKey, StaticSecret};

use chatwarp_api::wa::{
    binary_node::{BinaryNode, NodeContent, encode},
    keys::{KeyPair, generate_keypair, sign_message},
    proto::wa::{self, cert_chain, handshake_message},
};

use super::ws_mock::{WsTestServer, start_single_client_server};

const NOISE_MODE: &[u8] = b"Noise_XX_25519_AESGCM_SHA256\0\0\0\0";
const NOISE_WA_HEADER: [u8; 4] = [87, 65, 6, 3];

/// Fixed issuer keypair shared by every mock server in a test process.
///
/// `noise_md::trusted_issuer_keys()` caches the `WA_NOISE_CERT_ISSUER_KEYS`
/// env var in a process-wide `OnceLock` the first time a handshake runs, so
/// every mock server in the same test binary must sign with the same issuer
/// key or later handshakes in that process would fail cert verification.
fn test_issuer_keypair() -> KeyPair {
    KeyPair::from_private([0x42; 32])
}

fn ensure_issuer_env_set(issuer_public: [u8; 32]) {
    static ONCE: std::sync::Once = std::sync::Once::new();
    ONCE.call_once(|| unsafe {
        std::env::set_var("WA_NOISE_CERT_ISSUER_KEYS", hex::encode(issuer_public));
    });
}

/// Minimal Noise_XX responder used only by the test harness, mirroring the
/// real client-side steps in `wa::noise_md::NoiseMdState` but from the
/// server's side of the handshake.
struct ServerNoise {
    hash: [u8; 32],
    salt: [u8; 32],
    enc_key: [u8; 32],
    dec_key: [u8; 32],
    counter: u32,
}

impl ServerNoise {
    fn new(client_ephemeral: [u8; 32]) -> Self {
        let mut hash = [0_u8; 32];
        hash[..NOISE_MODE.len()].copy_from_slice(NOISE_MODE);

        let mut state = Self {
            hash,
            salt: hash,
            enc_key: hash,
            dec_key: hash,
            counter: 0,
        };

        state.authenticate(&NOISE_WA_HEADER);
        state.authenticate(&client_ephemeral);
        state
    }

    fn authenticate(&mut self, bytes: &[u8]) {
        let mut hasher = Sha256::new();
        hasher.update(self.hash);
        hasher.update(bytes);
        self.hash.copy_from_slice(&hasher.finalize());
    }

    fn mix_into_key(&mut self, ikm: &[u8]) {
        let hk = Hkdf::<Sha256>::new(Some(&self.salt), ikm);
        let mut output = [0_u8; 64];
        hk.expand(&[], &mut output).expect("hkdf expand");
        self.salt.copy_from_slice(&output[..32]);
        self.enc_key.copy_from_slice(&output[32..]);
        self.dec_key.copy_from_slice(&output[32..]);
        self.counter = 0;
    }

    fn encrypt(&mut self, plaintext: &[u8]) -> Vec<u8> {
        let encrypted = aes_crypt(true, plaintext, &self.enc_key, self.counter, &self.hash);
        self.counter += 1;
        self.authenticate(&encrypted);
        encrypted
    }

    fn decrypt(&mut self, ciphertext: &[u8]) -> Vec<u8> {
        let decrypted = aes_crypt(false, ciphertext, &self.dec_key, self.counter, &self.hash);
        self.counter += 1;
        self.authenticate(ciphertext);
        decrypted
    }
}

fn aes_crypt(encrypt: bool, data: &[u8], key: &[u8; 32], counter: u32, ad: &[u8]) -> Vec<u8> {
    let cipher = Aes256Gcm::new_from_slice(key).expect("aes key");
    let mut nonce = [0_u8; 12];
    nonce[8..].copy_from_slice(&counter.to_be_bytes());
    let payload = Payload { msg: data, aad: ad };

    if encrypt {
        cipher
            .encrypt(Nonce::from_slice(&nonce), payload)
            .expect("encrypt")
    } else {
        cipher
            .decrypt(Nonce::from_slice(&nonce), payload)
            .expect("decrypt")
    }
}

fn diffie_hellman(private: [u8; 32], peer_public: [u8; 32]) -> [u8; 32] {
    StaticSecret::from(private)
        .diffie_hellman(&PublicKey::from(peer_public))
        .to_bytes()
}

fn frame(payload: &[u8]) -> Vec<u8> {
    let len = payload.len();
    let mut framed = Vec::with_capacity(3 + len);
    framed.push(((len >> 16) & 0xFF) as u8);
    framed.push(((len >> 8) & 0xFF) as u8);
    framed.push((len & 0xFF) as u8);
    framed.extend_from_slice(payload);
    framed
}

/// Strips the one-shot `WA\x06\x03` intro header the client sends ahead of
/// its first frame, if present.
fn strip_intro(raw: &[u8]) -> &[u8] {
    raw.strip_prefix(&NOISE_WA_HEADER).unwrap_or(raw)
}

fn unframe(raw: &[u8]) -> Vec<u8> {
    let raw = strip_intro(raw);
    let expected_len = ((raw[0] as usize) << 16) | ((raw[1] as usize) << 8) | raw[2] as usize;
    raw[3..3 + expected_len].to_vec()
}

async fn read_binary<S>(ws: &mut WebSocketStream<S>) -> anyhow::Result<Vec<u8>>
where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin,
{
    use futures::StreamExt;

    let next = ws
        .next()
        .await
        .ok_or_else(|| anyhow::anyhow!("websocket closed unexpectedly"))??;

    match next {
        WsMessage::Binary(binary) => Ok(binary.to_vec()),
        other => anyhow::bail!("expected binary message, got {other:?}"),
    }
}

/// Signs a fixture noise certificate chain using the shared test issuer key.
fn build_cert_chain(server_static_public: [u8; 32]) -> (Vec<u8>, [u8; 32]) {
    let issuer = test_issuer_keypair();

    let details = cert_chain::noise_certificate::Details {
        serial: 1,
        key: server_static_public.to_vec(),
        issuer_serial: 0,
    };
    let mut details_bytes = Vec::new();
    details.encode(&mut details_bytes).expect("encode details");
    let details_signature = sign_message(issuer.private, issuer.public, &details_bytes);

    let intermediate = cert_chain::NoiseCertificate {
        details: details_bytes,
        signature: details_signature.to_vec(),
    };

    let leaf_details = cert_chain::noise_certificate::Details {
        serial: 2,
        key: Vec::new(),
        issuer_serial: 1,
    };
    let mut leaf_details_bytes = Vec::new();
    leaf_details.encode(&mut leaf_details_bytes).expect("encode leaf details");
    let leaf_signature = sign_message(issuer.private, issuer.public, &leaf_details_bytes);

    let leaf = cert_chain::NoiseCertificate {
        details: leaf_details_bytes,
        signature: leaf_signature.to_vec(),
    };

    let chain = wa::CertChain {
        intermediate: Some(intermediate),
        leaf: Some(leaf),
    };
    let mut chain_bytes = Vec::new();
    chain.encode(&mut chain_bytes).expect("encode cert chain");

    (chain_bytes, issuer.public)
}

fn ref_node(reference: &str) -> BinaryNode {
    let mut attrs = HashMap::new();
    attrs.insert("id".to_owned(), "0".to_owned());
    BinaryNode {
        tag: "ref".to_owned(),
        attrs,
        content: NodeContent::Bytes(reference.as_bytes().to_vec().into()),
    }
}

fn pair_device_iq(refs: &[&str]) -> BinaryNode {
    let mut attrs = HashMap::new();
    attrs.insert("id".to_owned(), "P1".to_owned());
    attrs.insert("type".to_owned(), "set".to_owned());
    BinaryNode {
        tag: "iq".to_owned(),
        attrs,
        content: NodeContent::Nodes(vec![BinaryNode {
            tag: "pair-device".to_owned(),
            attrs: HashMap::new(),
            content: NodeContent::Nodes(refs.iter().map(|r| ref_node(r)).collect()),
        }]),
    }
}

fn pair_success_iq(jid: &str) -> BinaryNode {
    let mut device_attrs = HashMap::new();
    device_attrs.insert("jid".to_owned(), jid.to_owned());
    device_attrs.insert("platform".to_owned(), "smba".to_owned());

    let mut attrs = HashMap::new();
    attrs.insert("id".to_owned(), "P2".to_owned());
    attrs.insert("type".to_owned(), "set".to_owned());
    BinaryNode {
        tag: "iq".to_owned(),
        attrs,
        content: NodeContent::Nodes(vec![BinaryNode {
            tag: "pair-success".to_owned(),
            attrs: HashMap::new(),
            content: NodeContent::Nodes(vec![BinaryNode {
                tag: "device".to_owned(),
                attrs: device_attrs,
                content: NodeContent::Empty,
            }]),
        }]),
    }
}

/// Runs one client connection through a full Noise_XX MD handshake, then
/// serves either the QR-pairing path (when `qr_references` is non-empty) or
/// an immediate login confirmation (`login_jid`).
pub async fn start_mock_wa_server(
    qr_references: Option<&[&str]>,
    login_jid: Option<&str>,
    send_pair_success: bool,
) -> anyhow::Result<WsTestServer> {
    let qr_references: Vec<String> = qr_references
        .unwrap_or(&[])
        .iter()
        .map(|value| (*value).to_owned())
        .collect();
    let login_jid = login_jid.map(ToOwned::to_owned);

    start_single_client_server(move |mut ws| async move {
        let server_static = generate_keypair();
        let server_ephemeral = generate_keypair();

        let client_hello_raw = read_binary(&mut ws).await?;
        let client_hello_payload = unframe(&client_hello_raw);
        let client_hello_message = wa::HandshakeMessage::decode(client_hello_payload.as_slice())?;
        let client_hello = client_hello_message
            .client_hello
            .ok_or_else(|| anyhow::anyhow!("missing client_hello"))?;
        let client_ephemeral: [u8; 32] = client_hello
            .ephemeral
            .as_slice()
            .try_into()
            .map_err(|_| anyhow::anyhow!("bad client ephemeral length"))?;

        let mut noise = ServerNoise::new(client_ephemeral);

        noise.authenticate(&server_ephemeral.public);
        let dh1 = diffie_hellman(server_ephemeral.private, client_ephemeral);
        noise.mix_into_key(&dh1);

        let encrypted_static = noise.encrypt(&server_static.public);

        let dh2 = diffie_hellman(server_static.private, client_ephemeral);
        noise.mix_into_key(&dh2);

        let (cert_chain_bytes, issuer_public) = build_cert_chain(server_static.public);
        ensure_issuer_env_set(issuer_public);
        let encrypted_payload = noise.encrypt(&cert_chain_bytes);

        let server_hello = wa::HandshakeMessage {
            client_hello: None,
            server_hello: Some(handshake_message::ServerHello {
                ephemeral: server_ephemeral.public.to_vec(),
                r#static: encrypted_static,
                payload: encrypted_payload,
                extended_static: Vec::new(),
            }),
            client_finish: None,
        };
        let mut encoded_server_hello = Vec::new();
        server_hello.encode(&mut encoded_server_hello)?;
        ws.send_ext(frame(&encoded_server_hello)).await?;

        let client_finish_raw = read_binary(&mut ws).await?;
        let client_finish_message = wa::HandshakeMessage::decode(unframe(&client_finish_raw).as_slice())?;
        let client_finish = client_finish_message
            .client_finish
            .ok_or_else(|| anyhow::anyhow!("missing client_finish"))?;

        let client_noise_pub_bytes = noise.decrypt(&client_finish.r#static);
        let client_noise_pub: [u8; 32] = client_noise_pub_bytes
            .as_slice()
            .try_into()
            .map_err(|_| anyhow::anyhow!("bad client noise static length"))?;
        let dh3 = diffie_hellman(server_ephemeral.private, client_noise_pub);
        noise.mix_into_key(&dh3);

        let client_payload_bytes = noise.decrypt(&client_finish.payload);
        let _client_payload = wa::ClientPayload::decode(client_payload_bytes.as_slice())?;

        // finish_init: both sides derive the same split keys; the server's
        // encrypt direction is the client's decrypt direction and vice versa.
        let hk = Hkdf::<Sha256>::new(Some(&noise.salt), &[]);
        let mut output = [0_u8; 64];
        hk.expand(&[], &mut output).expect("hkdf expand");
        let client_enc = &output[..32];
        let client_dec = &output[32..];

        let mut write_counter: u32 = 0;
        let mut read_counter: u32 = 0;
        let server_enc: [u8; 32] = client_dec.try_into().unwrap();
        let server_dec: [u8; 32] = client_enc.try_into().unwrap();

        let mut send_node = |node: &BinaryNode, write_counter: &mut u32| -> anyhow::Result<Vec<u8>> {
            let encoded = encode(node)?;
            let ciphertext = aes_crypt(true, &encoded, &server_enc, *write_counter, &[]);
            *write_counter += 1;
            Ok(ciphertext)
        };

        if !qr_references.is_empty() {
            let iq = pair_device_iq(&qr_references.iter().map(String::as_str).collect::<Vec<_>>());
            let ciphertext = send_node(&iq, &mut write_counter)?;
            ws.send_ext(frame(&ciphertext)).await?;
        } else if let Some(jid) = login_jid.clone() {
            // Resumed-session path: server immediately emits a `success`
            // stanza recognized by `extract_login_jid_from_real_payload`
            // via a `pair-success`-shaped iq, matching a reconnect.
            let iq = pair_success_iq(&jid);
            let ciphertext = send_node(&iq, &mut write_counter)?;
            ws.send_ext(frame(&ciphertext)).await?;
        }

        if send_pair_success {
            if let Some(jid) = login_jid.clone() {
                let iq = pair_success_iq(&jid);
                let ciphertext = send_node(&iq, &mut write_counter)?;
                ws.send_ext(frame(&ciphertext)).await?;
            }
        }

        loop {
            use futures::StreamExt;
            let Some(next) = ws.next().await else { break };
            match next {
                Ok(WsMessage::Close(_)) => break,
                Ok(WsMessage::Ping(payload)) => {
                    ws.send_ext_raw(WsMessage::Pong(payload)).await?;
                }
                Ok(WsMessage::Binary(incoming)) => {
                    // Drain/decrypt any outbound app frames the client sends
                    // post-handshake; the harness doesn't assert on content.
                    if incoming.len() >= 3 {
                        let expected_len =
                            ((incoming[0] as usize) << 16) | ((incoming[1] as usize) << 8) | incoming[2] as usize;
                        if incoming.len() >= 3 + expected_len {
                            let _ = aes_crypt(false, &incoming[3..3 + expected_len], &server_dec, read_counter, &[]);
                            read_counter += 1;
                        }
                    }
                }
                Ok(_) => {}
                Err(_) => break,
            }
        }

        Ok(())
    })
    .await
}

/// Thin extension so the handler body above can `.send_ext` binary frames
/// without repeating the `Message::Binary` wrap at every call site.
trait WsSendExt {
    async fn send_ext(&mut self, payload: Vec<u8>) -> anyhow::Result<()>;
    async fn send_ext_raw(&mut self, message: WsMessage) -> anyhow::Result<()>;
}

impl<S> WsSendExt for WebSocketStream<S>
where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin,
{
    async fn send_ext(&mut self, payload: Vec<u8>) -> anyhow::Result<()> {
        use futures::SinkExt;
        self.send(WsMessage::Binary(payload.into())).await?;
        Ok(())
    }

    async fn send_ext_raw(&mut self, message: WsMessage) -> anyhow::Result<()> {
        use futures::SinkExt;
        self.send(message).await?;
        Ok(())
    }
}
