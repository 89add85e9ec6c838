mod common;

use chatwarp_api::wa::{
    auth::AuthState,
    handshake::do_handshake_md,
    transport::WsTransport,
    version::WaWebVersion,
};
use common::wa_mock::start_mock_wa_server;

#[tokio::test]
async fn handshake_surfaces_qr_references_when_unregistered() -> anyhow::Result<()> {
    let server = start_mock_wa_server(Some(&["2@handshake-qr"]), None, false).await?;

    let mut transport = WsTransport::connect(&server.url).await?;
    let auth = AuthState::new();
    let outcome = do_handshake_md(&mut transport, &auth, WaWebVersion::fallback()).await?;

    assert_eq!(outcome.qr_references, vec!["2@handshake-qr".to_owned()]);
    assert!(outcome.login_jid.is_none());
    assert_eq!(outcome.noise_public.len(), 32);

    let mut noise = outcome.noise;
    let framed = noise.encode_frame(b"app-layer-ping")?;
    transport.send_raw(&framed).await?;

    drop(transport);
    server.finish().await?;
    Ok(())
}

#[tokio::test]
async fn handshake_surfaces_login_jid_on_resumed_session() -> anyhow::Result<()> {
    let server = start_mock_wa_server(None, Some("5511777777777@s.whatsapp.net"), false).await?;

    let mut transport = WsTransport::connect(&server.url).await?;
    let mut auth = AuthState::new();
    auth.metadata.registered = true;
    let outcome = do_handshake_md(&mut transport, &auth, WaWebVersion::fallback()).await?;

    assert!(outcome.qr_references.is_empty());
    assert_eq!(outcome.login_jid.as_deref(), Some("5511777777777@s.whatsapp.net"));

    drop(transport);
    server.finish().await?;
    Ok(())
}
