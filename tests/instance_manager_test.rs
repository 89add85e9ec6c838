mod common;

use std::sync::Arc;
use std::time::Duration;

use chatwarp_api::instance::{InstanceConfig, InstanceManager, RunnerConfig, handle::ConnectionState, runner::backoff};
use chatwarp_api::{
    db::auth_store::{AuthStore, InMemoryAuthStore},
    wa::auth::{AuthState, MeInfo},
    wa::events::Event,
};
use common::wa_mock::start_mock_wa_server;

#[tokio::test]
async fn manager_create_connect_delete_flow() -> anyhow::Result<()> {
    let server = start_mock_wa_server(
        Some(&["2@alpha-reference"]),
        Some("5511999999999@s.whatsapp.net"),
        true,
    )
    .await?;
    let manager = InstanceManager::new_with_runtime(
        Arc::new(InMemoryAuthStore::new()),
        server.url.clone(),
        RunnerConfig::default(),
    );

    manager
        .create("alpha", InstanceConfig { auto_connect: false })
        .await?;

    let handle = manager
        .get("alpha")
        .await
        .ok_or_else(|| anyhow::anyhow!("missing alpha instance"))?;

    let initial_state = handle.connection_state().await;
    assert_eq!(initial_state, ConnectionState::Disconnected);

    let mut events = handle.subscribe();
    handle.connect().await?;

    let connecting_event =
        tokio::time::timeout(Duration::from_secs(2), events.recv()).await??;
    assert_eq!(connecting_event, Event::Connecting { instance_name: "alpha".to_string() });

    let qr_event = tokio::time::timeout(Duration::from_secs(2), events.recv()).await??;
    let Event::QrCode { code, count, .. } = qr_event else {
        anyhow::bail!("expected qr event");
    };
    assert_eq!(count, 1);
    assert!(code.starts_with("2@alpha-reference,"));

    let connected_event =
        tokio::time::timeout(Duration::from_secs(2), events.recv()).await??;
    assert_eq!(connected_event, Event::Connected { instance_name: "alpha".to_string() });

    let connected_state = handle.connection_state().await;
    assert_eq!(connected_state, ConnectionState::Connected);

    manager.delete("alpha").await?;
    assert!(manager.get("alpha").await.is_none());
    server.finish().await?;

    Ok(())
}

#[test]
fn backoff_schedule_is_capped() {
    let base = Duration::from_secs(1);
    assert_eq!(backoff(base, 0), Duration::from_secs(1));
    assert_eq!(backoff(base, 1), Duration::from_secs(2));
    assert_eq!(backoff(base, 2), Duration::from_secs(4));
    assert_eq!(backoff(base, 3), Duration::from_secs(8));
    assert_eq!(backoff(base, 4), Duration::from_secs(16));
    assert_eq!(backoff(base, 5), Duration::from_secs(16));
    assert_eq!(backoff(base, 9), Duration::from_secs(16));
}

#[tokio::test]
async fn manager_reconnects_with_persisted_auth_without_qr() -> anyhow::Result<()> {
    let store = Arc::new(InMemoryAuthStore::new());
    let saved_auth = AuthState::new();
    store.save("persisted", &saved_auth).await?;

    let server = start_mock_wa_server(None, Some("5511666666666@s.whatsapp.net"), false).await?;
    let manager = InstanceManager::new_with_runtime(store.clone(), server.url.clone(), RunnerConfig::default());
    manager
        .create("persisted", InstanceConfig { auto_connect: false })
        .await?;

    let handle = manager
        .get("persisted")
        .await
        .ok_or_else(|| anyhow::anyhow!("missing persisted instance"))?;
    let mut events = handle.subscribe();
    handle.connect().await?;

    let connecting_event =
        tokio::time::timeout(Duration::from_secs(2), events.recv()).await??;
    assert_eq!(connecting_event, Event::Connecting { instance_name: "persisted".to_owned() });

    let connected_event =
        tokio::time::timeout(Duration::from_secs(2), events.recv()).await??;
    assert_eq!(connected_event, Event::Connected { instance_name: "persisted".to_owned() });

    let saved = store
        .load("persisted")
        .await?
        .ok_or_else(|| anyhow::anyhow!("missing saved auth state"))?;
    assert_eq!(
        saved.metadata.me,
        Some(MeInfo {
            jid: "5511666666666@s.whatsapp.net".to_owned(),
            push_name: None,
            lid: None,
        })
    );
    assert!(saved.metadata.registered);

    manager.delete("persisted").await?;
    server.finish().await?;
    Ok(())
}
