mod common;

use futures::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::Message;

use chatwarp_api::wa::{error::TransportError, transport::WsTransport};
use common::ws_mock::start_single_client_server;

#[tokio::test]
async fn transport_roundtrip_raw_message_sizes() -> anyhow::Result<()> {
    let sizes = [0_usize, 1, 65_535, 65_536];

    for size in sizes {
        let payload: Vec<u8> = (0..size).map(|idx| (idx % 251) as u8).collect();

        let server = start_single_client_server(|mut ws| async move {
            if let Some(Ok(Message::Binary(binary))) = ws.next().await {
                ws.send(Message::Binary(binary)).await?;
                return Ok(());
            }

            anyhow::bail!("server did not receive expected binary frame")
        })
        .await?;

        let mut transport = WsTransport::connect(&server.url).await?;
        transport.send_raw(&payload).await?;
        let echoed = transport.next_raw_frame().await?;
        assert_eq!(echoed.as_ref(), payload.as_slice());

        server.finish().await?;
    }

    Ok(())
}

#[tokio::test]
async fn transport_responds_to_ping_with_pong_before_next_binary() -> anyhow::Result<()> {
    let payload = b"post-ping-binary-message".to_vec();

    let server = start_single_client_server(move |mut ws| async move {
        ws.send(Message::Ping(vec![7, 7, 7].into())).await?;
        ws.send(Message::Binary(payload.into())).await?;

        let next = ws.next().await;
        match next {
            Some(Ok(Message::Pong(bytes))) => {
                assert_eq!(&bytes[..], &[7, 7, 7]);
                Ok(())
            }
            Some(Ok(other)) => anyhow::bail!("expected pong, got {other:?}"),
            Some(Err(err)) => Err(err.into()),
            None => anyhow::bail!("server stream closed before pong"),
        }
    })
    .await?;

    let mut transport = WsTransport::connect(&server.url).await?;
    let decoded = transport.next_raw_frame().await?;
    assert_eq!(decoded.as_ref(), b"post-ping-binary-message");

    server.finish().await?;
    Ok(())
}

#[tokio::test]
async fn transport_next_raw_frame_errors_on_close() -> anyhow::Result<()> {
    let server = start_single_client_server(|mut ws| async move {
        ws.send(Message::Close(None)).await?;
        Ok(())
    })
    .await?;

    let mut transport = WsTransport::connect(&server.url).await?;
    let error = transport.next_raw_frame().await.expect_err("expected closed error");
    assert!(matches!(error, TransportError::Closed | TransportError::WebSocket(_)));

    server.finish().await?;
    Ok(())
}
