use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use http::Request;
use tokio::net::TcpStream;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};

use crate::wa::error::TransportError;

/// WebSocket transport with WA framing (3-byte length prefix).
pub struct WsTransport {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl WsTransport {
    /// Connects to a websocket endpoint.
    pub async fn connect(url: &str) -> Result<Self, TransportError> {
        let request = Request::builder()
            .uri(url)
            .header("Origin", "https://web.whatsapp.com")
            .body(())?;

        let (stream, _) = connect_async(request).await.map_err(TransportError::Connect)?;

        Ok(Self { stream })
    }

    /// Sends an already-framed payload as a single websocket binary message.
    ///
    /// The Noise MD transport owns its own 3-byte length prefixing (and the
    /// one-shot `WA`/`ED` intro header), so this method writes bytes as-is.
    pub async fn send_raw(&mut self, payload: &[u8]) -> Result<(), TransportError> {
        self.stream.send(Message::Binary(payload.to_vec().into())).await?;
        Ok(())
    }

    /// Reads the next websocket binary message verbatim, replying to pings
    /// automatically. Multiple Noise frames may be packed into one message;
    /// callers demultiplex via `NoiseMdState::decode_frames`.
    pub async fn next_raw_frame(&mut self) -> Result<Bytes, TransportError> {
        loop {
            let message = self
                .stream
                .next()
                .await
                .ok_or(TransportError::Closed)??;

            match message {
                Message::Ping(payload) => {
                    self.stream.send(Message::Pong(payload)).await?;
                }
                Message::Binary(data) => return Ok(Bytes::from(data)),
                Message::Close(_) => return Err(TransportError::Closed),
                Message::Pong(_) => continue,
                Message::Text(_) => continue,
            }
        }
    }
}
