use crate::core::{MonitorError, MonitorResult};
use crate::network::transport::{MessageStream, Transport, TransportEvent};
use async_trait::async_trait;
use futures::StreamExt;
use log::debug;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

/// プロデューサーのWebSocketに接続するトランスポート
pub struct WebSocketTransport {
    url: String,
}

impl WebSocketTransport {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn open(&self) -> MonitorResult<Box<dyn MessageStream>> {
        let (ws, _) = connect_async(self.url.as_str())
            .await
            .map_err(|e| MonitorError::Transport(format!("{}への接続に失敗しました: {}", self.url, e)))?;
        Ok(Box::new(WebSocketMessageStream { ws }))
    }

    fn endpoint(&self) -> &str {
        &self.url
    }
}

pub struct WebSocketMessageStream {
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl MessageStream for WebSocketMessageStream {
    async fn next_event(&mut self) -> TransportEvent {
        loop {
            match self.ws.next().await {
                Some(Ok(Message::Text(text))) => return TransportEvent::Text(text),
                // バイナリは正しいUTF-8のときだけテキストとして扱う
                Some(Ok(Message::Binary(data))) => {
                    return match String::from_utf8(data) {
                        Ok(text) => TransportEvent::Text(text),
                        Err(e) => TransportEvent::Malformed(format!("UTF-8ではないバイナリフレーム: {}", e)),
                    };
                }
                Some(Ok(Message::Close(frame))) => {
                    debug!("クローズフレームを受信しました: {:?}", frame);
                    return TransportEvent::Closed;
                }
                // Ping/Pongはtungstenite側で処理される
                Some(Ok(_)) => continue,
                Some(Err(e)) => return TransportEvent::Error(e.to_string()),
                None => return TransportEvent::Closed,
            }
        }
    }

    async fn close(&mut self) -> MonitorResult<()> {
        self.ws
            .close(None)
            .await
            .map_err(|e| MonitorError::Transport(format!("WebSocketのクローズに失敗しました: {}", e)))
    }
}
