//! Transport seam for push streams.
//!
//! `Connector` opens one connection and hands back the inbound text frames as a
//! stream. Production code uses [`WebSocketConnector`]; tests script frames
//! through an in-memory connector.

use futures::StreamExt;
use futures::stream::BoxStream;
use std::future::Future;
use std::pin::Pin;
use std::sync::Once;
use tokio_tungstenite::tungstenite::Message;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    #[error("receive failed: {0}")]
    ReceiveFailed(String),
}

pub type TransportResult<T> = Result<T, TransportError>;

/// Inbound frames of one live connection. The stream ending means the peer
/// closed the connection; an `Err` item means the transport failed.
pub type FrameStream = BoxStream<'static, TransportResult<String>>;

pub trait Connector: Send + Sync + 'static {
    fn connect(
        &self,
        url: &str,
    ) -> Pin<Box<dyn Future<Output = TransportResult<FrameStream>> + Send + '_>>;
}

/// rustls needs a process-wide crypto provider before the first `wss://` handshake.
fn install_crypto_provider() {
    static INSTALL: Once = Once::new();
    INSTALL.call_once(|| {
        if rustls::crypto::aws_lc_rs::default_provider()
            .install_default()
            .is_err()
        {
            tracing::debug!("crypto provider already installed");
        }
    });
}

#[derive(Debug, Default, Clone, Copy)]
pub struct WebSocketConnector;

impl Connector for WebSocketConnector {
    fn connect(
        &self,
        url: &str,
    ) -> Pin<Box<dyn Future<Output = TransportResult<FrameStream>> + Send + '_>> {
        install_crypto_provider();
        let url = url.to_string();
        Box::pin(async move {
            let (ws, _) = tokio_tungstenite::connect_async(url.as_str())
                .await
                .map_err(|e| TransportError::ConnectionFailed(e.to_string()))?;

            let frames = futures::stream::unfold(Some(ws), |ws| async move {
                let mut ws = ws?;
                loop {
                    match ws.next().await {
                        Some(Ok(Message::Text(text))) => {
                            return Some((Ok(text.to_string()), Some(ws)));
                        }
                        Some(Ok(Message::Binary(data))) => {
                            let text = String::from_utf8_lossy(&data).into_owned();
                            return Some((Ok(text), Some(ws)));
                        }
                        Some(Ok(Message::Close(_))) | None => return None,
                        // ping/pong are answered by tungstenite itself
                        Some(Ok(_)) => continue,
                        Some(Err(e)) => {
                            return Some((Err(TransportError::ReceiveFailed(e.to_string())), None));
                        }
                    }
                }
            });

            Ok(frames.boxed())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::SinkExt;
    use tokio::net::TcpListener;

    async fn serve_once(frames: Vec<Message>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(tcp).await.unwrap();
            for frame in frames {
                ws.send(frame).await.unwrap();
            }
            let _ = ws.close(None).await;
        });
        format!("ws://{addr}/")
    }

    #[tokio::test]
    async fn websocket_yields_text_frames_then_ends() {
        let url = serve_once(vec![
            Message::text("{\"a\":1}"),
            Message::Ping(Default::default()),
            Message::binary(b"{\"b\":2}".to_vec()),
        ])
        .await;

        let mut frames = WebSocketConnector.connect(&url).await.unwrap();
        assert_eq!(frames.next().await.unwrap().unwrap(), "{\"a\":1}");
        assert_eq!(frames.next().await.unwrap().unwrap(), "{\"b\":2}");
        assert!(frames.next().await.is_none());
    }

    #[tokio::test]
    async fn websocket_connect_refused_is_connection_failed() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let result = WebSocketConnector.connect(&format!("ws://{addr}/")).await;
        assert!(matches!(result, Err(TransportError::ConnectionFailed(_))));
    }

    #[tokio::test]
    async fn websocket_secure_scheme_attempts_tls_handshake() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            drop(tcp);
        });

        match WebSocketConnector.connect(&format!("wss://{addr}/")).await {
            Err(TransportError::ConnectionFailed(msg)) => {
                assert!(!msg.contains("TLS support not compiled in"), "{msg}");
            }
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("tls handshake against a plain socket succeeded"),
        }
    }
}
