//! In-memory connector used by socket and sync tests.

use futures::StreamExt;
use futures::channel::mpsc;
use serde_json::Value;
use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use super::transport::{Connector, FrameStream, TransportError, TransportResult};

enum Script {
    Accept(mpsc::UnboundedReceiver<TransportResult<String>>),
    Refuse,
}

/// Hands out scripted connections in order. Connecting with nothing queued
/// is refused.
#[derive(Default)]
pub struct ScriptedConnector {
    scripts: Mutex<VecDeque<Script>>,
    urls: Mutex<Vec<String>>,
}

/// Server half of one scripted connection. Dropping it closes the connection.
pub struct ServerSide {
    tx: mpsc::UnboundedSender<TransportResult<String>>,
}

impl ServerSide {
    pub fn send_json(&self, value: Value) {
        self.send_raw(&value.to_string());
    }

    pub fn send_raw(&self, text: &str) {
        let _ = self.tx.unbounded_send(Ok(text.to_string()));
    }

    pub fn fail(&self, reason: &str) {
        let _ = self
            .tx
            .unbounded_send(Err(TransportError::ReceiveFailed(reason.to_string())));
    }

    pub fn close(self) {}
}

impl ScriptedConnector {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn accept(&self) -> ServerSide {
        let (tx, rx) = mpsc::unbounded();
        self.scripts.lock().unwrap().push_back(Script::Accept(rx));
        ServerSide { tx }
    }

    pub fn refuse(&self) {
        self.scripts.lock().unwrap().push_back(Script::Refuse);
    }

    pub fn attempts(&self) -> usize {
        self.urls.lock().unwrap().len()
    }

    pub fn urls(&self) -> Vec<String> {
        self.urls.lock().unwrap().clone()
    }
}

impl Connector for ScriptedConnector {
    fn connect(
        &self,
        url: &str,
    ) -> Pin<Box<dyn Future<Output = TransportResult<FrameStream>> + Send + '_>> {
        self.urls.lock().unwrap().push(url.to_string());
        let script = self.scripts.lock().unwrap().pop_front();
        Box::pin(async move {
            match script {
                Some(Script::Accept(rx)) => Ok(rx.boxed()),
                Some(Script::Refuse) | None => Err(TransportError::ConnectionFailed(
                    "connection refused".to_string(),
                )),
            }
        })
    }
}

/// Lets spawned socket tasks run without letting a paused clock move.
pub async fn settle() {
    for _ in 0..32 {
        tokio::task::yield_now().await;
    }
}
