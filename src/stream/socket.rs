use futures::{FutureExt, StreamExt};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::AbortHandle;
use url::Url;

use super::transport::{Connector, FrameStream};
use crate::models::{ConnectionState, SocketEvent, SocketTag, SyncEvent};

pub const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// One logical subscription to a push stream that keeps reconnecting, at a
/// fixed delay, until [`close`](Self::close) is called or the handle dropped.
///
/// Everything the socket observes is sent as a [`SyncEvent`] carrying the
/// handle's [`SocketTag`], so the owner can discard events from superseded
/// subscriptions.
pub struct ReconnectingEventSocket {
    tag: SocketTag,
    task: Option<AbortHandle>,
    retry: Arc<Notify>,
}

impl ReconnectingEventSocket {
    pub fn open(
        connector: Arc<dyn Connector>,
        url: Url,
        tag: SocketTag,
        events: UnboundedSender<SyncEvent>,
    ) -> Self {
        let retry = Arc::new(Notify::new());
        let task = SocketTask {
            connector,
            url,
            tag,
            events,
            retry: Arc::clone(&retry),
        };
        let handle = tokio::spawn(task.run());

        Self {
            tag,
            task: Some(handle.abort_handle()),
            retry,
        }
    }

    /// Reconnect now: skips a pending reconnect delay, or drops the live
    /// connection and opens a fresh one.
    pub fn retry_now(&self) {
        if self.task.is_some() {
            self.retry.notify_one();
        }
    }

    pub fn close(&mut self) {
        if let Some(task) = self.task.take() {
            tracing::debug!(stream = ?self.tag.stream, generation = self.tag.generation, "closing socket");
            task.abort();
        }
    }

    pub fn is_closed(&self) -> bool {
        self.task.is_none()
    }
}

impl Drop for ReconnectingEventSocket {
    fn drop(&mut self) {
        self.close();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Closed,
    Failed,
    Retry,
    ReceiverGone,
}

struct SocketTask {
    connector: Arc<dyn Connector>,
    url: Url,
    tag: SocketTag,
    events: UnboundedSender<SyncEvent>,
    retry: Arc<Notify>,
}

impl SocketTask {
    fn emit(&self, event: SocketEvent) -> bool {
        self.events
            .send(SyncEvent {
                tag: self.tag,
                event,
            })
            .is_ok()
    }

    fn set_state(&self, state: ConnectionState) -> bool {
        tracing::debug!(stream = ?self.tag.stream, generation = self.tag.generation, %state, "socket state");
        self.emit(SocketEvent::State(state))
    }

    async fn run(self) {
        loop {
            if !self.set_state(ConnectionState::Connecting) {
                return;
            }

            let outcome = match self.connector.connect(self.url.as_str()).await {
                Ok(frames) => {
                    // a retry requested before this connection existed is already served
                    if self.retry.notified().now_or_never().is_some() {
                        tracing::debug!(stream = ?self.tag.stream, "dropping stale retry request");
                    }
                    if !self.set_state(ConnectionState::Connected) {
                        return;
                    }
                    self.pump(frames).await
                }
                Err(e) => {
                    tracing::warn!(stream = ?self.tag.stream, error = %e, "connect failed");
                    Outcome::Failed
                }
            };

            let next = match outcome {
                Outcome::Closed | Outcome::Retry => ConnectionState::Disconnected,
                Outcome::Failed => ConnectionState::Errored,
                Outcome::ReceiverGone => return,
            };
            if !self.set_state(next) {
                return;
            }
            if outcome == Outcome::Retry {
                continue;
            }

            tokio::select! {
                _ = tokio::time::sleep(RECONNECT_DELAY) => {}
                _ = self.retry.notified() => {
                    tracing::debug!(stream = ?self.tag.stream, "manual retry");
                }
            }
        }
    }

    async fn pump(&self, mut frames: FrameStream) -> Outcome {
        loop {
            tokio::select! {
                frame = frames.next() => match frame {
                    Some(Ok(text)) => match serde_json::from_str::<Value>(&text) {
                        Ok(payload) => {
                            if !self.emit(SocketEvent::Frame(payload)) {
                                return Outcome::ReceiverGone;
                            }
                        }
                        Err(e) => {
                            tracing::warn!(stream = ?self.tag.stream, error = %e, "dropping unparseable frame");
                        }
                    },
                    Some(Err(e)) => {
                        tracing::warn!(stream = ?self.tag.stream, error = %e, "connection failed");
                        return Outcome::Failed;
                    }
                    None => return Outcome::Closed,
                },
                _ = self.retry.notified() => return Outcome::Retry,
            }
        }
    }
}
