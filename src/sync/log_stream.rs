use std::collections::VecDeque;
use std::sync::Arc;

use super::SyncContext;
use crate::models::{ConnectionState, LogEvent, LogKey, SocketEvent, SocketTag, StreamId, SyncEvent};
use crate::stream::ReconnectingEventSocket;

/// Append-only log tail. Unbounded unless a limit is given, in which case the
/// oldest lines fall off the front.
#[derive(Debug, Clone, Default)]
pub struct LogBuffer {
    lines: VecDeque<LogEvent>,
    limit: Option<usize>,
    pushed: u64,
}

impl LogBuffer {
    pub fn new(limit: Option<usize>) -> Self {
        Self {
            lines: VecDeque::new(),
            limit: limit.filter(|l| *l > 0),
            pushed: 0,
        }
    }

    pub fn push(&mut self, event: LogEvent) {
        if let Some(limit) = self.limit
            && self.lines.len() >= limit
        {
            self.lines.pop_front();
        }
        self.lines.push_back(event);
        self.pushed += 1;
    }

    pub fn clear(&mut self) {
        self.lines.clear();
        self.pushed = 0;
    }

    /// Lines pushed since the last clear, including any that fell off.
    pub fn pushed(&self) -> u64 {
        self.pushed
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LogEvent> {
        self.lines.iter()
    }
}

pub struct LogStreamSync {
    ctx: SyncContext,
    key: Option<LogKey>,
    generation: u64,
    socket: Option<ReconnectingEventSocket>,
    state: ConnectionState,
    buffer: LogBuffer,
    // bumped whenever the buffer is emptied, so printers can restart
    epoch: u64,
}

impl LogStreamSync {
    pub fn new(ctx: SyncContext, limit: Option<usize>) -> Self {
        Self {
            ctx,
            key: None,
            generation: 0,
            socket: None,
            state: ConnectionState::Idle,
            buffer: LogBuffer::new(limit),
            epoch: 0,
        }
    }

    pub fn key(&self) -> Option<&LogKey> {
        self.key.as_ref()
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn buffer(&self) -> &LogBuffer {
        &self.buffer
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Points the tail at a container. Nothing is opened until namespace,
    /// pod and container are all non-empty; an unchanged target is left alone.
    pub fn set_target(&mut self, namespace: &str, pod: &str, container: &str) {
        let Some(key) = LogKey::new(namespace, pod, container) else {
            self.close();
            return;
        };
        if self.key.as_ref() == Some(&key) && self.socket.is_some() {
            return;
        }
        self.open(key);
    }

    fn open(&mut self, key: LogKey) {
        self.teardown();
        self.generation += 1;

        let tag = SocketTag {
            stream: StreamId::PodLogs,
            generation: self.generation,
        };
        tracing::info!(namespace = %key.namespace, pod = %key.pod, container = %key.container, generation = self.generation, "tailing pod logs");

        match self.ctx.endpoint.pod_logs_url(&key, &self.ctx.session) {
            Ok(url) => {
                self.socket = Some(ReconnectingEventSocket::open(
                    Arc::clone(&self.ctx.connector),
                    url,
                    tag,
                    self.ctx.events.clone(),
                ));
            }
            Err(e) => {
                tracing::error!(error = %e, "cannot build pod log url");
                self.state = ConnectionState::Errored;
            }
        }
        self.key = Some(key);
    }

    /// Forces an immediate reconnect, independent of the automatic retry.
    pub fn retry(&mut self) {
        if let Some(socket) = &self.socket {
            socket.retry_now();
        } else if let Some(key) = self.key.clone() {
            self.open(key);
        }
    }

    pub fn close(&mut self) {
        self.teardown();
        self.key = None;
    }

    fn teardown(&mut self) {
        if let Some(mut socket) = self.socket.take() {
            socket.close();
        }
        self.state = ConnectionState::Idle;
        self.reset_buffer();
    }

    fn reset_buffer(&mut self) {
        self.buffer.clear();
        self.epoch += 1;
    }

    fn is_current(&self, tag: SocketTag) -> bool {
        tag.stream == StreamId::PodLogs
            && self.socket.as_ref().is_some_and(|s| !s.is_closed())
            && tag.generation == self.generation
    }

    /// Folds one socket event. Returns whether anything observable changed.
    pub fn apply(&mut self, event: SyncEvent) -> bool {
        if !self.is_current(event.tag) {
            tracing::trace!(generation = event.tag.generation, current = self.generation, "dropping stale log event");
            return false;
        }

        match event.event {
            SocketEvent::State(state) => {
                self.state = state;
                if matches!(state, ConnectionState::Connected) || state.is_lost() {
                    self.reset_buffer();
                }
                true
            }
            SocketEvent::Frame(payload) => match serde_json::from_value::<LogEvent>(payload) {
                Ok(line) => {
                    self.buffer.push(line);
                    true
                }
                Err(e) => {
                    tracing::warn!(error = %e, "dropping malformed log event");
                    false
                }
            },
        }
    }
}
