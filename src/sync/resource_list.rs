use std::sync::Arc;

use super::{NamespaceErrorState, SyncContext};
use crate::models::{
    ConnectionState, ListKey, Notice, ResourceEvent, ResourceSummary, SocketEvent, SocketTag,
    StreamId, SyncEvent,
};
use crate::stream::ReconnectingEventSocket;

/// Ordered, name-unique set of resource summaries.
///
/// Updates are copy-on-write: a [`snapshot`](Self::snapshot) handed out
/// earlier never observes later folds.
#[derive(Debug, Clone, Default)]
pub struct ResourceList {
    items: Arc<Vec<ResourceSummary>>,
}

impl ResourceList {
    pub fn items(&self) -> &[ResourceSummary] {
        &self.items
    }

    #[cfg(test)]
    pub fn snapshot(&self) -> Arc<Vec<ResourceSummary>> {
        Arc::clone(&self.items)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[cfg(test)]
    pub fn get(&self, name: &str) -> Option<&ResourceSummary> {
        self.items.iter().find(|s| s.name == name)
    }

    /// Replaces an entry with the same name in place, or appends.
    pub fn upsert(&mut self, summary: ResourceSummary) {
        let items = Arc::make_mut(&mut self.items);
        match items.iter_mut().find(|s| s.name == summary.name) {
            Some(existing) => *existing = summary,
            None => items.push(summary),
        }
    }

    /// Returns whether anything was removed.
    pub fn remove(&mut self, name: &str) -> bool {
        let Some(pos) = self.items.iter().position(|s| s.name == name) else {
            return false;
        };
        Arc::make_mut(&mut self.items).remove(pos);
        true
    }

    pub fn clear(&mut self) {
        if !self.is_empty() {
            self.items = Arc::default();
        }
    }

    /// Case-insensitive name filter; an empty query matches everything.
    pub fn matching(&self, query: &str) -> Vec<&ResourceSummary> {
        if query.is_empty() {
            return self.items().iter().collect();
        }
        let query = query.to_lowercase();
        self.items()
            .iter()
            .filter(|s| s.name.to_lowercase().contains(&query))
            .collect()
    }
}

/// Keeps a [`ResourceList`] in step with the watcher stream of one
/// (kind, namespace) pair.
pub struct ResourceListSync {
    ctx: SyncContext,
    namespace_error: NamespaceErrorState,
    key: Option<ListKey>,
    generation: u64,
    socket: Option<ReconnectingEventSocket>,
    state: ConnectionState,
    list: ResourceList,
}

impl ResourceListSync {
    pub fn new(ctx: SyncContext, namespace_error: NamespaceErrorState) -> Self {
        Self {
            ctx,
            namespace_error,
            key: None,
            generation: 0,
            socket: None,
            state: ConnectionState::Idle,
            list: ResourceList::default(),
        }
    }

    pub fn key(&self) -> Option<&ListKey> {
        self.key.as_ref()
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn list(&self) -> &ResourceList {
        &self.list
    }

    pub fn namespace_error(&self) -> &NamespaceErrorState {
        &self.namespace_error
    }

    /// Drops the current subscription and its data and opens a fresh one for
    /// `key`. Runs on every call, including for a blank namespace.
    pub fn subscribe(&mut self, key: ListKey) {
        self.teardown();
        self.generation += 1;

        let tag = SocketTag {
            stream: StreamId::ResourceList,
            generation: self.generation,
        };
        tracing::info!(kind = %key.kind, namespace = %key.namespace, generation = self.generation, "subscribing to resource list");

        match self.ctx.endpoint.resource_list_url(&key, &self.ctx.session) {
            Ok(url) => {
                self.socket = Some(ReconnectingEventSocket::open(
                    Arc::clone(&self.ctx.connector),
                    url,
                    tag,
                    self.ctx.events.clone(),
                ));
            }
            Err(e) => {
                tracing::error!(error = %e, "cannot build resource list url");
                self.state = ConnectionState::Errored;
            }
        }
        self.key = Some(key);
    }

    pub fn set_namespace(&mut self, namespace: &str) {
        if let Some(kind) = self.key.as_ref().map(|k| k.kind) {
            self.subscribe(ListKey {
                kind,
                namespace: namespace.to_string(),
            });
        }
    }

    pub fn retry(&self) {
        if let Some(socket) = &self.socket {
            socket.retry_now();
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
        self.list.clear();
        self.namespace_error.clear();
    }

    fn is_current(&self, tag: SocketTag) -> bool {
        tag.stream == StreamId::ResourceList
            && self.socket.as_ref().is_some_and(|s| !s.is_closed())
            && tag.generation == self.generation
    }

    /// Folds one socket event. Returns whether anything observable changed.
    pub fn apply(&mut self, event: SyncEvent) -> bool {
        if !self.is_current(event.tag) {
            tracing::trace!(generation = event.tag.generation, current = self.generation, "dropping stale list event");
            return false;
        }

        match event.event {
            SocketEvent::State(state) => {
                self.state = state;
                if state.is_lost() {
                    self.list.clear();
                }
                true
            }
            SocketEvent::Frame(payload) => match ResourceEvent::from_payload(payload) {
                Ok(event) => self.fold(event),
                Err(e) => {
                    tracing::warn!(error = %e, "dropping malformed resource event");
                    false
                }
            },
        }
    }

    fn fold(&mut self, event: ResourceEvent) -> bool {
        match event {
            ResourceEvent::Error(error) => {
                tracing::warn!(%error, "server reported watch error");
                self.namespace_error
                    .set(format!("{error} (Maybe Forbidden)"));
                let _ = self.ctx.notices.send(Notice {
                    message: format!("Error Receiving Resources: {error}"),
                });
                true
            }
            ResourceEvent::Delete(name) => {
                self.namespace_error.clear();
                self.list.remove(&name);
                true
            }
            ResourceEvent::Upsert(summary) => {
                self.namespace_error.clear();
                self.list.upsert(summary);
                true
            }
        }
    }
}
