pub mod log_stream;
pub mod resource_list;

use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::watch;

use crate::models::{Notice, SyncEvent};
use crate::stream::{Connector, Endpoint, SessionCredential};

pub use log_stream::LogStreamSync;
pub use resource_list::ResourceListSync;

/// Everything a sync component needs from its surroundings, handed over at
/// construction.
#[derive(Clone)]
pub struct SyncContext {
    pub endpoint: Endpoint,
    pub session: SessionCredential,
    pub connector: Arc<dyn Connector>,
    pub events: UnboundedSender<SyncEvent>,
    pub notices: UnboundedSender<Notice>,
}

/// Error flag for the current namespace. The list sync is the only writer;
/// any number of readers can [`subscribe`](Self::subscribe).
#[derive(Debug)]
pub struct NamespaceErrorState {
    tx: watch::Sender<Option<String>>,
}

impl NamespaceErrorState {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self { tx }
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<String>> {
        self.tx.subscribe()
    }

    #[cfg(test)]
    pub fn current(&self) -> Option<String> {
        self.tx.borrow().clone()
    }

    pub(crate) fn set(&self, message: String) {
        self.tx.send_if_modified(|current| {
            if current.as_deref() == Some(message.as_str()) {
                return false;
            }
            *current = Some(message);
            true
        });
    }

    pub(crate) fn clear(&self) {
        self.tx.send_if_modified(|current| current.take().is_some());
    }
}

impl Default for NamespaceErrorState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn readers_see_writes() {
        let state = NamespaceErrorState::new();
        let reader = state.subscribe();

        state.set("forbidden (Maybe Forbidden)".into());
        assert_eq!(
            reader.borrow().as_deref(),
            Some("forbidden (Maybe Forbidden)")
        );

        state.clear();
        assert!(reader.borrow().is_none());
        assert!(state.current().is_none());
    }

    #[test]
    fn repeated_set_does_not_notify() {
        let state = NamespaceErrorState::new();
        let mut reader = state.subscribe();

        state.set("x".into());
        assert!(reader.has_changed().unwrap());
        reader.mark_unchanged();

        state.set("x".into());
        assert!(!reader.has_changed().unwrap());

        state.clear();
        assert!(reader.has_changed().unwrap());
    }
}
