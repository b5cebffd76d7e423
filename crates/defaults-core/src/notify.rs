//! Change notification for observable stores.
//!
//! Notifications are fanned out over a `tokio::sync::broadcast` channel.
//! The store finishes mutating the raw dictionary and its cache before it
//! publishes, so a subscriber that reads on receipt always sees the new
//! state. Receivers choose their own execution context: a Tokio task, a UI
//! thread polling `try_recv`, or a blocking thread.

use tokio::sync::broadcast;
use tracing::trace;

/// What happened to the store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    /// A key was written.
    Stored,
    /// A key was deleted, by policy or explicitly.
    Removed,
    /// Every key was wiped.
    Reset,
}

/// A "something changed" signal, tagged with the key where one applies.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChangeEvent {
    /// The affected key name; `None` for [`ChangeKind::Reset`].
    pub key: Option<String>,
    pub kind: ChangeKind,
}

impl ChangeEvent {
    pub fn stored(key: &str) -> Self {
        Self {
            key: Some(key.to_string()),
            kind: ChangeKind::Stored,
        }
    }

    pub fn removed(key: &str) -> Self {
        Self {
            key: Some(key.to_string()),
            kind: ChangeKind::Removed,
        }
    }

    pub fn reset() -> Self {
        Self {
            key: None,
            kind: ChangeKind::Reset,
        }
    }

    /// Returns `true` if this event may have changed the value of `key`.
    pub fn affects(&self, key: &str) -> bool {
        match &self.key {
            Some(name) => name == key,
            None => true,
        }
    }
}

/// A broadcast receiver for store changes.
pub type ChangeStream = broadcast::Receiver<ChangeEvent>;

/// Fan-out publisher owned by an observable store.
pub(crate) struct ChangeNotifier {
    sender: broadcast::Sender<ChangeEvent>,
}

impl ChangeNotifier {
    pub(crate) fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub(crate) fn subscribe(&self) -> ChangeStream {
        self.sender.subscribe()
    }

    /// Publish an event. Having no subscribers is not an error.
    pub(crate) fn publish(&self, event: ChangeEvent) {
        match self.sender.send(event) {
            Ok(receivers) => trace!(receivers, "change published"),
            Err(_) => trace!("change published with no subscribers"),
        }
    }

    pub(crate) fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}
