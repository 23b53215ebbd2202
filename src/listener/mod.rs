//! Change events, caller listeners and the registry that wires them to the
//! watch service.

use std::sync::Arc;

/// Watch callback that decodes payloads into change events
pub mod adapter;
/// Key to listener bookkeeping
pub mod registry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeType {
    Modify,
    Delete,
}

/// A decoded remote mutation of one configuration key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub key: String,
    /// `None` when the node was deleted or the key is no longer present.
    pub new_value: Option<String>,
    pub change_type: ChangeType,
}

impl ChangeEvent {
    pub fn modified(key: impl Into<String>, new_value: Option<String>) -> Self {
        ChangeEvent {
            key: key.into(),
            new_value,
            change_type: ChangeType::Modify,
        }
    }

    pub fn deleted(key: impl Into<String>) -> Self {
        ChangeEvent {
            key: key.into(),
            new_value: None,
            change_type: ChangeType::Delete,
        }
    }
}

/// Receives change events for the keys it was registered on.
///
/// Called synchronously on the watch service's callback thread. Handlers must
/// be fast and must not block, or delivery stalls for every key.
pub trait ConfigChangeListener: Send + Sync {
    fn on_change_event(&self, event: ChangeEvent);
}

impl<F> ConfigChangeListener for F
where
    F: Fn(ChangeEvent) + Send + Sync,
{
    fn on_change_event(&self, event: ChangeEvent) {
        self(event)
    }
}

/// Listeners are identified by the allocation they point to: registering a
/// clone of the same `Arc` twice refers to the same listener.
pub type SharedListener = Arc<dyn ConfigChangeListener>;
