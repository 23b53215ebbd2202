use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::trace;

use crate::error::WatchError;
use crate::watch::{
    same_listener, ConnectParams, SharedDataListener, SharedWatchService, WatchConnector, WatchEvent,
    WatchService,
};

#[derive(Default)]
struct State {
    nodes: HashMap<String, Vec<u8>>,
    subscribers: HashMap<String, Vec<SharedDataListener>>,
    auth: Vec<(String, Vec<u8>)>,
    connections: Vec<ConnectParams>,
}

/// Watch tree kept in process memory.
///
/// Writes and deletes notify subscribers synchronously on the calling thread,
/// which plays the role of the watch service's callback thread. The lock is
/// released before listeners run, so they may subscribe or unsubscribe.
#[derive(Default)]
pub struct MemoryWatchService {
    state: Mutex<State>,
    /// Credentials every `digest` authentication must present, if any.
    required_digest: Option<Vec<u8>>,
}

impl MemoryWatchService {
    pub fn new() -> Self {
        Self::default()
    }

    /// A tree that only accepts `digest` authentication with `username:password`.
    pub fn with_digest(username: &str, password: &str) -> Self {
        MemoryWatchService {
            state: Mutex::default(),
            required_digest: Some(format!("{username}:{password}").into_bytes()),
        }
    }

    /// Replace the data of an existing node and notify its subscribers.
    pub fn write_data(&self, path: &str, payload: impl Into<Vec<u8>>) -> Result<(), WatchError> {
        let payload = payload.into();
        let listeners = {
            let mut state = self.state.lock();
            let node = state
                .nodes
                .get_mut(path)
                .ok_or_else(|| WatchError::NoNode(path.to_string()))?;
            node.clone_from(&payload);
            state.subscribers.get(path).cloned().unwrap_or_default()
        };
        self.dispatch(path, &listeners, WatchEvent::Changed { payload });
        Ok(())
    }

    /// Delete a node and notify its subscribers. Subscriptions are kept, as a
    /// later re-creation of the node is watched too.
    pub fn delete(&self, path: &str) -> Result<(), WatchError> {
        let listeners = {
            let mut state = self.state.lock();
            if state.nodes.remove(path).is_none() {
                return Err(WatchError::NoNode(path.to_string()));
            }
            state.subscribers.get(path).cloned().unwrap_or_default()
        };
        self.dispatch(path, &listeners, WatchEvent::Deleted);
        Ok(())
    }

    pub fn read_data(&self, path: &str) -> Result<Vec<u8>, WatchError> {
        self.state
            .lock()
            .nodes
            .get(path)
            .cloned()
            .ok_or_else(|| WatchError::NoNode(path.to_string()))
    }

    pub fn subscriber_count(&self, path: &str) -> usize {
        self.state.lock().subscribers.get(path).map_or(0, Vec::len)
    }

    pub fn auth_info(&self) -> Vec<(String, Vec<u8>)> {
        self.state.lock().auth.clone()
    }

    /// Every set of parameters a connector was asked to connect with.
    pub fn connections(&self) -> Vec<ConnectParams> {
        self.state.lock().connections.clone()
    }

    fn dispatch(&self, path: &str, listeners: &[SharedDataListener], event: WatchEvent) {
        trace!(path, subscribers = listeners.len(), ?event, "dispatching watch event");
        for listener in listeners {
            listener.handle_event(path, event.clone());
        }
    }
}

fn validate(path: &str) -> Result<(), WatchError> {
    let valid = path.starts_with('/')
        && path.len() > 1
        && !path.ends_with('/')
        && !path.contains("//");
    if valid {
        Ok(())
    } else {
        Err(WatchError::InvalidPath(path.to_string()))
    }
}

fn parent(path: &str) -> Option<&str> {
    match path.rsplit_once('/') {
        Some(("", _)) | None => None,
        Some((parent, _)) => Some(parent),
    }
}

impl WatchService for MemoryWatchService {
    fn add_auth_info(&self, scheme: &str, auth: &[u8]) -> Result<(), WatchError> {
        if let Some(required) = &self.required_digest {
            if scheme != "digest" || auth != required.as_slice() {
                return Err(WatchError::AuthFailed {
                    scheme: scheme.to_string(),
                });
            }
        }
        self.state.lock().auth.push((scheme.to_string(), auth.to_vec()));
        Ok(())
    }

    fn exists(&self, path: &str) -> Result<bool, WatchError> {
        validate(path)?;
        Ok(self.state.lock().nodes.contains_key(path))
    }

    fn create_persistent(&self, path: &str, create_parents: bool) -> Result<(), WatchError> {
        validate(path)?;
        let mut state = self.state.lock();
        if state.nodes.contains_key(path) {
            return if create_parents {
                Ok(())
            } else {
                Err(WatchError::NodeExists(path.to_string()))
            };
        }

        let mut ancestors = Vec::new();
        let mut current = parent(path);
        while let Some(ancestor) = current {
            if state.nodes.contains_key(ancestor) {
                break;
            }
            if !create_parents {
                return Err(WatchError::NoNode(ancestor.to_string()));
            }
            ancestors.push(ancestor.to_string());
            current = parent(ancestor);
        }
        for ancestor in ancestors {
            state.nodes.insert(ancestor, Vec::new());
        }
        state.nodes.insert(path.to_string(), Vec::new());
        Ok(())
    }

    fn subscribe_data_changes(&self, path: &str, listener: SharedDataListener) {
        let mut state = self.state.lock();
        let subscribers = state.subscribers.entry(path.to_string()).or_default();
        if !subscribers.iter().any(|existing| same_listener(existing, &listener)) {
            subscribers.push(listener);
        }
    }

    fn unsubscribe_data_changes(&self, path: &str, listener: &SharedDataListener) {
        let mut state = self.state.lock();
        if let Some(subscribers) = state.subscribers.get_mut(path) {
            subscribers.retain(|existing| !same_listener(existing, listener));
            if subscribers.is_empty() {
                state.subscribers.remove(path);
            }
        }
    }
}

impl WatchConnector for Arc<MemoryWatchService> {
    fn connect(&self, params: &ConnectParams) -> Result<SharedWatchService, WatchError> {
        self.state.lock().connections.push(params.clone());
        let service: SharedWatchService = self.clone();
        Ok(service)
    }
}
