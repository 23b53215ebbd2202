use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use tracing::{debug, info, warn};

use crate::codec::SharedCodec;
use crate::error::WatchError;
use crate::listener::adapter::WatchAdapter;
use crate::listener::SharedListener;
use crate::watch::{SharedDataListener, SharedWatchService};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct ListenerId(usize);

impl ListenerId {
    fn of(listener: &SharedListener) -> Self {
        ListenerId(Arc::as_ptr(listener) as *const () as usize)
    }
}

struct ListenerEntry {
    listener: SharedListener,
    adapter: SharedDataListener,
}

/// Tracks which caller listeners are registered for which keys, together with
/// the watch adapter installed for each of them.
///
/// All keys share one watched node: the configuration file. At most one
/// adapter exists per `(key, listener)` pair.
pub struct ListenerRegistry {
    watch: SharedWatchService,
    path: String,
    codec: SharedCodec,
    entries: DashMap<String, HashMap<ListenerId, ListenerEntry>>,
}

impl ListenerRegistry {
    pub fn new(watch: SharedWatchService, path: impl Into<String>, codec: SharedCodec) -> Self {
        ListenerRegistry {
            watch,
            path: path.into(),
            codec,
            entries: DashMap::new(),
        }
    }

    /// Watched node shared by every key.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Register `listener` for `key`. Registering the same listener again
    /// replaces its previous adapter, so it is never notified twice.
    pub fn add(&self, key: &str, listener: SharedListener) -> Result<(), WatchError> {
        if key.trim().is_empty() {
            warn!("ignoring config listener registered for a blank key");
            return Ok(());
        }
        info!(key, path = %self.path, "adding config listener");
        if !self.watch.exists(&self.path)? {
            self.watch.create_persistent(&self.path, true)?;
        }

        let id = ListenerId::of(&listener);
        let adapter: SharedDataListener =
            Arc::new(WatchAdapter::new(key, listener.clone(), self.codec.clone()));
        // The entry guard is held until the new adapter is subscribed, so a
        // concurrent re-add cannot leave a replaced adapter subscribed.
        let mut listeners = self.entries.entry(key.to_string()).or_default();
        let previous = listeners.insert(
            id,
            ListenerEntry {
                listener,
                adapter: adapter.clone(),
            },
        );
        if let Some(previous) = previous {
            debug!(key, "replacing existing config listener");
            self.watch.unsubscribe_data_changes(&self.path, &previous.adapter);
        }
        self.watch.subscribe_data_changes(&self.path, adapter);
        Ok(())
    }

    /// Unregister `listener` from `key`. Unknown pairs are ignored, and so is
    /// a removal while the watched node does not exist: the entry stays and can
    /// be removed once the node is back.
    pub fn remove(&self, key: &str, listener: &SharedListener) -> Result<(), WatchError> {
        info!(key, "removing config listener");
        let id = ListenerId::of(listener);
        let Some(mut listeners) = self.entries.get_mut(key) else {
            debug!(key, "config listener was not registered");
            return Ok(());
        };
        if !listeners.contains_key(&id) {
            debug!(key, "config listener was not registered");
            return Ok(());
        }
        if !self.watch.exists(&self.path)? {
            warn!(key, path = %self.path, "watch node is gone, config listener kept");
            return Ok(());
        }
        if let Some(entry) = listeners.remove(&id) {
            self.watch.unsubscribe_data_changes(&self.path, &entry.adapter);
        }
        Ok(())
    }

    /// Listeners currently registered for `key`, or `None` if nothing was ever
    /// registered for it.
    pub fn listeners(&self, key: &str) -> Option<Vec<SharedListener>> {
        self.entries
            .get(key)
            .map(|listeners| listeners.values().map(|entry| entry.listener.clone()).collect())
    }
}
