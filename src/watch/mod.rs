//! Narrow interface to the hierarchical watch service (a ZooKeeper-style
//! coordination store) plus an in-memory implementation of it.

use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

use crate::error::WatchError;

/// Connection bootstrap
pub mod bootstrap;
/// In-memory watch tree
pub mod memory;

/// Notification delivered for a watched node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    /// Node data was written. The payload is the raw stored bytes.
    Changed { payload: Vec<u8> },
    Deleted,
}

/// Callback installed on a watched path.
///
/// Invoked synchronously on the watch service's own thread, so
/// implementations must not block.
pub trait DataListener: Send + Sync {
    fn handle_event(&self, path: &str, event: WatchEvent);
}

pub type SharedDataListener = Arc<dyn DataListener>;

/// Operations the client needs from a connected watch service.
pub trait WatchService: Send + Sync {
    fn add_auth_info(&self, scheme: &str, auth: &[u8]) -> Result<(), WatchError>;

    fn exists(&self, path: &str) -> Result<bool, WatchError>;

    /// Create a persistent node. With `create_parents` missing ancestors are
    /// created and an existing node is not an error.
    fn create_persistent(&self, path: &str, create_parents: bool) -> Result<(), WatchError>;

    fn subscribe_data_changes(&self, path: &str, listener: SharedDataListener);

    /// Remove `listener` (matched by identity) from `path`.
    fn unsubscribe_data_changes(&self, path: &str, listener: &SharedDataListener);
}

pub type SharedWatchService = Arc<dyn WatchService>;

/// Parameters used to open the watch-service connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectParams {
    pub host: String,
    pub session_timeout: Duration,
    pub connect_timeout: Duration,
}

/// Opens connections to a watch service.
pub trait WatchConnector {
    fn connect(&self, params: &ConnectParams) -> Result<SharedWatchService, WatchError>;
}

/// Identity comparison for listeners behind trait objects.
pub(crate) fn same_listener<T: ?Sized>(a: &Arc<T>, b: &Arc<T>) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}
