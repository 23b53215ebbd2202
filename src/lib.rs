#![cfg_attr(docsrs, feature(doc_auto_cfg))]
//! Read-only client for a remote configuration service.
//!
//! Values are fetched on demand over HTTP with a deadline and a default, and
//! live changes arrive through a ZooKeeper-style watch service. Listeners
//! receive decoded [`ChangeEvent`](listener::ChangeEvent)s synchronously on
//! the watch thread.
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use disconf_client::config::RemoteConfig;
//! use disconf_client::listener::{ChangeEvent, SharedListener};
//! use disconf_client::settings::ClientSettings;
//! use disconf_client::watch::memory::MemoryWatchService;
//!
//! # fn main() -> Result<(), disconf_client::error::ConfigError> {
//! let watch = Arc::new(MemoryWatchService::new());
//! let config = RemoteConfig::connect(ClientSettings::default(), &watch)?;
//!
//! let mapping = config.get_latest_config("service.vgroupMapping", "default", Duration::from_secs(3));
//! println!("mapping: {mapping}");
//!
//! let listener: SharedListener = Arc::new(|event: ChangeEvent| println!("{event:?}"));
//! config.add_config_listener("service.vgroupMapping", listener)?;
//! # Ok(())
//! # }
//! ```

/// Remote config client and its builder
pub mod config;
/// Data providers for the fetch worker pool.
/// The public trait allows custom implementations.
pub mod data_providers;
/// Blocking read to worker pool bridge
pub mod bridge;
/// Payload codecs and the registry resolving the `serializer` option
pub mod codec;
/// Single-assignment slot with a bounded wait
pub mod completion;
/// Error types
pub mod error;
/// Change events, caller listeners and the registry binding them to the watch service
pub mod listener;
/// Local values consulted before any remote fetch
pub mod overrides;
/// Property-file parsing
pub mod properties;
/// Client settings loaded from TOML
pub mod settings;
/// Watch service interfaces, connection bootstrap and an in-memory tree
pub mod watch;
