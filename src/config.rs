use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::bridge::FetchBridge;
use crate::codec::CodecRegistry;
use crate::data_providers::data_provider::DataProvider;
use crate::error::ConfigError;
use crate::listener::registry::ListenerRegistry;
use crate::listener::SharedListener;
use crate::overrides::{EnvOverrides, OverrideSource};
use crate::settings::ClientSettings;
use crate::watch::bootstrap::bootstrap;
use crate::watch::WatchConnector;

pub const CONFIG_TYPE: &str = "disconf";

/// Read-only remote configuration client.
///
/// Values are read on demand from the remote service through a small worker
/// pool, with a caller-supplied deadline and default. Changes are pushed by
/// the watch service to registered [`ConfigChangeListener`](crate::listener::ConfigChangeListener)s.
/// Writes are rejected with [`ConfigError::Unsupported`].
///
/// Construct one instance at startup with [`RemoteConfigBuilder`] and share
/// it by reference or `Arc`.
pub struct RemoteConfig<P: DataProvider> {
    settings: ClientSettings,
    bridge: FetchBridge<P>,
    registry: ListenerRegistry,
}

impl<P: DataProvider> RemoteConfig<P> {
    pub fn type_name(&self) -> &'static str {
        CONFIG_TYPE
    }

    pub fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    pub fn data_provider(&self) -> &P {
        self.bridge.provider()
    }

    /// Latest value of `key`, or `default_value` if it is missing remotely,
    /// the fetch fails, or it does not complete within `timeout`.
    pub fn get_latest_config(&self, key: &str, default_value: &str, timeout: Duration) -> String {
        self.bridge.read(key, default_value, timeout)
    }

    /// [`get_latest_config`](Self::get_latest_config) with the configured `defaultTimeout`.
    pub fn get_config(&self, key: &str, default_value: &str) -> String {
        self.get_latest_config(key, default_value, self.settings.default_timeout())
    }

    /// Read `key` and parse it, falling back to `default_value` when the value
    /// is missing or does not parse.
    pub fn get_config_parsed<T>(&self, key: &str, default_value: T) -> T
    where
        T: FromStr,
    {
        let raw = self.get_config(key, "");
        if raw.is_empty() {
            return default_value;
        }
        match raw.trim().parse() {
            Ok(value) => value,
            Err(_) => {
                warn!(key, value = %raw, "config value could not be parsed, using default");
                default_value
            }
        }
    }

    pub fn put_config(&self, _key: &str, _content: &str, _timeout: Duration) -> Result<bool, ConfigError> {
        Err(ConfigError::Unsupported("putConfig"))
    }

    pub fn put_config_if_absent(
        &self,
        _key: &str,
        _content: &str,
        _timeout: Duration,
    ) -> Result<bool, ConfigError> {
        Err(ConfigError::Unsupported("putConfigIfAbsent"))
    }

    pub fn remove_config(&self, _key: &str, _timeout: Duration) -> Result<bool, ConfigError> {
        Err(ConfigError::Unsupported("removeConfig"))
    }

    pub fn add_config_listener(&self, key: &str, listener: SharedListener) -> Result<(), ConfigError> {
        Ok(self.registry.add(key, listener)?)
    }

    pub fn remove_config_listener(&self, key: &str, listener: &SharedListener) -> Result<(), ConfigError> {
        Ok(self.registry.remove(key, listener)?)
    }

    /// Listeners registered for `key`; `None` if none ever were.
    pub fn get_config_listeners(&self, key: &str) -> Option<Vec<SharedListener>> {
        self.registry.listeners(key)
    }
}

#[cfg(feature = "http")]
impl RemoteConfig<crate::data_providers::http::HttpDataProvider> {
    /// Client reading from the HTTP service described by `settings`, with
    /// process environment overrides and the built-in codecs.
    pub fn connect(settings: ClientSettings, connector: &dyn WatchConnector) -> Result<Self, ConfigError> {
        let provider = crate::data_providers::http::HttpDataProvider::from_settings(&settings)?;
        RemoteConfigBuilder::new(settings).build(provider, connector)
    }
}

/// Assembles a [`RemoteConfig`]: connection bootstrap, codec resolution and
/// worker pool start-up.
pub struct RemoteConfigBuilder {
    settings: ClientSettings,
    overrides: Arc<dyn OverrideSource>,
    codecs: CodecRegistry,
}

impl RemoteConfigBuilder {
    pub fn new(settings: ClientSettings) -> Self {
        RemoteConfigBuilder {
            settings,
            overrides: Arc::new(EnvOverrides),
            codecs: CodecRegistry::default(),
        }
    }

    /// Source consulted before any remote fetch. Defaults to the process environment.
    pub fn overrides(mut self, overrides: impl OverrideSource + 'static) -> Self {
        self.overrides = Arc::new(overrides);
        self
    }

    /// Registry the `serializer` option is resolved against.
    pub fn codecs(mut self, codecs: CodecRegistry) -> Self {
        self.codecs = codecs;
        self
    }

    /// Connect to the watch service and start the worker pool. Any failure is
    /// fatal: no client is returned.
    pub fn build<P: DataProvider>(
        self,
        provider: P,
        connector: &dyn WatchConnector,
    ) -> Result<RemoteConfig<P>, ConfigError> {
        let settings = self.settings;
        settings.validate()?;

        let watch = bootstrap(connector, &settings)?;
        let codec = self.codecs.resolve(settings.serializer.as_deref());
        let registry = ListenerRegistry::new(watch, settings.watch_path(), codec);
        let bridge = FetchBridge::new(
            provider,
            self.overrides,
            settings.fetch_workers,
            settings.max_pending_fetches,
        )
        .map_err(ConfigError::WorkerPool)?;

        info!(
            app = %settings.app,
            env = %settings.env,
            version = %settings.version,
            path = %registry.path(),
            "remote config client ready"
        );
        Ok(RemoteConfig {
            settings,
            bridge,
            registry,
        })
    }
}
