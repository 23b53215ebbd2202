use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::SettingsError;

/// Options consumed by the connection bootstrap, the remote fetcher and the
/// fetch worker pool.
///
/// Option names follow the remote service's own naming (`serverAddr`,
/// `zkHost`, ...). Every option has a default, so an empty document is valid.
/// Timeouts are expressed in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ClientSettings {
    pub server_addr: String,
    pub app: String,
    pub version: String,
    pub env: String,
    pub config_file: String,
    pub zk_host: String,
    pub zk_session_timeout: u64,
    pub zk_connect_timeout: u64,
    pub zk_username: String,
    pub zk_password: String,
    /// Name of the payload codec registered in the
    /// [`CodecRegistry`](crate::codec::CodecRegistry). Unset selects the default.
    pub serializer: Option<String>,
    /// Root namespace node of the watch tree.
    pub root_path: String,
    pub fetch_workers: usize,
    /// Upper bound on fetches queued or running at once. Reads beyond it
    /// return their default immediately.
    pub max_pending_fetches: usize,
    pub http_connect_timeout: u64,
    pub http_read_timeout: u64,
    /// Timeout used by [`RemoteConfig::get_config`](crate::config::RemoteConfig::get_config).
    pub default_timeout: u64,
}

impl Default for ClientSettings {
    fn default() -> Self {
        ClientSettings {
            server_addr: "127.0.0.1:8014".to_string(),
            app: "seata-server".to_string(),
            version: "1_0_0".to_string(),
            env: "rd".to_string(),
            config_file: "config.txt".to_string(),
            zk_host: "localhost:2181".to_string(),
            zk_session_timeout: 6000,
            zk_connect_timeout: 2000,
            zk_username: String::new(),
            zk_password: String::new(),
            serializer: None,
            root_path: "/disconf".to_string(),
            fetch_workers: 2,
            max_pending_fetches: 64,
            http_connect_timeout: 35_000,
            http_read_timeout: 60_000,
            default_timeout: 5_000,
        }
    }
}

#[derive(Deserialize)]
struct Nested {
    config: NestedConfig,
}

#[derive(Deserialize)]
struct NestedConfig {
    disconf: ClientSettings,
}

impl ClientSettings {
    /// Parse settings from TOML. Both a flat document and one nested under
    /// `[config.disconf]` are accepted.
    pub fn from_toml_str(source: &str) -> Result<Self, SettingsError> {
        let document: toml::Value = toml::from_str(source)?;
        let settings = if document.get("config").is_some() {
            document.try_into::<Nested>()?.config.disconf
        } else {
            document.try_into::<ClientSettings>()?
        };
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.fetch_workers == 0 {
            return Err(SettingsError::Invalid {
                option: "fetchWorkers",
                reason: "at least one worker is required".to_string(),
            });
        }
        if self.max_pending_fetches == 0 {
            return Err(SettingsError::Invalid {
                option: "maxPendingFetches",
                reason: "must be greater than zero".to_string(),
            });
        }
        if !self.root_path.starts_with('/') || self.root_path.len() < 2 {
            return Err(SettingsError::Invalid {
                option: "rootPath",
                reason: format!("'{}' is not an absolute node path", self.root_path),
            });
        }
        Ok(())
    }

    /// Digest credentials, present only when both username and password are non-blank.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        let username = self.zk_username.trim();
        let password = self.zk_password.trim();
        if username.is_empty() || password.is_empty() {
            None
        } else {
            Some((self.zk_username.as_str(), self.zk_password.as_str()))
        }
    }

    pub fn session_timeout(&self) -> Duration {
        Duration::from_millis(self.zk_session_timeout)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.zk_connect_timeout)
    }

    pub fn http_connect_timeout(&self) -> Duration {
        Duration::from_millis(self.http_connect_timeout)
    }

    pub fn http_read_timeout(&self) -> Duration {
        Duration::from_millis(self.http_read_timeout)
    }

    pub fn default_timeout(&self) -> Duration {
        Duration::from_millis(self.default_timeout)
    }

    /// Watched node holding the configuration file: `/{root}/{app}_{version}_{env}/file/{configFile}`.
    pub fn watch_path(&self) -> String {
        format!(
            "{}/{}_{}_{}/file/{}",
            self.root_path.trim_end_matches('/'),
            self.app,
            self.version,
            self.env,
            self.config_file
        )
    }
}
