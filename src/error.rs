use thiserror::Error;

/// Errors returned by [`RemoteConfig`](crate::config::RemoteConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Write and delete operations are never supported by this client.
    #[error("operation not supported: {0}")]
    Unsupported(&'static str),

    #[error("watch service error")]
    Watch(#[from] WatchError),

    /// The fetch worker pool could not be started.
    #[error("failed to start fetch worker pool")]
    WorkerPool(#[source] std::io::Error),

    #[error("invalid client settings")]
    Settings(#[from] SettingsError),

    #[error("data provider could not be created")]
    Provider(#[from] DataProviderError),
}

/// Failures reported by a [`WatchService`](crate::watch::WatchService).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WatchError {
    #[error("connection to '{host}' lost or refused: {reason}")]
    ConnectionLoss { host: String, reason: String },

    #[error("authentication with scheme '{scheme}' rejected")]
    AuthFailed { scheme: String },

    #[error("node '{0}' does not exist")]
    NoNode(String),

    #[error("node '{0}' already exists")]
    NodeExists(String),

    #[error("'{0}' is not a valid node path")]
    InvalidPath(String),
}

/// Failures of a single remote fetch. These never reach the caller of a read;
/// they are logged and degrade to "value not found".
#[derive(Debug, Error)]
pub enum DataProviderError {
    #[error("invalid request url: {0}")]
    InvalidUrl(String),

    #[error("http transport failure")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("remote service answered with status {0}")]
    Status(u16),
}

/// Payload bytes that the configured codec could not turn into text.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("payload is not valid utf-8")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("payload does not match the codec format")]
    Format(#[source] Box<dyn std::error::Error + Send + Sync>),
}

#[cfg(feature = "http")]
impl From<reqwest::Error> for DataProviderError {
    fn from(err: reqwest::Error) -> Self {
        DataProviderError::Transport(Box::new(err))
    }
}

#[cfg(feature = "json")]
impl From<serde_json::Error> for CodecError {
    fn from(err: serde_json::Error) -> Self {
        CodecError::Format(Box::new(err))
    }
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings file '{path}'")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse settings")]
    Parse(#[from] toml::de::Error),

    #[error("option '{option}' is invalid: {reason}")]
    Invalid { option: &'static str, reason: String },
}
