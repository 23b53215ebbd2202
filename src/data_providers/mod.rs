/// Common data provider code
pub mod data_provider;

/// Remote fetcher backed by the reqwest HTTP client
#[cfg(feature = "http")]
pub mod http;
