use std::future::Future;

use crate::error::DataProviderError;

/// Source of configuration values for the fetch worker pool.
///
/// `Ok(None)` means the key is not present remotely. Errors are logged by the
/// caller and treated the same way.
pub trait DataProvider: Send + Sync + 'static {
    /// Load the current value of `key`.
    fn load_value(
        &self,
        key: &str,
    ) -> impl Future<Output = Result<Option<String>, DataProviderError>> + Send;
}
