use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::{Builder, Handle, Runtime};
use tokio::sync::Semaphore;
use tracing::{debug, error, warn};

use crate::completion::CompletionCell;
use crate::data_providers::data_provider::DataProvider;
use crate::overrides::OverrideSource;

pub const WORKER_THREAD_NAME: &str = "disconf-config-executor";

/// Turns a blocking, deadline-bounded read into a fetch on a small dedicated
/// worker pool.
///
/// The caller's thread is the only one that waits; worker threads never block
/// on caller state. A fetch that outlives its caller keeps running and its
/// result is dropped.
pub struct FetchBridge<P: DataProvider> {
    provider: Arc<P>,
    overrides: Arc<dyn OverrideSource>,
    permits: Arc<Semaphore>,
    handle: Handle,
    runtime: Option<Runtime>,
}

impl<P: DataProvider> FetchBridge<P> {
    /// Start `workers` threads. At most `max_pending` fetches may be queued or
    /// running at any time.
    pub fn new(
        provider: P,
        overrides: Arc<dyn OverrideSource>,
        workers: usize,
        max_pending: usize,
    ) -> std::io::Result<Self> {
        let runtime = Builder::new_multi_thread()
            .worker_threads(workers.max(1))
            .thread_name(WORKER_THREAD_NAME)
            .enable_all()
            .build()?;
        Ok(FetchBridge {
            provider: Arc::new(provider),
            overrides,
            permits: Arc::new(Semaphore::new(max_pending.max(1))),
            handle: runtime.handle().clone(),
            runtime: Some(runtime),
        })
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Read `key`, waiting at most `timeout` for the remote value.
    ///
    /// A local override short-circuits the fetch. A missing remote value, a
    /// failed fetch, a saturated pool and an elapsed deadline all yield
    /// `default_value`.
    pub fn read(&self, key: &str, default_value: &str, timeout: Duration) -> String {
        if let Some(value) = self.overrides.lookup(key) {
            debug!(key, "using local override");
            return value;
        }

        let Ok(permit) = self.permits.clone().try_acquire_owned() else {
            warn!(key, "fetch worker pool saturated, returning default");
            return default_value.to_string();
        };

        let cell = Arc::new(CompletionCell::new());
        let writer = cell.clone();
        let provider = self.provider.clone();
        let task_key = key.to_string();
        self.handle.spawn(async move {
            let _permit = permit;
            let value = match provider.load_value(&task_key).await {
                Ok(value) => value,
                Err(err) => {
                    error!(key = %task_key, error = %err, "remote fetch failed");
                    None
                }
            };
            if !writer.complete(value) {
                debug!(key = %task_key, "fetch finished after the reader gave up");
            }
        });

        match cell.wait_timeout(timeout) {
            Some(Some(value)) => value,
            Some(None) => default_value.to_string(),
            None => {
                debug!(key, ?timeout, "remote fetch timed out, returning default");
                default_value.to_string()
            }
        }
    }
}

impl<P: DataProvider> Drop for FetchBridge<P> {
    fn drop(&mut self) {
        // In-flight fetches are abandoned; nobody waits for them any more.
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Instant;

    use super::*;
    use crate::error::DataProviderError;
    use crate::overrides::NoOverrides;

    /// Answers from a map after an optional delay, counting every call.
    struct Scripted {
        values: HashMap<&'static str, &'static str>,
        delay: Duration,
        calls: Arc<AtomicUsize>,
        completed: Arc<AtomicUsize>,
    }

    impl Scripted {
        fn new(values: &[(&'static str, &'static str)], delay: Duration) -> Self {
            Scripted {
                values: values.iter().copied().collect(),
                delay,
                calls: Arc::new(AtomicUsize::new(0)),
                completed: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    impl DataProvider for Scripted {
        async fn load_value(&self, key: &str) -> Result<Option<String>, DataProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.completed.fetch_add(1, Ordering::SeqCst);
            if key == "broken" {
                return Err(DataProviderError::Status(503));
            }
            Ok(self.values.get(key).map(|v| v.to_string()))
        }
    }

    fn bridge(provider: Scripted, overrides: Arc<dyn OverrideSource>) -> FetchBridge<Scripted> {
        FetchBridge::new(provider, overrides, 2, 8).unwrap()
    }

    #[test]
    fn returns_remote_value() {
        let bridge = bridge(Scripted::new(&[("k", "remote")], Duration::ZERO), Arc::new(NoOverrides));
        assert_eq!(bridge.read("k", "default", Duration::from_secs(5)), "remote");
    }

    #[test]
    fn absent_and_failed_fetches_yield_default_without_waiting() {
        let bridge = bridge(Scripted::new(&[], Duration::ZERO), Arc::new(NoOverrides));
        let started = Instant::now();
        assert_eq!(bridge.read("missing", "default", Duration::from_secs(5)), "default");
        assert_eq!(bridge.read("broken", "fallback", Duration::from_secs(5)), "fallback");
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn deadline_returns_default_and_fetch_keeps_running() {
        let provider = Scripted::new(&[("slow", "late")], Duration::from_millis(300));
        let completed = provider.completed.clone();
        let bridge = bridge(provider, Arc::new(NoOverrides));

        let started = Instant::now();
        assert_eq!(bridge.read("slow", "default", Duration::from_millis(30)), "default");
        assert!(started.elapsed() < Duration::from_millis(300));

        let deadline = Instant::now() + Duration::from_secs(5);
        while completed.load(Ordering::SeqCst) == 0 && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(10));
        }
        assert_eq!(completed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn override_skips_the_provider() {
        let provider = Scripted::new(&[("k", "remote")], Duration::ZERO);
        let calls = provider.calls.clone();
        let overrides = HashMap::from([("k".to_string(), "local".to_string())]);
        let bridge = bridge(provider, Arc::new(overrides));

        assert_eq!(bridge.read("k", "default", Duration::from_secs(1)), "local");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn saturated_pool_returns_default_immediately() {
        let provider = Scripted::new(&[("slow", "late")], Duration::from_millis(500));
        let calls = provider.calls.clone();
        let bridge = FetchBridge::new(provider, Arc::new(NoOverrides), 1, 1).unwrap();

        assert_eq!(bridge.read("slow", "first", Duration::from_millis(10)), "first");
        let started = Instant::now();
        assert_eq!(bridge.read("slow", "second", Duration::from_secs(5)), "second");
        assert!(started.elapsed() < Duration::from_secs(1));
        assert!(calls.load(Ordering::SeqCst) <= 1);
    }

    #[test]
    fn concurrent_readers_each_get_their_value() {
        let bridge = Arc::new(bridge(
            Scripted::new(&[("a", "1"), ("b", "2"), ("c", "3")], Duration::from_millis(5)),
            Arc::new(NoOverrides),
        ));
        let handles: Vec<_> = ["a", "b", "c", "a", "b", "c"]
            .into_iter()
            .map(|key| {
                let bridge = bridge.clone();
                std::thread::spawn(move || (key, bridge.read(key, "none", Duration::from_secs(5))))
            })
            .collect();
        for handle in handles {
            let (key, value) = handle.join().unwrap();
            let expected = match key {
                "a" => "1",
                "b" => "2",
                _ => "3",
            };
            assert_eq!(value, expected);
        }
    }
}
