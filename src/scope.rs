//! Stand-in for the embedding test framework's per-test sink: current name,
//! a failure flag, cleanup registration, and a formatted log. Setup and the
//! Reaper are built against this concrete type so they're runnable and
//! testable on their own, without an embedding framework.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use tracing::info;

type Teardown = Pin<Box<dyn Future<Output = ()> + Send>>;

/// A single test's identity, failure flag, and deferred cleanup.
///
/// Rust has no async destructors, so unlike the originating framework's
/// implicit per-test teardown hook, callers must explicitly invoke
/// [`TestScope::run_cleanup`] (typically from a `#[tokio::test]`'s tail, or
/// from an async drop-guard wrapper around the test body).
pub struct TestScope {
    name: String,
    failed: AtomicBool,
    cleanup: Mutex<Option<Teardown>>,
}

impl TestScope {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            failed: AtomicBool::new(false),
            cleanup: Mutex::new(None),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn failed(&self) -> bool {
        self.failed.load(Ordering::SeqCst)
    }

    /// Marks the test as failed. Idempotent.
    pub fn mark_failed(&self) {
        self.failed.store(true, Ordering::SeqCst);
    }

    /// Registers the teardown to run once. Overwrites any previously
    /// registered cleanup, matching a single scoped-teardown-per-test model.
    pub fn register_cleanup<F>(&self, cleanup: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        *self.cleanup.lock().unwrap() = Some(Box::pin(cleanup));
    }

    /// Runs the registered cleanup, if any, exactly once.
    pub async fn run_cleanup(&self) {
        let cleanup = self.cleanup.lock().unwrap().take();
        if let Some(cleanup) = cleanup {
            cleanup.await;
        }
    }

    /// Formats and emits a log line annotated with the test name.
    pub fn log(&self, message: impl AsRef<str>) {
        info!(test = %self.name, "{}", message.as_ref());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn cleanup_runs_exactly_once() {
        let scope = TestScope::new("TestAlpha");
        let ran = std::sync::Arc::new(AtomicBool::new(false));
        let ran_clone = ran.clone();
        scope.register_cleanup(async move {
            ran_clone.store(true, Ordering::SeqCst);
        });
        scope.run_cleanup().await;
        assert!(ran.load(Ordering::SeqCst));
        // Second call is a no-op since the cleanup was taken.
        scope.run_cleanup().await;
    }

    #[test]
    fn failure_flag_defaults_false() {
        let scope = TestScope::new("TestBeta");
        assert!(!scope.failed());
        scope.mark_failed();
        assert!(scope.failed());
    }
}
