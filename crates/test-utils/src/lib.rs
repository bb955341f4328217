//! Shared scaffolding for the snag crates' tests.
use std::sync::Arc;
use std::sync::Once;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use futures::future::join_all;
use snag_error::{ErrorPolicy, Fault, LevelExt, Severity};
use tokio::task::JoinHandle;
use tracing_subscriber::{EnvFilter, fmt};

pub type FaultResult<T> = Result<T, Arc<Fault>>;

static TEST_TRACING: Once = Once::new();

/// Install a stderr subscriber once per test binary. `RUST_LOG` wins over
/// `level` when set.
pub fn init_test_tracing(level: tracing::Level) {
    TEST_TRACING.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(format!("snag_error={level},snag_store={level}")));
        let _ = fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(true)
            .without_time()
            .compact()
            .try_init();
    });
}

/// A task that yields once and then fails with an untagged fault.
pub fn failing_task(message: &'static str) -> JoinHandle<FaultResult<()>> {
    tokio::spawn(async move {
        tokio::task::yield_now().await;
        Err(Arc::new(Fault::new(message)))
    })
}

/// Like [`failing_task`], with the fault tagged before it leaves the task.
pub fn failing_task_tagged(message: &'static str, level: Severity) -> JoinHandle<FaultResult<()>> {
    tokio::spawn(async move {
        tokio::task::yield_now().await;
        Err(Arc::new(Fault::new(message).tag_as_level(level, true)))
    })
}

/// A long sleep that has already been aborted.
pub fn cancelled_task() -> JoinHandle<FaultResult<()>> {
    let handle = tokio::spawn(async {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Ok(())
    });
    handle.abort();
    handle
}

/// Wait for every task, then fail with one composite fault holding every
/// failure if any task failed. Join errors become faults of their own
/// (cancellations stay cancellations).
pub async fn wait_all<T>(handles: Vec<JoinHandle<FaultResult<T>>>) -> FaultResult<Vec<T>> {
    let mut values = Vec::with_capacity(handles.len());
    let mut failures = Vec::new();
    for joined in join_all(handles).await {
        match joined {
            Ok(Ok(value)) => values.push(value),
            Ok(Err(fault)) => failures.push(fault),
            Err(join_error) => failures.push(Arc::new(Fault::from_join_error(join_error))),
        }
    }
    if failures.is_empty() {
        Ok(values)
    } else {
        Err(Arc::new(Fault::aggregate(failures)))
    }
}

/// Counts how many times it was handed a fault.
#[derive(Debug, Default)]
pub struct CountingPolicy {
    emitted: AtomicUsize,
}

impl CountingPolicy {
    pub fn count(&self) -> usize {
        self.emitted.load(Ordering::SeqCst)
    }
}

impl ErrorPolicy for CountingPolicy {
    fn classify(&self, fault: &Fault) -> Option<Severity> {
        fault.try_get_level()
    }

    fn emit(&self, _fault: &Fault) {
        self.emitted.fetch_add(1, Ordering::SeqCst);
    }
}
