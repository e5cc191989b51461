//! Bounded fan-out/fan-in for pipeline stages.
//!
//! Every stage spawns one task per logical item. Each task waits for a permit
//! from its pool's semaphore, runs, and releases the permit when it finishes,
//! whether it succeeded or not. [`StagePool::run_all`] returns only after every
//! spawned task has completed, which makes each stage a barrier.

use std::future::Future;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, error};

/// Result of one unit of work, tagged with the key it ran for
#[derive(Debug)]
pub struct UnitOutcome<T> {
    pub key: String,
    pub result: Result<T>,
}

/// Fixed-capacity admission gate shared by all units of a stage
#[derive(Debug, Clone)]
pub struct StagePool {
    name: &'static str,
    capacity: usize,
    permits: Arc<Semaphore>,
}

impl StagePool {
    pub fn new(name: &'static str, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            name,
            capacity,
            permits: Arc::new(Semaphore::new(capacity)),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Run `unit` once per item and wait for all of them.
    ///
    /// Outcomes are returned in input order. A failing or panicking unit never
    /// affects its siblings.
    pub async fn run_all<I, F, Fut, T>(&self, items: Vec<(String, I)>, unit: F) -> Vec<UnitOutcome<T>>
    where
        I: Send + 'static,
        F: Fn(I) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
        T: Send + 'static,
    {
        debug!(pool = self.name, units = items.len(), capacity = self.capacity, "Dispatch stage units");

        let unit = Arc::new(unit);
        let mut handles: Vec<(String, JoinHandle<Result<T>>)> = Vec::with_capacity(items.len());

        for (key, input) in items {
            let permits = Arc::clone(&self.permits);
            let unit = Arc::clone(&unit);

            let handle = tokio::spawn(async move {
                let _permit = permits
                    .acquire_owned()
                    .await
                    .map_err(|_| anyhow!("Stage pool closed"))?;
                unit(input).await
            });

            handles.push((key, handle));
        }

        let mut outcomes = Vec::with_capacity(handles.len());
        for (key, handle) in handles {
            let result = match handle.await {
                Ok(result) => result,
                Err(join_error) => Err(anyhow!("Unit task failed in {} pool: {}", self.name, join_error)),
            };
            outcomes.push(UnitOutcome { key, result });
        }

        outcomes
    }
}

/// The two independent gates: network-bound and local work
#[derive(Debug, Clone)]
pub struct Pools {
    /// Playlist downloads and metadata lookups
    pub fetch: StagePool,

    /// Parsing, merging and file writes
    pub work: StagePool,
}

impl Pools {
    pub fn new(fetch_capacity: usize, work_capacity: usize) -> Self {
        Self {
            fetch: StagePool::new("fetch", fetch_capacity),
            work: StagePool::new("work", work_capacity),
        }
    }
}

/// Log failed units with their key and keep the successful values
pub fn collect_successes<T>(stage: &str, outcomes: Vec<UnitOutcome<T>>) -> (Vec<(String, T)>, usize) {
    let mut successes = Vec::with_capacity(outcomes.len());
    let mut failures = 0;

    for outcome in outcomes {
        match outcome.result {
            Ok(value) => successes.push((outcome.key, value)),
            Err(e) => {
                failures += 1;
                error!(stage, key = %outcome.key, error = %format!("{:#}", e), "Unit failed");
            }
        }
    }

    (successes, failures)
}
