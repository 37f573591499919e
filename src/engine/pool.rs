use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use crate::engine::CancellationFlag;
use crate::error::AnalysisError;

pub const DEFAULT_BATCH_SIZE: usize = 100;

/// How an analyzer schedules its units of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ExecutionStrategy {
    /// One unit at a time on the caller's task.
    Sequential,
    /// A fixed number of workers draining a bounded queue.
    WorkerPool { workers: usize, batch_size: usize },
}

impl ExecutionStrategy {
    /// Pool sized to the machine's available parallelism.
    pub fn worker_pool() -> Self {
        ExecutionStrategy::WorkerPool {
            workers: num_cpus::get().max(1),
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    pub fn workers(&self) -> usize {
        match self {
            ExecutionStrategy::Sequential => 1,
            ExecutionStrategy::WorkerPool { workers, .. } => (*workers).max(1),
        }
    }

    pub fn batch_size(&self) -> usize {
        match self {
            ExecutionStrategy::Sequential => DEFAULT_BATCH_SIZE,
            ExecutionStrategy::WorkerPool { batch_size, .. } => (*batch_size).max(1),
        }
    }
}

/// One schedulable piece of work, labelled for logging.
pub struct WorkUnit<W> {
    pub label: String,
    pub payload: W,
}

impl<W> WorkUnit<W> {
    pub fn new(label: impl Into<String>, payload: W) -> Self {
        WorkUnit {
            label: label.into(),
            payload,
        }
    }
}

/// Shared result vector. The lock is held only while a finished unit's
/// output is appended.
#[derive(Debug)]
pub struct Accumulator<T> {
    items: Arc<Mutex<Vec<T>>>,
}

impl<T> Clone for Accumulator<T> {
    fn clone(&self) -> Self {
        Accumulator {
            items: self.items.clone(),
        }
    }
}

impl<T> Default for Accumulator<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Accumulator<T> {
    pub fn new() -> Self {
        Accumulator {
            items: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn append(&self, batch: Vec<T>) {
        if batch.is_empty() {
            return;
        }
        let mut items = self.items.lock().unwrap_or_else(PoisonError::into_inner);
        items.extend(batch);
    }

    pub fn len(&self) -> usize {
        self.items.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drain everything collected so far.
    pub fn take(&self) -> Vec<T> {
        let mut items = self.items.lock().unwrap_or_else(PoisonError::into_inner);
        std::mem::take(&mut *items)
    }
}

/// What happened to the units handed to a pool run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PoolOutcome {
    pub completed: usize,
    pub failed: Vec<String>,
    pub skipped: usize,
}

impl PoolOutcome {
    pub fn merge(&mut self, other: PoolOutcome) {
        self.completed += other.completed;
        self.failed.extend(other.failed);
        self.skipped += other.skipped;
    }

    pub fn is_clean(&self) -> bool {
        self.failed.is_empty() && self.skipped == 0
    }
}

/// Runs units of work under an [`ExecutionStrategy`], isolating failures per
/// unit. `run` resolves only after every submitted unit has finished.
#[derive(Debug, Clone)]
pub struct WorkerPool {
    strategy: ExecutionStrategy,
    cancel: CancellationFlag,
}

impl WorkerPool {
    pub fn new(strategy: ExecutionStrategy, cancel: CancellationFlag) -> Self {
        WorkerPool { strategy, cancel }
    }

    pub fn strategy(&self) -> ExecutionStrategy {
        self.strategy
    }

    pub async fn run<W, T, F>(
        &self,
        stage: &str,
        units: Vec<WorkUnit<W>>,
        accumulator: &Accumulator<T>,
        job: F,
    ) -> PoolOutcome
    where
        W: Send + 'static,
        T: Send + 'static,
        F: Fn(W) -> anyhow::Result<Vec<T>> + Send + Sync + 'static,
    {
        let job = Arc::new(job);
        let outcome = match self.strategy {
            ExecutionStrategy::Sequential => {
                self.run_sequential(stage, units, accumulator, job).await
            }
            ExecutionStrategy::WorkerPool { workers, .. } => {
                self.run_pooled(stage, workers.max(1), units, accumulator, job).await
            }
        };

        debug!(
            "{}: {} unit(s) completed, {} failed, {} skipped",
            stage,
            outcome.completed,
            outcome.failed.len(),
            outcome.skipped
        );
        outcome
    }

    async fn run_sequential<W, T, F>(
        &self,
        stage: &str,
        units: Vec<WorkUnit<W>>,
        accumulator: &Accumulator<T>,
        job: Arc<F>,
    ) -> PoolOutcome
    where
        W: Send + 'static,
        T: Send + 'static,
        F: Fn(W) -> anyhow::Result<Vec<T>> + Send + Sync + 'static,
    {
        let mut outcome = PoolOutcome::default();
        let total = units.len();

        for (done, unit) in units.into_iter().enumerate() {
            if self.cancel.is_cancelled() {
                outcome.skipped += total - done;
                break;
            }
            match execute_unit(stage, unit, accumulator, job.clone()).await {
                None => outcome.completed += 1,
                Some(label) => outcome.failed.push(label),
            }
        }

        outcome
    }

    async fn run_pooled<W, T, F>(
        &self,
        stage: &str,
        workers: usize,
        units: Vec<WorkUnit<W>>,
        accumulator: &Accumulator<T>,
        job: Arc<F>,
    ) -> PoolOutcome
    where
        W: Send + 'static,
        T: Send + 'static,
        F: Fn(W) -> anyhow::Result<Vec<T>> + Send + Sync + 'static,
    {
        let mut outcome = PoolOutcome::default();
        if units.is_empty() {
            return outcome;
        }

        // Bounded queue: the producer waits whenever every slot is taken.
        let (tx, rx) = mpsc::channel::<WorkUnit<W>>(workers);
        let rx = Arc::new(tokio::sync::Mutex::new(rx));
        let mut set = JoinSet::new();

        for _ in 0..workers.min(units.len()) {
            let rx = rx.clone();
            let accumulator = accumulator.clone();
            let job = job.clone();
            let cancel = self.cancel.clone();
            let stage = stage.to_string();

            set.spawn(async move {
                let mut local = PoolOutcome::default();
                loop {
                    let next = {
                        let mut queue = rx.lock().await;
                        queue.recv().await
                    };
                    let Some(unit) = next else { break };

                    if cancel.is_cancelled() {
                        local.skipped += 1;
                        continue;
                    }
                    match execute_unit(&stage, unit, &accumulator, job.clone()).await {
                        None => local.completed += 1,
                        Some(label) => local.failed.push(label),
                    }
                }
                local
            });
        }

        let total = units.len();
        for (sent, unit) in units.into_iter().enumerate() {
            if self.cancel.is_cancelled() {
                outcome.skipped += total - sent;
                break;
            }
            if tx.send(unit).await.is_err() {
                warn!("{}: all workers exited early", stage);
                outcome.skipped += total - sent;
                break;
            }
        }
        drop(tx);

        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(local) => outcome.merge(local),
                Err(e) => warn!("{}: worker aborted: {}", stage, e),
            }
        }

        outcome
    }
}

/// Run one unit on the blocking pool. Returns the unit's label on failure.
async fn execute_unit<W, T, F>(
    stage: &str,
    unit: WorkUnit<W>,
    accumulator: &Accumulator<T>,
    job: Arc<F>,
) -> Option<String>
where
    W: Send + 'static,
    T: Send + 'static,
    F: Fn(W) -> anyhow::Result<Vec<T>> + Send + Sync + 'static,
{
    let WorkUnit { label, payload } = unit;
    let started = Instant::now();

    let reason = match tokio::task::spawn_blocking(move || job(payload)).await {
        Ok(Ok(items)) => {
            debug!(
                "{}: '{}' produced {} item(s) in {:?}",
                stage,
                label,
                items.len(),
                started.elapsed()
            );
            accumulator.append(items);
            return None;
        }
        Ok(Err(e)) => format!("{:#}", e),
        Err(e) if e.is_panic() => "worker panicked".to_string(),
        Err(e) => e.to_string(),
    };

    let err = AnalysisError::Partition {
        stage: stage.to_string(),
        partition: label.clone(),
        reason,
    };
    warn!("{}", err);
    Some(label)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn units(labels: &[&str]) -> Vec<WorkUnit<String>> {
        labels.iter().map(|l| WorkUnit::new(*l, l.to_string())).collect()
    }

    fn pool(strategy: ExecutionStrategy) -> WorkerPool {
        WorkerPool::new(strategy, CancellationFlag::new())
    }

    #[tokio::test]
    async fn test_sequential_runs_every_unit() {
        let acc = Accumulator::new();
        let outcome = pool(ExecutionStrategy::Sequential)
            .run("test", units(&["a", "b", "c"]), &acc, |s: String| Ok(vec![s]))
            .await;

        assert_eq!(outcome.completed, 3);
        assert!(outcome.is_clean());
        let mut items = acc.take();
        items.sort();
        assert_eq!(items, vec!["a", "b", "c"]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_pool_isolates_failures() {
        let acc = Accumulator::new();
        let strategy = ExecutionStrategy::WorkerPool { workers: 2, batch_size: 10 };
        let outcome = pool(strategy)
            .run("test", units(&["aws", "bad", "gcp", "azure"]), &acc, |s: String| {
                if s == "bad" {
                    anyhow::bail!("malformed partition");
                }
                Ok(vec![s])
            })
            .await;

        assert_eq!(outcome.completed, 3);
        assert_eq!(outcome.failed, vec!["bad".to_string()]);
        assert_eq!(acc.len(), 3);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_pool_contains_panics() {
        let acc = Accumulator::new();
        let strategy = ExecutionStrategy::WorkerPool { workers: 3, batch_size: 10 };
        let outcome = pool(strategy)
            .run("test", units(&["ok", "boom"]), &acc, |s: String| {
                if s == "boom" {
                    panic!("unexpected configuration");
                }
                Ok(vec![s])
            })
            .await;

        assert_eq!(outcome.completed, 1);
        assert_eq!(outcome.failed, vec!["boom".to_string()]);
        assert_eq!(acc.take(), vec!["ok".to_string()]);
    }

    #[tokio::test]
    async fn test_cancelled_before_start_skips_everything() {
        let cancel = CancellationFlag::new();
        cancel.cancel();
        let acc: Accumulator<String> = Accumulator::new();

        for strategy in [ExecutionStrategy::Sequential, ExecutionStrategy::worker_pool()] {
            let outcome = WorkerPool::new(strategy, cancel.clone())
                .run("test", units(&["a", "b"]), &acc, |s: String| Ok(vec![s]))
                .await;
            assert_eq!(outcome.completed, 0);
            assert_eq!(outcome.skipped, 2);
        }
        assert!(acc.is_empty());
    }

    #[test]
    fn test_strategy_defaults() {
        let strategy = ExecutionStrategy::worker_pool();
        assert!(strategy.workers() >= 1);
        assert_eq!(strategy.batch_size(), DEFAULT_BATCH_SIZE);
        assert_eq!(ExecutionStrategy::Sequential.workers(), 1);
    }
}
