//! Bounded worker pool for connection jobs
//!
//! Jobs go onto an unbounded queue; a pool of worker tasks drains it. The
//! pool grows on demand up to `max` workers, so at most `max` jobs ever run at
//! once. Workers above the `core` count retire after sitting idle for
//! `idle_timeout`. A full pool is backpressure: the job waits in the queue
//! until a worker frees up.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error, warn};

/// How long a worker above the core count may sit idle before it exits.
pub const IDLE_TIMEOUT: Duration = Duration::from_secs(15);

pub type Job = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Sizing of the worker pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolPolicy {
    /// Workers kept alive even when idle.
    pub core: usize,
    /// Hard ceiling on simultaneously running jobs.
    pub max: usize,
    pub idle_timeout: Duration,
}

impl PoolPolicy {
    /// Core size is `min(max, 2 × CPUs)`.
    pub fn for_max_connections(max: usize) -> Self {
        let max = max.max(1);
        Self {
            core: max.min(num_cpus::get() * 2).max(1),
            max,
            idle_timeout: IDLE_TIMEOUT,
        }
    }
}

struct Shared {
    queue: Mutex<mpsc::UnboundedReceiver<Job>>,
    policy: PoolPolicy,
    workers: AtomicUsize,
    idle: AtomicUsize,
    active: AtomicUsize,
    queued: AtomicUsize,
}

impl Shared {
    /// Claims a worker slot if the pool is below its ceiling.
    fn reserve_worker(&self) -> bool {
        let mut current = self.workers.load(Ordering::SeqCst);
        loop {
            if current >= self.policy.max {
                return false;
            }
            match self.workers.compare_exchange(current, current + 1, Ordering::SeqCst, Ordering::SeqCst) {
                Ok(_) => return true,
                Err(actual) => current = actual,
            }
        }
    }

    /// Releases the caller's slot if the pool is above its core size.
    fn retire_worker(&self) -> bool {
        let mut current = self.workers.load(Ordering::SeqCst);
        loop {
            if current <= self.policy.core {
                return false;
            }
            match self.workers.compare_exchange(current, current - 1, Ordering::SeqCst, Ordering::SeqCst) {
                Ok(_) => return true,
                Err(actual) => current = actual,
            }
        }
    }
}

/// Owned, injectable worker pool. Dropping it closes the queue; jobs already
/// queued still run, then the workers exit.
pub struct Dispatcher {
    sender: mpsc::UnboundedSender<Job>,
    shared: Arc<Shared>,
}

impl Dispatcher {
    pub fn new(policy: PoolPolicy) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            sender,
            shared: Arc::new(Shared {
                queue: Mutex::new(receiver),
                policy,
                workers: AtomicUsize::new(0),
                idle: AtomicUsize::new(0),
                active: AtomicUsize::new(0),
                queued: AtomicUsize::new(0),
            }),
        }
    }

    /// Queues `job` and returns immediately. Must be called from within a
    /// tokio runtime.
    pub fn submit<F>(&self, job: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.shared.queued.fetch_add(1, Ordering::SeqCst);
        if self.sender.send(Box::pin(job)).is_err() {
            self.shared.queued.fetch_sub(1, Ordering::SeqCst);
            warn!("Dispatcher queue closed, dropping job");
            return;
        }

        grow_if_backlogged(&self.shared);
    }

    /// Sizing this dispatcher was built with.
    pub fn policy(&self) -> PoolPolicy {
        self.shared.policy
    }

    /// Jobs currently running.
    pub fn active(&self) -> usize {
        self.shared.active.load(Ordering::SeqCst)
    }

    /// Live worker tasks, busy or idle.
    pub fn workers(&self) -> usize {
        self.shared.workers.load(Ordering::SeqCst)
    }

    /// Jobs waiting for a worker.
    pub fn queued(&self) -> usize {
        self.shared.queued.load(Ordering::SeqCst)
    }

    /// Stops accepting jobs. Queued jobs still drain.
    pub fn shutdown(self) {
        debug!(queued = self.queued(), "Dispatcher shutting down");
    }
}

/// Starts another worker if more jobs are waiting than workers are idle and
/// the pool has room.
fn grow_if_backlogged(shared: &Arc<Shared>) {
    if shared.queued.load(Ordering::SeqCst) > shared.idle.load(Ordering::SeqCst) && shared.reserve_worker() {
        let workers = shared.workers.load(Ordering::SeqCst);
        debug!(workers = workers, "Spawning worker");
        tokio::spawn(worker_loop(Arc::clone(shared)));
    }
}

/// Retires the calling worker if the pool is above core size.
///
/// A job submitted while this worker still counted as idle spawned nobody,
/// so the backlog is re-checked once the slot is released.
fn try_retire(shared: &Arc<Shared>) -> bool {
    if !shared.retire_worker() {
        return false;
    }
    debug!("Idle worker retired");
    grow_if_backlogged(shared);
    true
}

async fn worker_loop(shared: Arc<Shared>) {
    loop {
        shared.idle.fetch_add(1, Ordering::SeqCst);
        let next = tokio::time::timeout(shared.policy.idle_timeout, async {
            shared.queue.lock().await.recv().await
        })
        .await;
        shared.idle.fetch_sub(1, Ordering::SeqCst);

        match next {
            Ok(Some(job)) => {
                shared.queued.fetch_sub(1, Ordering::SeqCst);
                shared.active.fetch_add(1, Ordering::SeqCst);

                // Separate task so a panicking job cannot take the worker down.
                if let Err(e) = tokio::spawn(job).await {
                    error!(error = %e, "Connection job panicked");
                }

                shared.active.fetch_sub(1, Ordering::SeqCst);
            }
            Ok(None) => break,
            Err(_) => {
                if try_retire(&shared) {
                    return;
                }
            }
        }
    }

    shared.workers.fetch_sub(1, Ordering::SeqCst);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_size_never_exceeds_max() {
        let policy = PoolPolicy::for_max_connections(1);
        assert_eq!(policy.core, 1);
        assert_eq!(policy.max, 1);

        let policy = PoolPolicy::for_max_connections(100_000);
        assert_eq!(policy.core, num_cpus::get() * 2);
        assert_eq!(policy.idle_timeout, IDLE_TIMEOUT);
    }

    #[test]
    fn zero_max_is_clamped_to_one() {
        assert_eq!(PoolPolicy::for_max_connections(0).max, 1);
    }

    #[tokio::test]
    async fn runs_submitted_job() {
        let dispatcher = Dispatcher::new(PoolPolicy::for_max_connections(4));
        let (tx, rx) = tokio::sync::oneshot::channel();

        dispatcher.submit(async move {
            let _ = tx.send(42);
        });

        assert_eq!(rx.await.unwrap(), 42);
        assert_eq!(dispatcher.policy().max, 4);
    }

    #[tokio::test]
    async fn job_submitted_while_worker_retires_still_runs() {
        let policy = PoolPolicy {
            core: 0,
            max: 1,
            idle_timeout: Duration::from_secs(15),
        };
        let dispatcher = Dispatcher::new(policy);
        let shared = Arc::clone(&dispatcher.shared);

        // A worker whose idle timeout has fired but has not yet left the
        // idle count.
        shared.workers.store(1, Ordering::SeqCst);
        shared.idle.store(1, Ordering::SeqCst);

        let (tx, rx) = tokio::sync::oneshot::channel();
        dispatcher.submit(async move {
            let _ = tx.send(());
        });
        assert_eq!(dispatcher.workers(), 1);

        shared.idle.fetch_sub(1, Ordering::SeqCst);
        assert!(try_retire(&shared));

        rx.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn surplus_idle_workers_retire() {
        let policy = PoolPolicy {
            core: 1,
            max: 3,
            idle_timeout: Duration::from_secs(15),
        };
        let dispatcher = Dispatcher::new(policy);
        let (release, gate) = tokio::sync::watch::channel(false);

        for _ in 0..3 {
            let mut gate = gate.clone();
            dispatcher.submit(async move {
                let _ = gate.wait_for(|open| *open).await;
            });
        }
        while dispatcher.active() < 3 {
            tokio::task::yield_now().await;
        }
        assert_eq!(dispatcher.workers(), 3);

        release.send(true).unwrap();
        while dispatcher.active() > 0 {
            tokio::task::yield_now().await;
        }

        tokio::time::sleep(Duration::from_secs(16)).await;
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        assert_eq!(dispatcher.workers(), 1);
    }
}
