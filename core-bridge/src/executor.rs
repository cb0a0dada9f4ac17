//! Executors that run submitted jobs on some other thread.
//!
//! [`BlockingPool`] is the default: a cached pool of named threads backed by
//! Tokio's blocking pool. Threads are spawned on demand up to
//! [`BridgeConfig::pool_max_threads`] and exit after
//! [`BridgeConfig::pool_keep_alive`] of idleness.
//!
//! # Process-wide pool
//!
//! [`BlockingPool::global`] returns a pool shared by the whole process. It is
//! created on first use from [`BridgeConfig::from_env`] (or from the config
//! passed to [`BlockingPool::install_global`] beforehand) and lives until the
//! process exits. Code that should not share it, tests in particular, can
//! pass its own executor instead.

use crate::config::BridgeConfig;
use crate::error::ConfigError;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

/// A unit of work submitted to an [`Executor`].
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Runs jobs on an implementation-chosen thread.
///
/// An executor may drop a job without running it (for instance after
/// shutdown); callers waiting on the job must cope with that.
pub trait Executor: Send + Sync {
    fn execute(&self, job: Job);
}

impl<E: Executor + ?Sized> Executor for Arc<E> {
    fn execute(&self, job: Job) {
        (**self).execute(job);
    }
}

impl<E: Executor + ?Sized> Executor for Box<E> {
    fn execute(&self, job: Job) {
        (**self).execute(job);
    }
}

impl<E: Executor + ?Sized> Executor for &E {
    fn execute(&self, job: Job) {
        (**self).execute(job);
    }
}

/// Runs jobs on the runtime's blocking pool.
impl Executor for tokio::runtime::Handle {
    fn execute(&self, job: Job) {
        drop(self.spawn_blocking(job));
    }
}

static GLOBAL: OnceLock<BlockingPool> = OnceLock::new();

/// Cached pool of named worker threads.
pub struct BlockingPool {
    runtime: tokio::runtime::Runtime,
    thread_name: String,
}

impl BlockingPool {
    pub fn new(config: &BridgeConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let prefix = config.pool_thread_name.clone();
        let sequence = AtomicUsize::new(0);
        // Jobs only use the blocking pool; no async worker thread is started.
        let runtime = tokio::runtime::Builder::new_current_thread()
            .max_blocking_threads(config.pool_max_threads)
            .thread_keep_alive(config.pool_keep_alive)
            .thread_name_fn(move || {
                format!("{}-{}", prefix, sequence.fetch_add(1, Ordering::Relaxed))
            })
            .build()
            .map_err(|e| ConfigError::Pool(e.to_string()))?;

        tracing::debug!(
            thread_name = %config.pool_thread_name,
            max_threads = config.pool_max_threads,
            "started blocking pool"
        );

        Ok(Self {
            runtime,
            thread_name: config.pool_thread_name.clone(),
        })
    }

    /// The process-wide pool, created on first use.
    pub fn global() -> Result<&'static BlockingPool, ConfigError> {
        if let Some(pool) = GLOBAL.get() {
            return Ok(pool);
        }
        Self::init_global(BridgeConfig::from_env()?)
    }

    /// Creates the process-wide pool from `config`.
    ///
    /// Fails with [`ConfigError::AlreadyInitialized`] once the pool exists,
    /// including when another thread installs it concurrently.
    pub fn install_global(config: BridgeConfig) -> Result<&'static BlockingPool, ConfigError> {
        if GLOBAL.get().is_some() {
            return Err(ConfigError::AlreadyInitialized);
        }
        let pool = Self::new(&config)?;
        match GLOBAL.set(pool) {
            Ok(()) => Self::installed(),
            Err(lost) => {
                lost.runtime.shutdown_background();
                Err(ConfigError::AlreadyInitialized)
            }
        }
    }

    fn init_global(config: BridgeConfig) -> Result<&'static BlockingPool, ConfigError> {
        let pool = Self::new(&config)?;
        if let Err(lost) = GLOBAL.set(pool) {
            // Another thread won the race; its pool is the global one.
            lost.runtime.shutdown_background();
        }
        Self::installed()
    }

    fn installed() -> Result<&'static BlockingPool, ConfigError> {
        GLOBAL
            .get()
            .ok_or_else(|| ConfigError::Pool("global pool missing after init".to_string()))
    }

    pub fn thread_name(&self) -> &str {
        &self.thread_name
    }
}

impl Executor for BlockingPool {
    fn execute(&self, job: Job) {
        drop(self.runtime.spawn_blocking(job));
    }
}

impl std::fmt::Debug for BlockingPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockingPool")
            .field("thread_name", &self.thread_name)
            .finish_non_exhaustive()
    }
}

/// Spawns a fresh named OS thread per job.
#[derive(Debug, Clone)]
pub struct ThreadPerTask {
    name: String,
}

impl ThreadPerTask {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Default for ThreadPerTask {
    fn default() -> Self {
        Self::new("bridge-task")
    }
}

impl Executor for ThreadPerTask {
    fn execute(&self, job: Job) {
        if let Err(e) = std::thread::Builder::new().name(self.name.clone()).spawn(job) {
            tracing::warn!(error = %e, thread_name = %self.name, "failed to spawn thread; job dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{mpsc, Barrier};
    use std::thread;
    use std::time::Duration;

    fn thread_name_of(executor: &dyn Executor) -> Option<String> {
        let (tx, rx) = mpsc::channel();
        executor.execute(Box::new(move || {
            let _ = tx.send(std::thread::current().name().map(str::to_string));
        }));
        rx.recv_timeout(Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn pool_threads_are_named() {
        let config = BridgeConfig::default().with_pool_thread_name("pool-test");
        let pool = BlockingPool::new(&config).unwrap();
        let name = thread_name_of(&pool).unwrap();
        assert_eq!(name, "pool-test-0");
        assert_eq!(pool.thread_name(), "pool-test");
    }

    #[test]
    fn thread_per_task_names_thread() {
        let name = thread_name_of(&ThreadPerTask::new("one-off")).unwrap();
        assert_eq!(name, "one-off");
    }

    #[test]
    fn global_pool_is_shared() {
        let a = BlockingPool::global().unwrap();
        let b = BlockingPool::global().unwrap();
        assert!(std::ptr::eq(a, b));
        assert!(matches!(
            BlockingPool::install_global(BridgeConfig::default()),
            Err(ConfigError::AlreadyInitialized)
        ));
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = BridgeConfig::default().with_pool_max_threads(0);
        assert!(BlockingPool::new(&config).is_err());
    }

    #[test]
    fn concurrent_installs_succeed_at_most_once() {
        let barrier = Arc::new(Barrier::new(4));
        let installers: Vec<_> = (0..4)
            .map(|_| {
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    BlockingPool::install_global(BridgeConfig::default()).map(|_| ())
                })
            })
            .collect();

        let results: Vec<_> = installers
            .into_iter()
            .map(|installer| installer.join().unwrap())
            .collect();
        assert!(results.iter().filter(|result| result.is_ok()).count() <= 1);
        assert!(results
            .iter()
            .all(|result| matches!(result, Ok(()) | Err(ConfigError::AlreadyInitialized))));
        assert!(BlockingPool::global().is_ok());
    }

    #[test]
    fn runtime_handle_runs_jobs_on_blocking_pool() {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("handle-exec")
            .build()
            .unwrap();
        let name = thread_name_of(runtime.handle()).unwrap();
        assert_eq!(name, "handle-exec");
    }
}
