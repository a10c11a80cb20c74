#[macro_use]
extern crate tracing;

use anyhow::{anyhow, Result};
use tokio::sync::{oneshot, Semaphore};

/// A thread pool that runs blocking searches and resolves once they
/// complete.
///
/// Pipelines block on the search engine for the whole request, running
/// them on the async scheduler would stall every other connection.
/// Basically tokio's spawn_blocking but with a bounded pool.
pub struct ExecutorPool {
    limiter: Semaphore,
    max_concurrency: usize,
    thread_pool: rayon::ThreadPool,
}

impl ExecutorPool {
    /// Creates a new thread pool with a set concurrency.
    ///
    /// The set concurrency determines the number of threads spawned and
    /// the number of tasks in flight, callers beyond that wait for a slot.
    pub fn create(max_concurrency: usize) -> Result<Self> {
        if max_concurrency == 0 {
            return Err(anyhow!("executor pool needs at least one thread"));
        }

        let limiter = Semaphore::new(max_concurrency);
        let thread_pool = rayon::ThreadPoolBuilder::new()
            .thread_name(|n| format!("executor-pool-worker-{}", n))
            .num_threads(max_concurrency)
            .panic_handler(|_| error!("executor task panicked"))
            .build()?;

        info!(threads = max_concurrency, "executor pool ready");

        Ok(Self {
            limiter,
            max_concurrency,
            thread_pool,
        })
    }

    #[inline]
    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    /// The number of tasks that could start right now.
    #[inline]
    pub fn available(&self) -> usize {
        self.limiter.available_permits()
    }

    /// Spawns a new function into the pool and returns
    /// the results once complete.
    ///
    /// A panicking task resolves to an error instead of taking the
    /// caller down with it.
    pub async fn spawn<F, T>(&self, func: F) -> Result<T>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let _permit = self.limiter.acquire().await?;
        let (tx, rx) = oneshot::channel();
        self.thread_pool.spawn(move || {
            let result = func();
            let _ = tx.send(result);
        });

        rx.await
            .map_err(|_| anyhow!("executor task panicked before completing"))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn runs_on_named_worker() -> Result<()> {
        let pool = ExecutorPool::create(2)?;

        let name = pool
            .spawn(|| std::thread::current().name().map(String::from))
            .await?;

        assert!(name.unwrap_or_default().starts_with("executor-pool-worker-"));
        assert_eq!(pool.available(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn panicking_task_is_an_error() -> Result<()> {
        let pool = ExecutorPool::create(1)?;

        let outcome = pool.spawn(|| -> usize { panic!("boom") }).await;
        assert!(outcome.is_err());

        // The pool keeps working afterwards.
        assert_eq!(pool.spawn(|| 7).await?, 7);
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrency_is_bounded() -> Result<()> {
        let pool = Arc::new(ExecutorPool::create(2)?);
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let mut tasks = vec![];
        for _ in 0..8 {
            let pool = pool.clone();
            let running = running.clone();
            let peak = peak.clone();

            tasks.push(tokio::spawn(async move {
                pool.spawn(move || {
                    let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    std::thread::sleep(Duration::from_millis(20));
                    running.fetch_sub(1, Ordering::SeqCst);
                })
                .await
            }));
        }

        for task in tasks {
            task.await??;
        }

        assert!(peak.load(Ordering::SeqCst) <= 2);
        Ok(())
    }
}
