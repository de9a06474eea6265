//! Bounded-concurrency worker pool
//!
//! Applies an async task across a batch of items with a fixed concurrency
//! bound. The scrape-phase pool and the mail-phase pool are two separate
//! instantiations of this utility, preserving the phase boundary between
//! them. Results are collected in completion order - downstream stages must
//! not assume catalog order.

use std::future::Future;
use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::Semaphore;

/// Fixed-size pool of workers. At most `concurrency` tasks are in flight at
/// any instant; the bound is a tunable constant, never derived from batch
/// size.
#[derive(Debug, Clone)]
pub struct WorkerPool {
    concurrency: usize,
}

impl WorkerPool {
    pub fn new(concurrency: usize) -> Self {
        Self {
            concurrency: concurrency.max(1),
        }
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Runs `task` over every item, at most `concurrency` at a time.
    ///
    /// A panicking task is logged and dropped from the results; it never
    /// aborts the batch or other in-flight items.
    pub async fn run<T, R, F, Fut>(&self, items: Vec<T>, task: F) -> Vec<R>
    where
        T: Send + 'static,
        R: Send + 'static,
        F: Fn(T) -> Fut + Send + Sync + Clone + 'static,
        Fut: Future<Output = R> + Send + 'static,
    {
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let handles: Vec<_> = items
            .into_iter()
            .map(|item| {
                let semaphore = Arc::clone(&semaphore);
                let task = task.clone();
                tokio::spawn(async move {
                    // The semaphore is never closed while handles are pending.
                    let _permit = semaphore.acquire().await.expect("pool semaphore closed");
                    task(item).await
                })
            })
            .collect();

        let mut results = Vec::with_capacity(handles.len());
        for outcome in join_all(handles).await {
            match outcome {
                Ok(result) => results.push(result),
                Err(error) => tracing::error!("worker task failed: {error}"),
            }
        }
        results
    }
}
