//! Bounded worker pool draining a queue of work items.
//!
//! Workers share nothing but the queue. After the first failure the remaining
//! workers stop taking items; whatever they already committed stays committed.

use crate::error::{Error, Result};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::task::JoinSet;

/// Run `job` over every item with at most `workers` items in flight.
///
/// Returns the first error any worker hit.
pub async fn drain<I, F, Fut>(items: Vec<I>, workers: usize, job: F) -> Result<()>
where
    I: Send + 'static,
    F: Fn(I) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    if items.is_empty() {
        return Ok(());
    }
    let workers = workers.clamp(1, items.len());
    let queue = Arc::new(Mutex::new(VecDeque::from(items)));
    let failed = Arc::new(AtomicBool::new(false));
    let job = Arc::new(job);

    let mut set = JoinSet::new();
    for _ in 0..workers {
        let queue = Arc::clone(&queue);
        let failed = Arc::clone(&failed);
        let job = Arc::clone(&job);
        set.spawn(async move {
            while !failed.load(Ordering::Acquire) {
                let next = queue.lock().pop_front();
                let Some(item) = next else { break };
                if let Err(e) = job(item).await {
                    failed.store(true, Ordering::Release);
                    return Err(e);
                }
            }
            Ok(())
        });
    }

    let mut first_error = None;
    while let Some(joined) = set.join_next().await {
        let outcome = joined.map_err(|e| Error::Worker(e.to_string())).and_then(|r| r);
        if let Err(e) = outcome {
            first_error.get_or_insert(e);
        }
    }
    first_error.map_or(Ok(()), Err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_every_item_visited_once() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        drain((0..100).collect(), 8, move |i: usize| {
            let sink = Arc::clone(&sink);
            async move {
                sink.lock().push(i);
                Ok(())
            }
        })
        .await
        .unwrap();

        let mut seen = seen.lock().clone();
        seen.sort_unstable();
        assert_eq!(seen, (0..100).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_in_flight_bounded_by_workers() {
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let (a, p) = (Arc::clone(&active), Arc::clone(&peak));
        drain((0..40).collect(), 3, move |_: usize| {
            let (active, peak) = (Arc::clone(&a), Arc::clone(&p));
            async move {
                let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::task::yield_now().await;
                active.fetch_sub(1, Ordering::SeqCst);
                Ok(())
            }
        })
        .await
        .unwrap();
        assert!(peak.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test]
    async fn test_first_error_stops_the_pool() {
        let visited = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&visited);
        let result = drain((0..50).collect(), 1, move |i: usize| {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                if i == 4 {
                    Err(Error::Factory(format!("item {i}")))
                } else {
                    Ok(())
                }
            }
        })
        .await;

        assert!(matches!(result, Err(Error::Factory(_))));
        assert_eq!(visited.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn test_empty_queue() {
        drain(Vec::<usize>::new(), 4, |_| async { Ok(()) }).await.unwrap();
    }
}
