//! Bounded task fan-out.

use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::error;

/// Run `task` for every item with at most `limit` tasks in flight.
///
/// The submitter waits for a permit before spawning, so a full pool blocks
/// submission. All tasks are joined before returning. Slot `i` holds the
/// outcome of item `i`, or `None` if that task panicked.
pub(crate) async fn run_bounded<T, R, F, Fut>(items: Vec<T>, limit: usize, task: F) -> Vec<Option<R>>
where
    T: Send + 'static,
    R: Send + 'static,
    F: Fn(T) -> Fut + Send,
    Fut: Future<Output = R> + Send + 'static,
{
    let semaphore = Arc::new(Semaphore::new(limit.max(1)));
    let mut handles = Vec::with_capacity(items.len());

    for item in items {
        let permit = match semaphore.clone().acquire_owned().await {
            Ok(permit) => permit,
            Err(e) => {
                error!(error = %e, "Worker pool closed");
                handles.push(None);
                continue;
            }
        };

        let fut = task(item);
        handles.push(Some(tokio::spawn(async move {
            let outcome = fut.await;
            drop(permit);
            outcome
        })));
    }

    let mut outcomes = Vec::with_capacity(handles.len());
    for handle in handles {
        let outcome = match handle {
            Some(handle) => match handle.await {
                Ok(outcome) => Some(outcome),
                Err(e) => {
                    error!(error = %e, "Task panicked");
                    None
                }
            },
            None => None,
        };
        outcomes.push(outcome);
    }

    outcomes
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_outcomes_keep_input_order() {
        let outcomes = run_bounded(vec![30u64, 10, 20], 3, |ms| async move {
            tokio::time::sleep(Duration::from_millis(ms)).await;
            ms * 2
        })
        .await;

        assert_eq!(outcomes, vec![Some(60), Some(20), Some(40)]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_limit_bounds_in_flight_tasks() {
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let outcomes = run_bounded((0..20).collect::<Vec<_>>(), 3, |_| {
            let in_flight = Arc::clone(&in_flight);
            let peak = Arc::clone(&peak);
            async move {
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
            }
        })
        .await;

        assert_eq!(outcomes.len(), 20);
        assert!(peak.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test]
    async fn test_panicked_task_is_none() {
        let outcomes = run_bounded(vec![1, 2, 3], 2, |n| async move {
            if n == 2 {
                panic!("boom");
            }
            n
        })
        .await;

        assert_eq!(outcomes, vec![Some(1), None, Some(3)]);
    }
}
