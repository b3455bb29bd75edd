use std::fmt::Display;
use std::future::Future;

use futures::stream::{self, StreamExt};

/// Run `f` over `items` with at most `limit` calls in flight at once.
///
/// This is a sliding window, not fixed batches: as soon as one call
/// finishes the next queued item starts. Results come back in input order
/// (`result[i]` belongs to `items[i]`) whatever order calls finish in.
///
/// A failing item never cancels its siblings. When `T` is a `Result`, the
/// caller picks the failure policy with [`all_or_first_error`] or
/// [`ok_or_log`].
pub async fn run_bounded<I, T, F, Fut>(items: Vec<I>, limit: usize, f: F) -> Vec<T>
where
    F: Fn(I) -> Fut,
    Fut: Future<Output = T>,
{
    let total = items.len();
    let limit = limit.max(1);
    let f = &f;

    let mut indexed: Vec<(usize, T)> = stream::iter(items.into_iter().enumerate())
        .map(|(index, item)| async move { (index, f(item).await) })
        .buffer_unordered(limit)
        .collect()
        .await;

    indexed.sort_by_key(|(index, _)| *index);
    debug_assert_eq!(indexed.len(), total);
    indexed.into_iter().map(|(_, result)| result).collect()
}

/// Fail-whole-run policy: every result or the first error in input order.
pub fn all_or_first_error<T, E>(results: Vec<Result<T, E>>) -> Result<Vec<T>, E> {
    results.into_iter().collect()
}

/// Best-effort policy: keep the successes, log each failure at `warn`.
pub fn ok_or_log<T, E: Display>(results: Vec<Result<T, E>>, label: &str) -> Vec<T> {
    results
        .into_iter()
        .filter_map(|r| match r {
            Ok(v) => Some(v),
            Err(e) => {
                tracing::warn!(label, error = %e, "skipping failed fetch");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn never_exceeds_limit_and_preserves_order() {
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        // Distinct durations so completion order differs from input order.
        let durations: Vec<u64> = vec![50, 10, 40, 5, 30, 20, 15, 1];

        let results = run_bounded(durations.clone(), 3, |ms| {
            let in_flight = Arc::clone(&in_flight);
            let peak = Arc::clone(&peak);
            async move {
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(ms)).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
                ms * 2
            }
        })
        .await;

        assert_eq!(results, durations.iter().map(|ms| ms * 2).collect::<Vec<_>>());
        assert!(peak.load(Ordering::SeqCst) <= 3);
        assert_eq!(in_flight.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn window_refills_as_soon_as_one_finishes() {
        // One slow task and many fast ones with a limit of 2: a fixed-batch
        // scheduler would wait for the slow task before each new pair.
        let finished = Arc::new(AtomicUsize::new(0));
        let mut items = vec![200u64];
        items.extend(std::iter::repeat(5).take(6));

        let order = run_bounded(items, 2, |ms| {
            let finished = Arc::clone(&finished);
            async move {
                tokio::time::sleep(Duration::from_millis(ms)).await;
                finished.fetch_add(1, Ordering::SeqCst)
            }
        })
        .await;

        // The slow item was the last to finish even though it started first.
        assert_eq!(order[0], 6);
    }

    #[tokio::test]
    async fn failures_do_not_cancel_siblings() {
        let completed = Arc::new(AtomicUsize::new(0));
        let results = run_bounded(vec![1, 2, 3, 4], 2, |n| {
            let completed = Arc::clone(&completed);
            async move {
                tokio::time::sleep(Duration::from_millis(5)).await;
                completed.fetch_add(1, Ordering::SeqCst);
                if n == 2 {
                    Err(format!("item {n} failed"))
                } else {
                    Ok(n)
                }
            }
        })
        .await;

        assert_eq!(completed.load(Ordering::SeqCst), 4);
        assert_eq!(ok_or_log(results.clone(), "test"), vec![1, 3, 4]);
        assert_eq!(all_or_first_error(results).unwrap_err(), "item 2 failed");
    }

    #[tokio::test]
    async fn zero_limit_is_treated_as_one() {
        let results = run_bounded(vec!["a", "b"], 0, |s| async move { s.to_uppercase() }).await;
        assert_eq!(results, vec!["A", "B"]);
    }

    #[tokio::test]
    async fn empty_input() {
        let results: Vec<u32> = run_bounded(Vec::<u32>::new(), 4, |n| async move { n }).await;
        assert!(results.is_empty());
    }
}
