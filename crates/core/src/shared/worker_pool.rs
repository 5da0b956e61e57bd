use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use super::cancellation::CancellationToken;

/// Runs `work` over `items` on at most `concurrency` scoped threads.
///
/// Workers pull the next index from a shared cursor, so every item is
/// claimed exactly once. Results come back in input order; an entry is
/// `None` only when cancellation stopped the pool before the item was
/// claimed.
pub fn run_bounded<T, R, F>(
    items: &[T],
    concurrency: usize,
    cancel: &CancellationToken,
    work: F,
) -> Vec<Option<R>>
where
    T: Sync,
    R: Send,
    F: Fn(usize, &T) -> R + Sync,
{
    let mut results: Vec<Option<R>> = (0..items.len()).map(|_| None).collect();
    if items.is_empty() {
        return results;
    }

    let workers = concurrency.max(1).min(items.len());
    let cursor = AtomicUsize::new(0);
    let (result_tx, result_rx) = crossbeam_channel::unbounded::<(usize, R)>();

    thread::scope(|scope| {
        for _ in 0..workers {
            let result_tx = result_tx.clone();
            let cursor = &cursor;
            let work = &work;
            scope.spawn(move || loop {
                if cancel.is_cancelled() {
                    break;
                }
                let index = cursor.fetch_add(1, Ordering::SeqCst);
                let Some(item) = items.get(index) else {
                    break;
                };
                if result_tx.send((index, work(index, item))).is_err() {
                    break;
                }
            });
        }
    });
    drop(result_tx);

    for (index, result) in result_rx {
        results[index] = Some(result);
    }
    results
}
