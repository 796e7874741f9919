use std::future::Future;
use std::sync::Arc;

use futures::stream::FuturesUnordered;
use futures::StreamExt;
use tokio::sync::Semaphore;

use crate::error::DeviceError;

use super::cancel::CancelToken;
use super::traits::RetryStrategy;

/// Run `executor_fn` over every item with at most `max_concurrency` in flight.
///
/// Results are slotted by item position, so the output order is the input order
/// whatever the completion order was.
///
/// # Arguments
///
/// * `items` - Work items, in the order results must come back
/// * `max_concurrency` - Maximum number of items in flight (clamped to at least 1)
/// * `executor_fn` - Async function run for one `(index, item)`
pub async fn execute_indexed<'a, T, R, F, Fut>(
    items: &'a [T],
    max_concurrency: usize,
    executor_fn: F,
) -> Vec<R>
where
    F: Fn(usize, &'a T) -> Fut,
    Fut: Future<Output = R>,
{
    let sem = Arc::new(Semaphore::new(max_concurrency.max(1)));
    let mut futs: FuturesUnordered<_> = FuturesUnordered::new();

    for (index, item) in items.iter().enumerate() {
        let sem = sem.clone();
        let fut = executor_fn(index, item);

        futs.push(async move {
            // The semaphore is owned by this function and never closed.
            let _permit = sem.acquire_owned().await;
            (index, fut.await)
        });
    }

    let mut slots: Vec<Option<R>> = std::iter::repeat_with(|| None).take(items.len()).collect();

    while let Some((index, result)) = futs.next().await {
        slots[index] = Some(result);
    }

    slots.into_iter().flatten().collect()
}

/// Drive `op` until it succeeds, the error is not retryable, retries are
/// exhausted, or the run is cancelled. Returns the last outcome and the
/// number of attempts made.
pub async fn run_with_retry<T, F, Fut>(
    strategy: &dyn RetryStrategy,
    cancel: &CancelToken,
    label: &str,
    mut op: F,
) -> (Result<T, DeviceError>, u32)
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, DeviceError>>,
{
    let mut retry = 0u32;
    loop {
        let attempt = retry + 1;
        let err = match op(retry).await {
            Ok(v) => return (Ok(v), attempt),
            Err(e) => e,
        };

        if cancel.is_cancelled() || !strategy.should_retry(retry, &err) {
            return (Err(err), attempt);
        }
        let Some(delay) = strategy.next_delay(retry, &err) else {
            return (Err(err), attempt);
        };

        tracing::warn!(
            target: "netsentinel.retry",
            label,
            attempt,
            delay_ms = delay.as_millis() as u64,
            strategy = strategy.name(),
            error = %err,
            "retrying after failure"
        );

        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = cancel.cancelled() => return (Err(err), attempt),
        }
        retry += 1;
    }
}
