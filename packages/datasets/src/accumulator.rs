//! Fan-out/fan-in over independent asynchronous operations.
//!
//! An [`Accumulator`] takes N futures, polls all of them concurrently, and
//! resolves once with their N outputs in input order, however the
//! operations interleave. It keeps no retry logic: an operation that fails
//! should return its error as its output.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

/// A boxed, sendable future, as produced by `async_trait` methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Joins a fixed batch of operations into one ordered result.
#[must_use = "an accumulator does nothing unless awaited"]
pub struct Accumulator<'a, T> {
    operations: Vec<Option<BoxFuture<'a, T>>>,
    results: Vec<Option<T>>,
    received: usize,
}

// The operations are boxed and pinned on the heap; the accumulator itself
// is never pinned in place.
impl<T> Unpin for Accumulator<'_, T> {}

impl<'a, T> Accumulator<'a, T> {
    /// Prepare a batch. Nothing runs until the accumulator is polled.
    pub fn new<I, F>(operations: I) -> Self
    where
        I: IntoIterator<Item = F>,
        F: Future<Output = T> + Send + 'a,
    {
        let operations: Vec<Option<BoxFuture<'a, T>>> = operations
            .into_iter()
            .map(|op| Some(Box::pin(op) as BoxFuture<'a, T>))
            .collect();
        let results = operations.iter().map(|_| None).collect();
        Self {
            operations,
            results,
            received: 0,
        }
    }

    /// Number of results the batch will produce.
    pub fn expected(&self) -> usize {
        self.results.len()
    }

    /// Run the batch and hand the ordered results to `continuation`.
    pub async fn execute<R, C>(self, continuation: C) -> R
    where
        C: FnOnce(Vec<T>) -> R,
    {
        continuation(self.await)
    }
}

impl<T> Future for Accumulator<'_, T> {
    type Output = Vec<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();

        for (slot, operation) in this.operations.iter_mut().enumerate() {
            let Some(future) = operation else {
                continue;
            };
            if let Poll::Ready(value) = future.as_mut().poll(cx) {
                this.results[slot] = Some(value);
                *operation = None;
                this.received += 1;
            }
        }

        if this.received == this.results.len() {
            let results = std::mem::take(&mut this.results);
            Poll::Ready(results.into_iter().flatten().collect())
        } else {
            Poll::Pending
        }
    }
}
