//! Per-key single-flight execution.
//!
//! The first caller for a key spawns the computation as its own task and
//! publishes a shared handle to it; callers arriving while it runs await the
//! same handle and receive a clone of the same result. The entry is dropped
//! when the computation finishes, so the next caller starts fresh.
//!
//! Cancellation: dropping a caller's future never cancels the computation.
//! The spawned task always runs to completion, even with no waiters left, so
//! an expensive conversion that was already paid for still lands in the store.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use futures_util::future::{BoxFuture, FutureExt, Shared};

use crate::Error;

type SharedResult<T> = Shared<BoxFuture<'static, Result<T, Error>>>;

/// Deduplicates concurrent computations by key.
pub struct SingleFlight<T> {
    inflight: Arc<Mutex<HashMap<String, SharedResult<T>>>>,
}

impl<T> Default for SingleFlight<T> {
    fn default() -> Self {
        Self { inflight: Arc::new(Mutex::new(HashMap::new())) }
    }
}

impl<T> SingleFlight<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `compute` for `key` unless a computation for `key` is already in
    /// flight, in which case wait for that one instead.
    ///
    /// `compute` is only called by the caller that starts the flight.
    pub async fn run<F, Fut>(&self, key: &str, compute: F) -> Result<T, Error>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, Error>> + Send + 'static,
    {
        let shared = {
            let mut map = self.inflight.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(existing) = map.get(key) {
                tracing::debug!(key, "joining in-flight computation");
                existing.clone()
            } else {
                let fut = compute();
                let registry = Arc::clone(&self.inflight);
                let owned_key = key.to_string();
                // The entry is inserted below while the lock is still held, so
                // this removal can never run before the insert.
                let handle = tokio::spawn(async move {
                    let result = fut.await;
                    registry.lock().unwrap_or_else(PoisonError::into_inner).remove(&owned_key);
                    result
                });
                let shared = async move {
                    match handle.await {
                        Ok(result) => result,
                        Err(e) => Err(Error::Internal(format!("computation task failed: {e}"))),
                    }
                }
                .boxed()
                .shared();
                map.insert(key.to_string(), shared.clone());
                shared
            }
        };

        shared.await
    }

    /// Whether a computation for `key` is currently running.
    pub fn is_in_flight(&self, key: &str) -> bool {
        self.inflight.lock().unwrap_or_else(PoisonError::into_inner).contains_key(key)
    }

    /// Number of keys with a running computation.
    pub fn len(&self) -> usize {
        self.inflight.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
