//! Single-flight coalescing of concurrent identical operations.
//!
//! DESIGN
//! ======
//! A guarded slot holds at most one outstanding operation as a
//! `futures::future::Shared` handle. Callers that find the slot occupied
//! attach to the existing handle; the first caller starts the operation.
//! The slot is cleared by the operation itself the moment it settles,
//! success or failure, so the next caller starts a fresh attempt.
//!
//! The slot lock is only held for the check-and-install step, never across
//! an await point. A generation counter guards the clear so a settled
//! operation can never evict a newer one.

use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};

type Handle<T> = Shared<BoxFuture<'static, T>>;

struct Slot<T> {
    generation: u64,
    pending: Option<Handle<T>>,
}

pub struct SingleFlight<T> {
    slot: Arc<Mutex<Slot<T>>>,
}

impl<T> Default for SingleFlight<T> {
    fn default() -> Self {
        Self { slot: Arc::new(Mutex::new(Slot { generation: 0, pending: None })) }
    }
}

impl<T> SingleFlight<T>
where
    T: Clone + Send + Sync + 'static,
{
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether an operation is currently outstanding.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pending
            .is_some()
    }

    /// Join the outstanding operation, or start one with `start` if none is
    /// pending. Every caller attached to the same flight gets a clone of the
    /// same output.
    pub async fn run<F, Fut>(&self, start: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T> + Send + 'static,
    {
        let handle = {
            let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(existing) = &slot.pending {
                existing.clone()
            } else {
                slot.generation += 1;
                let generation = slot.generation;
                let cleanup = Arc::clone(&self.slot);
                let operation = start();
                let handle = async move {
                    let output = operation.await;
                    let mut slot = cleanup.lock().unwrap_or_else(PoisonError::into_inner);
                    if slot.generation == generation {
                        slot.pending = None;
                    }
                    output
                }
                .boxed()
                .shared();
                slot.pending = Some(handle.clone());
                handle
            }
        };
        handle.await
    }
}

#[cfg(test)]
#[path = "single_flight_test.rs"]
mod tests;
