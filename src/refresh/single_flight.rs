//! At most one in-flight task per key, shared by every caller.
//!
//! The work runs on its own tokio task, so it completes even when nobody
//! awaits it (background refreshes) and a caller that gives up does not
//! cancel it for the others. The in-flight marker is cleared by a drop guard
//! inside that task, which also runs if the work panics.

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;

/// Output of a flight: the task's value, or why the task never produced one
pub type FlightResult<T> = Result<T, String>;

type Flight<T> = Shared<BoxFuture<'static, FlightResult<T>>>;

struct Slot<T: Clone> {
    generation: u64,
    flight: Option<Flight<T>>,
}

pub struct SingleFlight<T: Clone> {
    slot: Arc<Mutex<Slot<T>>>,
}

impl<T: Clone> Clone for SingleFlight<T> {
    fn clone(&self) -> Self {
        SingleFlight {
            slot: Arc::clone(&self.slot),
        }
    }
}

impl<T> Default for SingleFlight<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

/// Clears the slot when the flight task ends, however it ends.
struct ClearOnDrop<T: Clone> {
    slot: Arc<Mutex<Slot<T>>>,
    generation: u64,
}

impl<T: Clone> Drop for ClearOnDrop<T> {
    fn drop(&mut self) {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.generation == self.generation {
            slot.flight = None;
        }
    }
}

impl<T> SingleFlight<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        SingleFlight {
            slot: Arc::new(Mutex::new(Slot {
                generation: 0,
                flight: None,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Slot<T>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_running(&self) -> bool {
        self.lock().flight.is_some()
    }

    /// Joins the running flight, or starts one from `work` if none is running.
    ///
    /// `work` is only called when a new flight starts.
    pub fn start_or_join<F, Fut>(&self, work: F) -> Flight<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T> + Send + 'static,
    {
        let mut slot = self.lock();
        if let Some(flight) = &slot.flight {
            debug!("Joining in-flight task");
            return flight.clone();
        }
        self.launch(&mut slot, work())
    }

    /// Starts a flight unless one is running. Returns whether one was started.
    pub fn try_start<F, Fut>(&self, work: F) -> bool
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T> + Send + 'static,
    {
        let mut slot = self.lock();
        if slot.flight.is_some() {
            return false;
        }
        self.launch(&mut slot, work());
        true
    }

    fn launch<Fut>(&self, slot: &mut Slot<T>, work: Fut) -> Flight<T>
    where
        Fut: Future<Output = T> + Send + 'static,
    {
        slot.generation = slot.generation.wrapping_add(1);
        let guard = ClearOnDrop {
            slot: Arc::clone(&self.slot),
            generation: slot.generation,
        };

        let handle = tokio::spawn(async move {
            let _guard = guard;
            work.await
        });
        let flight = async move { handle.await.map_err(|e| e.to_string()) }
            .boxed()
            .shared();

        slot.flight = Some(flight.clone());
        flight
    }
}
