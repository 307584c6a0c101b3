//! Single-slot cancellable cue timer.
//!
//! At most one deferred cue exists at any instant. Arming replaces the
//! pending cue; cancelling drops it. A generation counter guarded by the slot
//! mutex makes a superseded task harmless even if it already woke up, and the
//! fire callback runs while holding that mutex, so firing is mutually
//! exclusive with `arm` and `cancel`.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

#[derive(Default)]
struct Slot {
    generation: u64,
    pending: Option<JoinHandle<()>>,
}

fn lock(slot: &Mutex<Slot>) -> MutexGuard<'_, Slot> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct CueTimer {
    slot: Arc<Mutex<Slot>>,
    runtime: Handle,
}

impl CueTimer {
    /// Create a timer spawning its task on `runtime`.
    ///
    /// The handle lets `arm` be called from threads outside the runtime, such
    /// as a platform sensor callback.
    pub fn new(runtime: Handle) -> Self {
        CueTimer {
            slot: Arc::new(Mutex::new(Slot::default())),
            runtime,
        }
    }

    /// Cancel any pending cue and schedule `fire` after `delay`.
    ///
    /// `fire` runs under the slot lock and must not call back into this timer.
    pub fn arm<F>(&self, delay: Duration, fire: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let mut slot = lock(&self.slot);
        slot.generation = slot.generation.wrapping_add(1);
        if let Some(previous) = slot.pending.take() {
            previous.abort();
        }

        let generation = slot.generation;
        let shared = Arc::clone(&self.slot);
        slot.pending = Some(self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            let mut slot = lock(&shared);
            if slot.generation != generation {
                return;
            }
            slot.pending = None;
            fire();
        }));
    }

    /// Drop the pending cue. Returns true if one was pending.
    pub fn cancel(&self) -> bool {
        let mut slot = lock(&self.slot);
        slot.generation = slot.generation.wrapping_add(1);
        match slot.pending.take() {
            Some(pending) => {
                pending.abort();
                true
            }
            None => false,
        }
    }

    pub fn is_pending(&self) -> bool {
        lock(&self.slot).pending.is_some()
    }
}

impl Drop for CueTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}
