use std::future::Future;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;

const WAITING: u8 = 0;
const FIRED: u8 = 1;
const CANCELLED: u8 = 2;

/// Trailing-edge debouncer with a single pending slot.
///
/// Every [`Debouncer::schedule`] replaces the pending timer, so a burst of
/// calls runs only the task handed over by the last one, `delay` after that
/// call. Once the timer fires the task is never aborted by `cancel` or a
/// later `schedule`; [`Debouncer::wait_fired`] waits for such tasks.
#[derive(Debug)]
pub struct Debouncer {
    delay: Duration,
    timers: Mutex<Vec<Timer>>,
}

#[derive(Debug)]
struct Timer {
    phase: Arc<AtomicU8>,
    handle: JoinHandle<()>,
}

impl Timer {
    /// Moves a waiting timer to cancelled. Fails once the timer has fired.
    fn cancel(&self) -> bool {
        let cancelled = self
            .phase
            .compare_exchange(WAITING, CANCELLED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if cancelled {
            self.handle.abort();
        }
        cancelled
    }

    fn is_waiting(&self) -> bool {
        self.phase.load(Ordering::Acquire) == WAITING && !self.handle.is_finished()
    }
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            timers: Mutex::new(Vec::new()),
        }
    }

    /// Must be called from within a tokio runtime.
    pub fn schedule<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let delay = self.delay;
        let phase = Arc::new(AtomicU8::new(WAITING));
        let timer_phase = Arc::clone(&phase);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if timer_phase
                .compare_exchange(WAITING, FIRED, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                task.await;
            }
        });

        let mut timers = self.timers();
        for timer in timers.iter() {
            timer.cancel();
        }
        timers.retain(|timer| {
            !timer.handle.is_finished() && timer.phase.load(Ordering::Acquire) == FIRED
        });
        timers.push(Timer { phase, handle });
    }

    /// Drops the waiting timer. Returns `true` when a timer was still waiting.
    /// Tasks that already fired keep running.
    pub fn cancel(&self) -> bool {
        let mut timers = self.timers();
        let mut dropped = false;
        for timer in timers.iter() {
            dropped |= timer.cancel();
        }
        timers.retain(|timer| timer.phase.load(Ordering::Acquire) == FIRED);
        dropped
    }

    pub fn is_pending(&self) -> bool {
        self.timers().iter().any(Timer::is_waiting)
    }

    /// Waits until every task that has already fired has completed. A timer
    /// still waiting is left alone.
    pub async fn wait_fired(&self) {
        let fired: Vec<JoinHandle<()>> = {
            let mut timers = self.timers();
            let (fired, waiting): (Vec<Timer>, Vec<Timer>) = std::mem::take(&mut *timers)
                .into_iter()
                .partition(|timer| timer.phase.load(Ordering::Acquire) == FIRED);
            *timers = waiting;
            fired.into_iter().map(|timer| timer.handle).collect()
        };
        for handle in fired {
            if let Err(err) = handle.await {
                tracing::debug!(%err, "debounced task did not complete");
            }
        }
    }

    fn timers(&self) -> MutexGuard<'_, Vec<Timer>> {
        self.timers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}
