//! Trailing-edge debounce scheduler.
//!
//! Each [`Debouncer::trigger`] replaces the pending value and re-arms the
//! timer; the action runs once, `delay` after the last trigger, with the last
//! value. Timers run on the tokio runtime captured at construction, so tests
//! drive them with a paused clock.

use crate::error::{CerebroError, Result};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

type Action<T> = Box<dyn Fn(T) + Send + Sync>;

pub struct Debouncer<T: Send + 'static> {
    delay: Duration,
    runtime: Handle,
    shared: Arc<Shared<T>>,
}

struct Shared<T> {
    action: Action<T>,
    state: Mutex<State<T>>,
}

struct State<T> {
    pending: Option<T>,
    timer: Option<JoinHandle<()>>,
    /// Bumped on every trigger; a timer only fires for its own generation.
    generation: u64,
}

impl<T: Send + 'static> Debouncer<T> {
    /// Creates a debouncer bound to the current tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns an error when called outside a tokio runtime.
    pub fn new<F>(delay: Duration, action: F) -> Result<Self>
    where
        F: Fn(T) + Send + Sync + 'static,
    {
        let runtime = Handle::try_current()
            .map_err(|e| CerebroError::internal(format!("Debouncer requires a tokio runtime: {e}")))?;

        Ok(Self {
            delay,
            runtime,
            shared: Arc::new(Shared {
                action: Box::new(action),
                state: Mutex::new(State {
                    pending: None,
                    timer: None,
                    generation: 0,
                }),
            }),
        })
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Schedules the action with `value`, cancelling any pending invocation.
    pub fn trigger(&self, value: T) {
        let mut state = self.shared.lock();
        if let Some(timer) = state.timer.take() {
            timer.abort();
        }
        state.pending = Some(value);
        state.generation = state.generation.wrapping_add(1);

        let generation = state.generation;
        let shared = Arc::clone(&self.shared);
        let delay = self.delay;
        state.timer = Some(self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            shared.fire(generation);
        }));
    }

    /// Runs the pending invocation now, if any.
    ///
    /// Returns `true` if the action ran.
    pub fn flush(&self) -> bool {
        let pending = {
            let mut state = self.shared.lock();
            if let Some(timer) = state.timer.take() {
                timer.abort();
            }
            state.generation = state.generation.wrapping_add(1);
            state.pending.take()
        };

        match pending {
            Some(value) => {
                (self.shared.action)(value);
                true
            }
            None => false,
        }
    }

    /// Whether an invocation is scheduled and has not run yet.
    pub fn is_pending(&self) -> bool {
        self.shared.lock().pending.is_some()
    }
}

impl<T> Shared<T> {
    fn lock(&self) -> MutexGuard<'_, State<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn fire(&self, generation: u64) {
        let pending = {
            let mut state = self.lock();
            if state.generation != generation {
                return;
            }
            state.timer = None;
            state.pending.take()
        };

        if let Some(value) = pending {
            (self.action)(value);
        }
    }
}

impl<T: Send + 'static> Drop for Debouncer<T> {
    fn drop(&mut self) {
        if let Some(timer) = self.shared.lock().timer.take() {
            timer.abort();
        }
    }
}

impl<T: Send + 'static> fmt::Debug for Debouncer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Debouncer")
            .field("delay", &self.delay)
            .field("pending", &self.is_pending())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::sleep;

    fn recording(delay_ms: u64) -> (Debouncer<u32>, Arc<Mutex<Vec<u32>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let debouncer = Debouncer::new(Duration::from_millis(delay_ms), move |value| {
            sink.lock().unwrap().push(value);
        })
        .unwrap();
        (debouncer, seen)
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_coalesces_to_last_value() {
        let (debouncer, seen) = recording(300);

        for value in 1..=5 {
            debouncer.trigger(value);
            sleep(Duration::from_millis(10)).await;
        }
        assert!(seen.lock().unwrap().is_empty());
        assert!(debouncer.is_pending());

        sleep(Duration::from_millis(350)).await;
        assert_eq!(*seen.lock().unwrap(), vec![5]);
        assert!(!debouncer.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_each_trigger_resets_quiet_period() {
        let (debouncer, seen) = recording(300);

        debouncer.trigger(1);
        sleep(Duration::from_millis(250)).await;
        debouncer.trigger(2);
        sleep(Duration::from_millis(250)).await;
        assert!(seen.lock().unwrap().is_empty());

        sleep(Duration::from_millis(100)).await;
        assert_eq!(*seen.lock().unwrap(), vec![2]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_separate_quiet_windows_fire_separately() {
        let (debouncer, seen) = recording(300);

        debouncer.trigger(1);
        sleep(Duration::from_millis(400)).await;
        debouncer.trigger(2);
        sleep(Duration::from_millis(400)).await;

        assert_eq!(*seen.lock().unwrap(), vec![1, 2]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_flush_runs_pending_once() {
        let (debouncer, seen) = recording(300);

        debouncer.trigger(7);
        assert!(debouncer.flush());
        assert!(!debouncer.flush());

        sleep(Duration::from_millis(400)).await;
        assert_eq!(*seen.lock().unwrap(), vec![7]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_cancels_pending() {
        let (debouncer, seen) = recording(300);

        debouncer.trigger(1);
        drop(debouncer);
        sleep(Duration::from_millis(400)).await;

        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_requires_runtime() {
        let result = Debouncer::new(Duration::from_millis(1), |_: u32| {});
        assert!(result.is_err());
    }
}
