//! A cancellable, re-armable one-shot delay.
//!
//! The connection actor arms one of these for the awaiter at the head of
//! the pending queue and disarms it whenever that awaiter is resolved by
//! other means. Each arming bumps a generation counter so a wakeup can
//! always be attributed to the arming that scheduled it.

use std::future::pending;
use std::pin::Pin;
use std::time::Duration;

use tokio::time::{sleep_until, Instant, Sleep};

pub(crate) struct EditableDelay {
    sleep: Pin<Box<Sleep>>,
    start: Instant,
    armed: bool,
    completed: bool,
    generation: u64,
}

impl EditableDelay {
    pub(crate) fn new() -> Self {
        Self {
            sleep: Box::pin(sleep_until(Instant::now())),
            start: Instant::now(),
            armed: false,
            completed: false,
            generation: 0,
        }
    }

    /// Arm (or re-arm) the delay to fire after `run_time` from now.
    /// Returns the generation of this arming.
    pub(crate) fn arm(&mut self, run_time: Duration) -> u64 {
        self.start = Instant::now();
        self.sleep.as_mut().reset(self.start + run_time);
        self.armed = true;
        self.completed = false;
        self.generation += 1;
        self.generation
    }

    /// Re-time a pending delay to fire `run_time` after its original
    /// arming instant. No-op once the delay completed or was stopped.
    #[allow(dead_code)]
    pub(crate) fn update(&mut self, run_time: Duration) {
        if self.completed || !self.armed {
            return;
        }
        self.sleep.as_mut().reset(self.start + run_time);
    }

    /// Disarm without firing. No-op once the delay completed.
    pub(crate) fn stop(&mut self) {
        if self.completed {
            return;
        }
        self.armed = false;
    }

    #[allow(dead_code)]
    pub(crate) fn completed(&self) -> bool {
        self.completed
    }

    #[allow(dead_code)]
    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }

    /// Resolves with the firing generation when the armed deadline is
    /// reached; pends forever while disarmed. Intended as a
    /// `tokio::select!` branch; cancelling the future leaves the delay
    /// untouched.
    pub(crate) async fn wait(&mut self) -> u64 {
        if !self.armed {
            pending::<()>().await;
        }
        self.sleep.as_mut().await;
        self.armed = false;
        self.completed = true;
        self.generation
    }
}
