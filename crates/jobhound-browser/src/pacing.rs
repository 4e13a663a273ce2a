use rand::Rng;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Randomized minimum spacing between page interactions.
///
/// Each call to [`ActionPacer::pause`] draws a target gap from
/// `[min_delay, max_delay]` and sleeps for whatever part of it has not
/// already elapsed since the previous action.
#[derive(Debug)]
pub struct ActionPacer {
    min_delay: Duration,
    max_delay: Duration,
    last_action: Mutex<Option<Instant>>,
}

impl ActionPacer {
    pub fn new(min_delay_ms: u64, max_delay_ms: u64) -> Self {
        let (lo, hi) = if min_delay_ms <= max_delay_ms {
            (min_delay_ms, max_delay_ms)
        } else {
            (max_delay_ms, min_delay_ms)
        };
        Self {
            min_delay: Duration::from_millis(lo),
            max_delay: Duration::from_millis(hi),
            last_action: Mutex::new(None),
        }
    }

    /// A pacer that never waits.
    pub fn disabled() -> Self {
        Self::new(0, 0)
    }

    /// Draw the next target gap.
    pub fn next_gap(&self) -> Duration {
        if self.max_delay <= self.min_delay {
            return self.min_delay;
        }
        let lo = u64::try_from(self.min_delay.as_millis()).unwrap_or(u64::MAX);
        let hi = u64::try_from(self.max_delay.as_millis()).unwrap_or(u64::MAX);
        Duration::from_millis(rand::thread_rng().gen_range(lo..=hi))
    }

    /// How long to wait right now before the next action.
    fn remaining(&self, gap: Duration) -> Duration {
        let last = self
            .last_action
            .lock()
            .map(|guard| *guard)
            .unwrap_or_default();
        match last {
            Some(at) => gap.saturating_sub(at.elapsed()),
            None => Duration::ZERO,
        }
    }

    fn mark(&self) {
        if let Ok(mut guard) = self.last_action.lock() {
            *guard = Some(Instant::now());
        }
    }

    /// Wait out the randomized gap. Returns `false` if cancelled while waiting.
    pub async fn pause(&self, cancel: &CancellationToken) -> bool {
        let wait = self.remaining(self.next_gap());
        if !wait.is_zero() {
            tracing::trace!(delay_ms = wait.as_millis() as u64, "pacing next action");
            tokio::select! {
                () = cancel.cancelled() => return false,
                () = tokio::time::sleep(wait) => {}
            }
        }
        self.mark();
        !cancel.is_cancelled()
    }
}
