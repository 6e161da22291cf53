use tokio::time::Instant;

/// Measures the elapsed time of a single dial-up session.
///
/// Driven entirely by the [`crate::modem::Modem`] — it has no notion of
/// clients, commands, or the network, only `start`/`stop`/`reset`.
#[derive(Debug, Clone, Copy)]
pub struct Timer {
    start_instant: Instant,
    stop_instant: Instant,
    is_running: bool,
}

impl Timer {
    /// A fresh timer: not running, zero elapsed.
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            start_instant: now,
            stop_instant: now,
            is_running: false,
        }
    }

    /// Start the timer. No-op if already running.
    pub fn start(&mut self) {
        if !self.is_running {
            self.start_instant = Instant::now();
            self.is_running = true;
        }
    }

    /// Stop the timer, freezing `elapsed_seconds`. Idempotent.
    pub fn stop(&mut self) {
        if self.is_running {
            self.stop_instant = Instant::now();
            self.is_running = false;
        }
    }

    /// Reset both instants to now. Does not change whether the timer is running.
    pub fn reset(&mut self) {
        let now = Instant::now();
        self.start_instant = now;
        self.stop_instant = now;
    }

    pub fn is_running(&self) -> bool {
        self.is_running
    }

    /// Seconds since `start`, frozen at the stop point once stopped.
    pub fn elapsed_seconds(&self) -> u64 {
        if self.is_running {
            Instant::now().saturating_duration_since(self.start_instant).as_secs()
        } else {
            self.stop_instant.saturating_duration_since(self.start_instant).as_secs()
        }
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn new_timer_is_stopped_at_zero() {
        let t = Timer::new();
        assert!(!t.is_running());
        assert_eq!(t.elapsed_seconds(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn start_advances_elapsed() {
        let mut t = Timer::new();
        t.start();
        tokio::time::advance(Duration::from_secs(5)).await;
        assert_eq!(t.elapsed_seconds(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn start_is_idempotent() {
        let mut t = Timer::new();
        t.start();
        tokio::time::advance(Duration::from_secs(3)).await;
        t.start(); // no-op, should not reset start_instant
        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(t.elapsed_seconds(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_freezes_elapsed() {
        let mut t = Timer::new();
        t.start();
        tokio::time::advance(Duration::from_secs(4)).await;
        t.stop();
        let frozen = t.elapsed_seconds();
        assert_eq!(frozen, 4);
        tokio::time::advance(Duration::from_secs(10)).await;
        assert_eq!(t.elapsed_seconds(), frozen);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_is_idempotent() {
        let mut t = Timer::new();
        t.start();
        tokio::time::advance(Duration::from_secs(4)).await;
        t.stop();
        tokio::time::advance(Duration::from_secs(10)).await;
        t.stop(); // no-op, stop_instant unchanged
        assert_eq!(t.elapsed_seconds(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn reset_does_not_change_running_state() {
        let mut t = Timer::new();
        t.start();
        tokio::time::advance(Duration::from_secs(4)).await;
        t.reset();
        assert!(t.is_running());
        assert_eq!(t.elapsed_seconds(), 0);

        let mut stopped = Timer::new();
        stopped.reset();
        assert!(!stopped.is_running());
    }
}
