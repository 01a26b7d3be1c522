use std::time::{SystemTime, UNIX_EPOCH};
use tokio::time::Instant;

/// Millisecond wall clock anchored once and advanced by tokio's monotonic timer.
///
/// Readings never go backwards, so `triggered_at` stays non-decreasing per
/// record. Under a paused tokio runtime the clock advances with virtual time,
/// which keeps cooldown timing deterministic in tests.
#[derive(Debug, Clone, Copy)]
pub struct Clock {
    epoch_ms: i64,
    origin: Instant,
}

impl Clock {
    /// Clock reading the current system time.
    pub fn system() -> Self {
        let epoch_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0);
        Self::starting_at(epoch_ms)
    }

    /// Clock whose first reading is `epoch_ms`.
    pub fn starting_at(epoch_ms: i64) -> Self {
        Self {
            epoch_ms,
            origin: Instant::now(),
        }
    }

    pub fn now_ms(&self) -> i64 {
        self.epoch_ms + self.origin.elapsed().as_millis() as i64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn advances_with_virtual_time() {
        let clock = Clock::starting_at(1_000);
        assert_eq!(clock.now_ms(), 1_000);
        tokio::time::sleep(Duration::from_millis(250)).await;
        assert_eq!(clock.now_ms(), 1_250);
    }

    #[test]
    fn system_clock_is_after_2020() {
        assert!(Clock::system().now_ms() > 1_577_836_800_000);
    }
}
