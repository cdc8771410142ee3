/// Fixed-timestep accumulator: converts wall-clock time into whole ticks.
///
/// Elapsed time is accumulated; each full tick duration in the accumulator
/// is one simulation tick. At most `max_catch_up` ticks are handed out per
/// frame, and any backlog beyond that is dropped so a long stall cannot
/// turn into an ever-growing catch-up loop.

use std::time::Duration;

#[derive(Clone, Debug)]
pub struct FixedTimestep {
    step: Duration,
    accumulator: Duration,
    max_catch_up: u32,
}

impl FixedTimestep {
    pub fn new(ticks_per_second: u32, max_catch_up: u32) -> Self {
        FixedTimestep {
            step: Duration::from_secs(1) / ticks_per_second.max(1),
            accumulator: Duration::ZERO,
            max_catch_up: max_catch_up.max(1),
        }
    }

    pub fn step(&self) -> Duration {
        self.step
    }

    /// Add `elapsed` and return how many ticks to run now.
    pub fn accumulate(&mut self, elapsed: Duration) -> u32 {
        self.accumulator += elapsed;

        let mut ticks = 0;
        while self.accumulator >= self.step && ticks < self.max_catch_up {
            self.accumulator -= self.step;
            ticks += 1;
        }

        if self.accumulator >= self.step {
            let dropped = self.accumulator.as_nanos() / self.step.as_nanos();
            tracing::debug!(dropped_ticks = dropped as u64, "simulation fell behind, dropping backlog");
            self.accumulator = Duration::ZERO;
        }
        ticks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whole_ticks_and_remainder() {
        let mut ts = FixedTimestep::new(50, 5); // 20ms ticks
        assert_eq!(ts.accumulate(Duration::from_millis(15)), 0);
        assert_eq!(ts.accumulate(Duration::from_millis(10)), 1); // 25ms → 1, 5ms left
        assert_eq!(ts.accumulate(Duration::from_millis(35)), 2); // 40ms → 2
        assert_eq!(ts.accumulate(Duration::from_millis(19)), 0);
        assert_eq!(ts.accumulate(Duration::from_millis(1)), 1);
    }

    #[test]
    fn catch_up_is_capped_and_backlog_dropped() {
        let mut ts = FixedTimestep::new(50, 3);
        assert_eq!(ts.accumulate(Duration::from_secs(2)), 3);
        // Backlog is gone; the next short frame does not replay it.
        assert_eq!(ts.accumulate(Duration::from_millis(10)), 0);
    }

    #[test]
    fn step_from_rate() {
        assert_eq!(FixedTimestep::new(50, 1).step(), Duration::from_millis(20));
    }
}
