//! Progress event rate limiting
//!
//! Engines fire progress hooks far faster than any consumer wants to redraw.
//! [`ProgressThrottle`] drops events down to a consumer-friendly cadence
//! without ever losing the first event or the completion signal.

use std::time::{Duration, Instant};

/// Minimum interval between time-driven emissions.
const EMIT_INTERVAL: Duration = Duration::from_millis(250);

/// Percent delta that forces an emission regardless of the interval.
const EMIT_PERCENT_DELTA: f64 = 0.5;

/// Rate limiter over a raw progress event stream
///
/// An event passes when any of the following holds:
/// - it is the first event seen,
/// - at least 250 ms elapsed since the last emission,
/// - the percentage moved at least 0.5 since the last emission,
/// - downloaded bytes reached the known total.
///
/// Everything else is dropped silently.
#[derive(Debug, Default)]
pub struct ProgressThrottle {
    last_emit: Option<Instant>,
    last_percent: f64,
}

impl ProgressThrottle {
    /// Create a throttle that has seen no events yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Decide whether the event observed right now should be emitted.
    pub fn should_emit(&mut self, percent: f64, downloaded: u64, total: Option<u64>) -> bool {
        self.should_emit_at(Instant::now(), percent, downloaded, total)
    }

    /// Decide with an explicit observation instant.
    pub fn should_emit_at(
        &mut self,
        now: Instant,
        percent: f64,
        downloaded: u64,
        total: Option<u64>,
    ) -> bool {
        let emit = match self.last_emit {
            None => true,
            Some(last) => {
                now.duration_since(last) >= EMIT_INTERVAL
                    || (percent - self.last_percent).abs() >= EMIT_PERCENT_DELTA
                    || total.is_some_and(|t| t > 0 && downloaded >= t)
            }
        };

        if emit {
            self.last_emit = Some(now);
            self.last_percent = percent;
        }
        emit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_event_always_emits() {
        let mut throttle = ProgressThrottle::new();
        let now = Instant::now();
        assert!(throttle.should_emit_at(now, 0.0, 0, None));
    }

    #[test]
    fn events_inside_the_window_with_small_delta_are_dropped() {
        let mut throttle = ProgressThrottle::new();
        let start = Instant::now();
        assert!(throttle.should_emit_at(start, 10.0, 100, Some(1000)));

        let a_bit_later = start + Duration::from_millis(50);
        assert!(
            !throttle.should_emit_at(a_bit_later, 10.1, 101, Some(1000)),
            "50ms and 0.1 percent is below both thresholds"
        );
        assert!(!throttle.should_emit_at(a_bit_later, 10.2, 102, Some(1000)));
    }

    #[test]
    fn elapsed_window_forces_emission() {
        let mut throttle = ProgressThrottle::new();
        let start = Instant::now();
        assert!(throttle.should_emit_at(start, 10.0, 100, Some(1000)));

        let later = start + Duration::from_millis(250);
        assert!(throttle.should_emit_at(later, 10.1, 101, Some(1000)));
    }

    #[test]
    fn percent_delta_forces_emission_inside_the_window() {
        let mut throttle = ProgressThrottle::new();
        let start = Instant::now();
        assert!(throttle.should_emit_at(start, 10.0, 100, Some(1000)));

        let soon = start + Duration::from_millis(10);
        assert!(
            throttle.should_emit_at(soon, 10.5, 105, Some(1000)),
            "0.5 percent delta overrides the time window"
        );
    }

    #[test]
    fn percent_delta_is_measured_from_last_emission_not_last_event() {
        let mut throttle = ProgressThrottle::new();
        let start = Instant::now();
        assert!(throttle.should_emit_at(start, 10.0, 100, Some(1000)));

        let t1 = start + Duration::from_millis(10);
        assert!(!throttle.should_emit_at(t1, 10.3, 103, Some(1000)));

        // 10.6 is 0.3 from the last *event* but 0.6 from the last *emission*
        let t2 = start + Duration::from_millis(20);
        assert!(throttle.should_emit_at(t2, 10.6, 106, Some(1000)));
    }

    #[test]
    fn completion_always_emits_even_inside_the_window() {
        let mut throttle = ProgressThrottle::new();
        let start = Instant::now();
        assert!(throttle.should_emit_at(start, 99.9, 999, Some(1000)));

        let immediately = start + Duration::from_millis(1);
        assert!(
            throttle.should_emit_at(immediately, 100.0, 1000, Some(1000)),
            "downloaded == total must never be dropped"
        );
    }

    #[test]
    fn completion_check_ignores_unknown_or_zero_totals() {
        let mut throttle = ProgressThrottle::new();
        let start = Instant::now();
        assert!(throttle.should_emit_at(start, 0.0, 100, None));

        let soon = start + Duration::from_millis(5);
        assert!(
            !throttle.should_emit_at(soon, 0.0, 200, None),
            "without a total there is no completion signal"
        );
        assert!(
            !throttle.should_emit_at(soon, 0.0, 200, Some(0)),
            "a zero total must not count as completion"
        );
    }

    #[test]
    fn at_most_one_emission_per_window_under_steady_drip() {
        let mut throttle = ProgressThrottle::new();
        let start = Instant::now();
        let mut emitted = 0;

        // 100 events over one second, percent creeping up by 0.01 each
        for i in 0..100 {
            let at = start + Duration::from_millis(i * 10);
            let percent = i as f64 * 0.01;
            if throttle.should_emit_at(at, percent, i, None) {
                emitted += 1;
            }
        }

        // First event at t=0, then one at each of t=250, 500, 750
        assert_eq!(
            emitted, 4,
            "a steady sub-threshold drip emits only on window boundaries"
        );
    }
}
