// Repeated-copy detector. Two consecutive copies of the same text inside
// a bounded window fire the content processor once; a cooldown stops the
// same text from re-firing while the user keeps copying it.

use crate::config::DetectorSettings;
use std::time::{Duration, Instant};

/// Classification of a single observed copy event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CopyVerdict {
    /// Content differs from the previous copy; armed for a repeat.
    Armed,
    /// Second identical copy inside the window; dispatch this content.
    Triggered(String),
    /// Below the minimum length (or blank after trimming).
    TooShort,
    /// Identical content but the delta is key-repeat territory.
    TooFast,
    /// Identical content but too far apart to count as deliberate.
    TooSlow,
    /// Same content triggered recently; suppressed.
    CoolingDown,
    /// A previous trigger is still being processed.
    InFlight,
}

pub struct DoubleCopyDetector {
    min_interval: Duration,
    max_interval: Duration,
    cooldown: Duration,
    min_content_len: usize,
    last_content: Option<String>,
    last_copy_time: Option<Instant>,
    last_triggered_content: Option<String>,
    last_triggered_time: Option<Instant>,
    in_flight: bool,
}

impl DoubleCopyDetector {
    pub fn new(settings: &DetectorSettings) -> Self {
        Self {
            min_interval: Duration::from_millis(settings.min_interval_ms),
            max_interval: Duration::from_millis(settings.max_interval_ms),
            cooldown: Duration::from_millis(settings.cooldown_ms),
            min_content_len: settings.min_content_len,
            last_content: None,
            last_copy_time: None,
            last_triggered_content: None,
            last_triggered_time: None,
            in_flight: false,
        }
    }

    /// Classify one copy event. `now` is passed in rather than sampled so
    /// the timing matrix is testable without real clocks.
    ///
    /// `last_content`/`last_copy_time` are updated on every call, whatever
    /// the verdict; the trigger timestamp is recorded before the caller
    /// gets the `Triggered` verdict, so a copy arriving mid-processing
    /// cannot double-fire.
    pub fn observe(&mut self, content: &str, now: Instant) -> CopyVerdict {
        let trimmed = content.trim();
        let verdict = self.classify(trimmed, now);
        self.last_content = Some(trimmed.to_string());
        self.last_copy_time = Some(now);
        if let CopyVerdict::Triggered(_) = verdict {
            self.last_triggered_content = Some(trimmed.to_string());
            self.last_triggered_time = Some(now);
            self.in_flight = true;
        }
        verdict
    }

    /// Mark the dispatched trigger as finished, allowing the next one.
    pub fn complete_trigger(&mut self) {
        self.in_flight = false;
    }

    fn classify(&self, trimmed: &str, now: Instant) -> CopyVerdict {
        if trimmed.chars().count() < self.min_content_len {
            return CopyVerdict::TooShort;
        }
        let same_content = self.last_content.as_deref() == Some(trimmed);
        if !same_content {
            return CopyVerdict::Armed;
        }
        let elapsed = match self.last_copy_time {
            Some(t) => now.duration_since(t),
            None => return CopyVerdict::Armed,
        };
        if elapsed <= self.min_interval {
            return CopyVerdict::TooFast;
        }
        if elapsed >= self.max_interval {
            return CopyVerdict::TooSlow;
        }
        if self.in_cooldown(trimmed, now) {
            return CopyVerdict::CoolingDown;
        }
        if self.in_flight {
            return CopyVerdict::InFlight;
        }
        CopyVerdict::Triggered(trimmed.to_string())
    }

    fn in_cooldown(&self, trimmed: &str, now: Instant) -> bool {
        match (&self.last_triggered_content, self.last_triggered_time) {
            (Some(content), Some(t)) => {
                content == trimmed && now.duration_since(t) < self.cooldown
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detector() -> DoubleCopyDetector {
        DoubleCopyDetector::new(&DetectorSettings::default())
    }

    fn secs(base: Instant, s: f64) -> Instant {
        base + Duration::from_secs_f64(s)
    }

    #[test]
    fn two_copies_one_second_apart_trigger_once() {
        let base = Instant::now();
        let mut d = detector();
        assert_eq!(d.observe("hello", base), CopyVerdict::Armed);
        assert_eq!(
            d.observe("hello", secs(base, 1.0)),
            CopyVerdict::Triggered("hello".into())
        );
    }

    #[test]
    fn third_copy_inside_cooldown_is_suppressed() {
        let base = Instant::now();
        let mut d = detector();
        d.observe("hello", base);
        d.observe("hello", secs(base, 1.0));
        d.complete_trigger();
        assert_eq!(d.observe("hello", secs(base, 2.0)), CopyVerdict::CoolingDown);
    }

    #[test]
    fn same_content_after_cooldown_triggers_again() {
        let base = Instant::now();
        let mut d = detector();
        d.observe("hello", base);
        d.observe("hello", secs(base, 1.0));
        d.complete_trigger();
        // 4s after the triggering copy: outside the 3s cooldown, inside
        // the 5s pairing window relative to that copy.
        assert_eq!(
            d.observe("hello", secs(base, 5.0)),
            CopyVerdict::Triggered("hello".into())
        );
    }

    #[test]
    fn key_repeat_delta_does_not_trigger() {
        let base = Instant::now();
        let mut d = detector();
        d.observe("hello", base);
        assert_eq!(d.observe("hello", secs(base, 0.05)), CopyVerdict::TooFast);
    }

    #[test]
    fn unrelated_copies_far_apart_do_not_trigger() {
        let base = Instant::now();
        let mut d = detector();
        d.observe("hello", base);
        assert_eq!(d.observe("hello", secs(base, 6.0)), CopyVerdict::TooSlow);
        // The slow copy still re-armed the detector.
        assert_eq!(
            d.observe("hello", secs(base, 7.0)),
            CopyVerdict::Triggered("hello".into())
        );
    }

    #[test]
    fn different_content_rearms() {
        let base = Instant::now();
        let mut d = detector();
        d.observe("hello", base);
        assert_eq!(d.observe("world", secs(base, 1.0)), CopyVerdict::Armed);
        assert_eq!(
            d.observe("world", secs(base, 2.0)),
            CopyVerdict::Triggered("world".into())
        );
    }

    #[test]
    fn short_content_never_triggers() {
        let base = Instant::now();
        let mut d = detector();
        assert_eq!(d.observe("a", base), CopyVerdict::TooShort);
        assert_eq!(d.observe("a", secs(base, 1.0)), CopyVerdict::TooShort);
    }

    #[test]
    fn whitespace_is_normalized_before_comparison() {
        let base = Instant::now();
        let mut d = detector();
        d.observe("  hello\n", base);
        assert_eq!(
            d.observe("hello", secs(base, 1.0)),
            CopyVerdict::Triggered("hello".into())
        );
    }

    #[test]
    fn trigger_in_flight_blocks_the_next_one() {
        let base = Instant::now();
        let mut d = detector();
        d.observe("hello world", base);
        d.observe("hello world", secs(base, 1.0));
        // No complete_trigger yet; a fresh pair of a different text must
        // wait for the running one.
        d.observe("other text", secs(base, 1.5));
        assert_eq!(
            d.observe("other text", secs(base, 2.5)),
            CopyVerdict::InFlight
        );
        d.complete_trigger();
        assert_eq!(
            d.observe("other text", secs(base, 3.5)),
            CopyVerdict::Triggered("other text".into())
        );
    }
}
