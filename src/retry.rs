// Bounded-retry helper shared by the clipboard stable read and the event
// tap recovery burst. The sleeper is injectable so tests never sleep.

use std::time::Duration;

/// Abstraction over `thread::sleep` so retry schedules are testable.
pub trait Sleeper: Send + Sync {
    fn sleep(&self, duration: Duration);
}

/// Production sleeper backed by the OS.
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Run `attempt` once per entry in `schedule`, sleeping the entry's delay
/// before each try. Stops at the first `Some` and returns it.
///
/// A schedule of `[0ms, 50ms, 100ms]` means: try immediately, then after
/// 50ms, then after another 100ms.
pub fn run_schedule<T>(
    schedule: &[Duration],
    sleeper: &dyn Sleeper,
    mut attempt: impl FnMut(usize) -> Option<T>,
) -> Option<T> {
    for (index, delay) in schedule.iter().enumerate() {
        if !delay.is_zero() {
            sleeper.sleep(*delay);
        }
        if let Some(value) = attempt(index) {
            return Some(value);
        }
    }
    None
}

/// Build a uniform schedule of `attempts` entries `delay` apart, with an
/// immediate first try.
pub fn uniform_schedule(attempts: usize, delay: Duration) -> Vec<Duration> {
    (0..attempts)
        .map(|i| if i == 0 { Duration::ZERO } else { delay })
        .collect()
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::Sleeper;
    use parking_lot::Mutex;
    use std::time::Duration;

    /// Records requested delays instead of sleeping.
    #[derive(Default)]
    pub struct RecordingSleeper {
        pub slept: Mutex<Vec<Duration>>,
    }

    impl Sleeper for RecordingSleeper {
        fn sleep(&self, duration: Duration) {
            self.slept.lock().push(duration);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::RecordingSleeper;
    use super::*;

    #[test]
    fn first_success_stops_the_schedule() {
        let sleeper = RecordingSleeper::default();
        let schedule = uniform_schedule(4, Duration::from_millis(50));
        let mut calls = 0;
        let result = run_schedule(&schedule, &sleeper, |_| {
            calls += 1;
            if calls == 2 {
                Some(calls)
            } else {
                None
            }
        });
        assert_eq!(result, Some(2));
        assert_eq!(calls, 2);
        // Immediate first try, one sleep before the second.
        assert_eq!(sleeper.slept.lock().len(), 1);
    }

    #[test]
    fn exhausted_schedule_returns_none() {
        let sleeper = RecordingSleeper::default();
        let schedule = uniform_schedule(3, Duration::from_millis(10));
        let result: Option<()> = run_schedule(&schedule, &sleeper, |_| None);
        assert!(result.is_none());
        assert_eq!(sleeper.slept.lock().len(), 2);
    }

    #[test]
    fn non_uniform_delays_are_respected() {
        let sleeper = RecordingSleeper::default();
        let schedule = [
            Duration::ZERO,
            Duration::from_millis(50),
            Duration::from_millis(100),
            Duration::from_millis(200),
        ];
        let result: Option<()> = run_schedule(&schedule, &sleeper, |_| None);
        assert!(result.is_none());
        assert_eq!(
            *sleeper.slept.lock(),
            vec![
                Duration::from_millis(50),
                Duration::from_millis(100),
                Duration::from_millis(200),
            ]
        );
    }

    #[test]
    fn attempt_receives_its_index() {
        let sleeper = RecordingSleeper::default();
        let schedule = uniform_schedule(3, Duration::from_millis(1));
        let mut seen = Vec::new();
        let _: Option<()> = run_schedule(&schedule, &sleeper, |i| {
            seen.push(i);
            None
        });
        assert_eq!(seen, vec![0, 1, 2]);
    }
}
