// Keeping the event tap alive. Modal collaborator UI (dialogs, menus)
// can make the OS silently disable the tap; after any modal interaction
// the orchestrator runs a short burst of ensure_enabled() attempts.

use crate::retry::{run_schedule, Sleeper};
use crate::tap::TapControl;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Attempt delays for one recovery burst: immediate, then widening gaps.
pub const RECOVERY_SCHEDULE: [Duration; 4] = [
    Duration::ZERO,
    Duration::from_millis(50),
    Duration::from_millis(100),
    Duration::from_millis(200),
];

pub const PERMISSION_POLL_ATTEMPTS: usize = 30;
pub const PERMISSION_POLL_INTERVAL: Duration = Duration::from_secs(2);

pub struct TapRecovery {
    tap: Arc<dyn TapControl>,
    sleeper: Arc<dyn Sleeper>,
    in_progress: AtomicBool,
}

impl TapRecovery {
    pub fn new(tap: Arc<dyn TapControl>, sleeper: Arc<dyn Sleeper>) -> Self {
        Self {
            tap,
            sleeper,
            in_progress: AtomicBool::new(false),
        }
    }

    /// Run one recovery burst. Returns true once the tap reports healthy.
    ///
    /// Reentrant calls (a second modal closing while a burst is running)
    /// are collapsed into the running burst and report success; the
    /// running burst is the one doing the work.
    pub fn recover(&self) -> bool {
        if !self.tap.is_running() {
            crate::warn!("event tap is stopped; nothing to recover");
            return false;
        }
        if self.in_progress.swap(true, Ordering::SeqCst) {
            crate::debug!("recovery burst already running, skipping");
            return true;
        }
        let recovered = run_schedule(&RECOVERY_SCHEDULE, self.sleeper.as_ref(), |attempt| {
            if self.tap.ensure_enabled() {
                if attempt > 0 {
                    crate::info!("event tap recovered on attempt {}", attempt + 1);
                }
                Some(())
            } else {
                crate::warn!("event tap still disabled after attempt {}", attempt + 1);
                None
            }
        })
        .is_some();
        self.in_progress.store(false, Ordering::SeqCst);
        recovered
    }
}

/// Poll the accessibility trust probe until granted or the attempt budget
/// runs out. The probe is injected so tests never touch the real API.
pub fn wait_for_permission(
    sleeper: &dyn Sleeper,
    attempts: usize,
    interval: Duration,
    probe: impl Fn() -> bool,
) -> bool {
    let schedule: Vec<Duration> = (0..attempts)
        .map(|i| if i == 0 { Duration::ZERO } else { interval })
        .collect();
    run_schedule(&schedule, sleeper, |attempt| {
        if probe() {
            crate::info!("accessibility permission granted");
            Some(())
        } else {
            crate::trace!("permission not yet granted (attempt {})", attempt + 1);
            None
        }
    })
    .is_some()
}
