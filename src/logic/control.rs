//! Loop Control - state shared between the shell and the fixer thread
//!
//! Everything here sits behind ONE mutex, held only to copy values in or out.
//! The condvar wakes the worker's tick sleep on cancel and lets a pending
//! warning wait for the shell to consume the previous one.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use chrono::{DateTime, Local};
use parking_lot::{Condvar, Mutex};
use serde::Serialize;

use crate::logic::fixer::TickOutcome;

/// How long a blocked warning waits before re-checking the slot
const WARNING_RETRY: Duration = Duration::from_millis(100);

#[derive(Default)]
struct ControlState {
    disabled: bool,
    disabled_until: Option<(Instant, DateTime<Local>)>,
    refresh_requested: bool,
    cancelled: bool,
    warning: Option<String>,
    fatal: Option<String>,
    last_outcome: Option<TickOutcome>,
    last_tick_at: Option<DateTime<Local>>,
    /// Whitelist path the worker switched to, not yet seen by the shell
    whitelist_path: Option<PathBuf>,
}

impl ControlState {
    /// (disabled, timed disable just expired). Logging is left to the caller
    /// once the lock is released.
    fn disabled_now(&mut self) -> (bool, bool) {
        if self.disabled {
            return (true, false);
        }
        match self.disabled_until {
            Some((until, _)) if Instant::now() < until => (true, false),
            Some(_) => {
                self.disabled_until = None;
                (false, true)
            }
            None => (false, false),
        }
    }
}

fn log_expired(expired: bool) {
    if expired {
        log::info!("Timed disable expired, resuming");
    }
}

/// Snapshot for the `status` command
#[derive(Debug, Clone, Serialize)]
pub struct ControlStatus {
    pub disabled: bool,
    pub disabled_until: Option<DateTime<Local>>,
    pub last_outcome: Option<TickOutcome>,
    pub last_tick_at: Option<DateTime<Local>>,
}

#[derive(Default)]
pub struct LoopControl {
    state: Mutex<ControlState>,
    wake: Condvar,
}

impl LoopControl {
    pub fn new() -> Self {
        Self::default()
    }

    // ------------------------------------------------------------------
    // Enable / disable
    // ------------------------------------------------------------------

    /// Indefinite pause (or resume); clears any timed disable
    pub fn set_disabled(&self, disabled: bool) {
        let mut state = self.state.lock();
        state.disabled = disabled;
        state.disabled_until = None;
    }

    /// Pause for a while, then resume by itself. A duration past the clock's
    /// range pauses indefinitely.
    pub fn disable_for(&self, duration: Duration) {
        let Some(until) = Instant::now().checked_add(duration) else {
            log::warn!("Pause of {:?} is out of range, pausing until resume", duration);
            self.set_disabled(true);
            return;
        };
        let wall_clock = chrono::Duration::from_std(duration)
            .ok()
            .and_then(|d| Local::now().checked_add_signed(d))
            .unwrap_or_else(Local::now);

        let mut state = self.state.lock();
        state.disabled = false;
        state.disabled_until = Some((until, wall_clock));
    }

    pub fn is_disabled(&self) -> bool {
        let (disabled, expired) = self.state.lock().disabled_now();
        log_expired(expired);
        disabled
    }

    // ------------------------------------------------------------------
    // Refresh
    // ------------------------------------------------------------------

    pub fn request_refresh(&self) {
        self.state.lock().refresh_requested = true;
    }

    /// Read-and-clear
    pub fn take_refresh(&self) -> bool {
        std::mem::take(&mut self.state.lock().refresh_requested)
    }

    // ------------------------------------------------------------------
    // Cancellation
    // ------------------------------------------------------------------

    pub fn cancel(&self) {
        self.state.lock().cancelled = true;
        self.wake.notify_all();
    }

    pub fn is_cancelled(&self) -> bool {
        self.state.lock().cancelled
    }

    /// Sleep up to `duration`. Returns false as soon as cancellation arrives.
    /// A duration past the clock's range sleeps until cancelled.
    pub fn sleep(&self, duration: Duration) -> bool {
        let deadline = Instant::now().checked_add(duration);
        let mut state = self.state.lock();

        while !state.cancelled {
            match deadline {
                Some(deadline) => {
                    if self.wake.wait_until(&mut state, deadline).timed_out() {
                        return !state.cancelled;
                    }
                }
                None => self.wake.wait(&mut state),
            }
        }
        false
    }

    // ------------------------------------------------------------------
    // Watched files
    // ------------------------------------------------------------------

    /// Worker side: the whitelist now lives at `path`
    pub fn announce_whitelist_path(&self, path: PathBuf) {
        self.state.lock().whitelist_path = Some(path);
    }

    /// Shell side: read-and-clear
    pub fn take_whitelist_path(&self) -> Option<PathBuf> {
        self.state.lock().whitelist_path.take()
    }

    // ------------------------------------------------------------------
    // Warning / fatal mailbox
    // ------------------------------------------------------------------

    /// Single-slot warning. Waits while the previous warning is unread so
    /// nothing is overwritten; gives up only when cancelled.
    pub fn post_warning(&self, message: String) -> bool {
        let mut state = self.state.lock();
        loop {
            if state.cancelled {
                log::warn!("Dropping warning during shutdown: {}", message);
                return false;
            }
            if state.warning.is_none() {
                state.warning = Some(message);
                self.wake.notify_all();
                return true;
            }
            self.wake.wait_for(&mut state, WARNING_RETRY);
        }
    }

    pub fn take_warning(&self) -> Option<String> {
        let warning = self.state.lock().warning.take();
        if warning.is_some() {
            self.wake.notify_all();
        }
        warning
    }

    /// First fatal report wins
    pub fn report_fatal(&self, message: String) {
        let mut state = self.state.lock();
        if state.fatal.is_none() {
            state.fatal = Some(message);
        }
        self.wake.notify_all();
    }

    pub fn take_fatal(&self) -> Option<String> {
        self.state.lock().fatal.take()
    }

    // ------------------------------------------------------------------
    // Status
    // ------------------------------------------------------------------

    pub fn record_outcome(&self, outcome: TickOutcome) {
        let mut state = self.state.lock();
        state.last_outcome = Some(outcome);
        state.last_tick_at = Some(Local::now());
    }

    pub fn status(&self) -> ControlStatus {
        let (status, expired) = {
            let mut state = self.state.lock();
            let (disabled, expired) = state.disabled_now();
            let status = ControlStatus {
                disabled,
                disabled_until: state.disabled_until.map(|(_, at)| at),
                last_outcome: state.last_outcome,
                last_tick_at: state.last_tick_at,
            };
            (status, expired)
        };
        log_expired(expired);
        status
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_refresh_is_one_shot() {
        let control = LoopControl::new();
        assert!(!control.take_refresh());
        control.request_refresh();
        assert!(control.take_refresh());
        assert!(!control.take_refresh());
    }

    #[test]
    fn test_disable_flags() {
        let control = LoopControl::new();
        assert!(!control.is_disabled());
        control.set_disabled(true);
        assert!(control.is_disabled());
        control.set_disabled(false);
        assert!(!control.is_disabled());
    }

    #[test]
    fn test_timed_disable_expires() {
        let control = LoopControl::new();
        control.disable_for(Duration::from_millis(30));
        assert!(control.is_disabled());
        assert!(control.status().disabled_until.is_some());

        thread::sleep(Duration::from_millis(60));
        assert!(!control.is_disabled());
        assert!(control.status().disabled_until.is_none());
    }

    #[test]
    fn test_expiry_seen_by_status_frees_the_lock() {
        let control = LoopControl::new();
        control.disable_for(Duration::from_millis(10));
        thread::sleep(Duration::from_millis(40));

        let status = control.status();
        assert!(!status.disabled);
        assert!(status.disabled_until.is_none());
        // the lock is free again for both sides
        control.request_refresh();
        assert!(control.take_refresh());
        assert!(!control.is_disabled());
    }

    #[test]
    fn test_sleep_runs_full_duration() {
        let control = LoopControl::new();
        let start = Instant::now();
        assert!(control.sleep(Duration::from_millis(30)));
        assert!(start.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn test_cancel_interrupts_sleep() {
        let control = Arc::new(LoopControl::new());
        let sleeper = {
            let control = control.clone();
            thread::spawn(move || {
                let start = Instant::now();
                let completed = control.sleep(Duration::from_secs(30));
                (completed, start.elapsed())
            })
        };

        thread::sleep(Duration::from_millis(50));
        control.cancel();

        let (completed, elapsed) = sleeper.join().unwrap();
        assert!(!completed);
        assert!(elapsed < Duration::from_secs(5));
        assert!(!control.sleep(Duration::from_secs(30)));
    }

    #[test]
    fn test_sleep_past_clock_range_waits_for_cancel() {
        let control = Arc::new(LoopControl::new());
        let sleeper = {
            let control = control.clone();
            thread::spawn(move || control.sleep(Duration::from_secs(u64::MAX)))
        };

        thread::sleep(Duration::from_millis(50));
        assert!(!sleeper.is_finished());
        control.cancel();
        assert!(!sleeper.join().unwrap());
    }

    #[test]
    fn test_huge_timed_disable_pauses_indefinitely() {
        let control = LoopControl::new();
        control.disable_for(Duration::from_secs(u64::MAX));
        assert!(control.is_disabled());
        assert!(control.status().disabled_until.is_none());

        control.set_disabled(false);
        assert!(!control.is_disabled());
    }

    #[test]
    fn test_whitelist_path_is_one_shot() {
        let control = LoopControl::new();
        assert_eq!(control.take_whitelist_path(), None);
        control.announce_whitelist_path(PathBuf::from("a.txt"));
        control.announce_whitelist_path(PathBuf::from("b.txt"));
        assert_eq!(control.take_whitelist_path(), Some(PathBuf::from("b.txt")));
        assert_eq!(control.take_whitelist_path(), None);
    }

    #[test]
    fn test_warning_waits_for_consumer() {
        let control = Arc::new(LoopControl::new());
        assert!(control.post_warning("first".to_string()));

        let poster = {
            let control = control.clone();
            thread::spawn(move || control.post_warning("second".to_string()))
        };

        thread::sleep(Duration::from_millis(50));
        assert_eq!(control.take_warning().as_deref(), Some("first"));
        assert!(poster.join().unwrap());
        assert_eq!(control.take_warning().as_deref(), Some("second"));
        assert_eq!(control.take_warning(), None);
    }

    #[test]
    fn test_blocked_warning_gives_up_on_cancel() {
        let control = Arc::new(LoopControl::new());
        control.post_warning("unread".to_string());

        let poster = {
            let control = control.clone();
            thread::spawn(move || control.post_warning("late".to_string()))
        };

        thread::sleep(Duration::from_millis(50));
        control.cancel();
        assert!(!poster.join().unwrap());
    }

    #[test]
    fn test_first_fatal_wins() {
        let control = LoopControl::new();
        control.report_fatal("one".to_string());
        control.report_fatal("two".to_string());
        assert_eq!(control.take_fatal().as_deref(), Some("one"));
        assert_eq!(control.take_fatal(), None);
    }

    #[test]
    fn test_status_records_outcome() {
        let control = LoopControl::new();
        assert!(control.status().last_outcome.is_none());
        control.record_outcome(TickOutcome::Disabled);
        let status = control.status();
        assert_eq!(status.last_outcome, Some(TickOutcome::Disabled));
        assert!(status.last_tick_at.is_some());
    }
}
