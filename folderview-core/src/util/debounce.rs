//!  src/util/debounce.rs
//!  ===================================================================
//!  Tiered debounce / throttle decisions for list refreshes.
//!
//!  The tier choice is a pure function of the time since the last
//!  completed refresh and the current row count; the timer itself lives
//!  in [`ThrottleState`], which holds at most one pending sleeper. Each
//!  sleeper carries a ticket and may only fire while its ticket is the
//!  pending one, so a cancelled sleeper that already woke sends nothing.

use std::time::Duration;

use tokio::{task::JoinHandle, time::Instant};
use tracing::trace;

use crate::config::RefreshConfig;

/* ========================== RefreshDelay ============================ */

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RefreshDelay {
    /// Idle long enough: refresh almost at once.
    Immediate,

    /// Small list refreshed recently: short debounce.
    Short,

    /// Large list refreshed recently: coalesce into one deferred rebuild.
    Long,
}

impl RefreshDelay {
    /// Pick the tier. `since_last` is `None` before the first refresh.
    #[must_use]
    pub fn choose(since_last: Option<Duration>, row_count: usize, cfg: &RefreshConfig) -> Self {
        match since_last {
            None => Self::Immediate,
            Some(elapsed) if elapsed > cfg.idle_threshold => Self::Immediate,
            Some(_) if row_count < cfg.small_list_rows => Self::Short,
            Some(_) => Self::Long,
        }
    }

    #[must_use]
    pub const fn duration(self, cfg: &RefreshConfig) -> Duration {
        match self {
            Self::Immediate => cfg.immediate_delay,
            Self::Short => cfg.short_delay,
            Self::Long => cfg.long_delay,
        }
    }
}

impl std::fmt::Display for RefreshDelay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s: &str = match self {
            Self::Immediate => "immediate",
            Self::Short => "short",
            Self::Long => "long",
        };

        write!(f, "{s}")
    }
}

/* ========================== ThrottleState =========================== */

#[derive(Debug)]
struct PendingRefresh {
    ticket: u64,
    handle: JoinHandle<()>,
}

#[derive(Debug, Default)]
pub struct ThrottleState {
    //  Completion time of the previous refresh.
    last_refresh: Option<Instant>,
    //  The single scheduled refresh, if any.
    pending: Option<PendingRefresh>,
    next_ticket: u64,
}

impl ThrottleState {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            last_refresh: None,
            pending: None,
            next_ticket: 0,
        }
    }

    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.pending
            .as_ref()
            .is_some_and(|pending: &PendingRefresh| !pending.handle.is_finished())
    }

    /// Ticket for the next sleeper; hand it to the sleeper before arming.
    pub fn issue_ticket(&mut self) -> u64 {
        self.next_ticket += 1;
        self.next_ticket
    }

    /// Store a freshly spawned sleeper; returns false (and aborts the new
    /// one) when another refresh is still pending.
    pub fn arm(&mut self, ticket: u64, handle: JoinHandle<()>) -> bool {
        if self.is_pending() {
            handle.abort();
            return false;
        }

        self.pending = Some(PendingRefresh { ticket, handle });
        true
    }

    /// Called by a woken sleeper. Clears the pending marker and returns
    /// true only if `ticket` is still the pending one.
    pub fn take_if_current(&mut self, ticket: u64) -> bool {
        if self
            .pending
            .as_ref()
            .is_some_and(|pending: &PendingRefresh| pending.ticket == ticket)
        {
            self.pending = None;
            return true;
        }

        false
    }

    /// Abort a scheduled refresh that has not fired yet.
    pub fn cancel_pending(&mut self) -> bool {
        match self.pending.take() {
            Some(pending) if !pending.handle.is_finished() => {
                trace!(ticket = pending.ticket, "Aborting pending refresh");
                pending.handle.abort();
                true
            }
            _ => false,
        }
    }

    pub fn mark_refreshed(&mut self, at: Instant) {
        self.last_refresh = Some(at);
    }

    #[must_use]
    pub const fn last_refresh(&self) -> Option<Instant> {
        self.last_refresh
    }

    #[must_use]
    pub fn since_last_refresh(&self) -> Option<Duration> {
        self.last_refresh.map(|at: Instant| at.elapsed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_selection() {
        let cfg = RefreshConfig::default();
        let recent = Some(Duration::from_secs(1));
        let idle = Some(cfg.idle_threshold + Duration::from_millis(1));

        assert_eq!(RefreshDelay::choose(None, 10_000, &cfg), RefreshDelay::Immediate);
        assert_eq!(RefreshDelay::choose(idle, 10_000, &cfg), RefreshDelay::Immediate);
        assert_eq!(RefreshDelay::choose(recent, 10, &cfg), RefreshDelay::Short);
        assert_eq!(
            RefreshDelay::choose(recent, cfg.small_list_rows, &cfg),
            RefreshDelay::Long
        );
    }

    #[test]
    fn test_durations_follow_config() {
        let cfg = RefreshConfig::default();
        assert_eq!(RefreshDelay::Immediate.duration(&cfg), Duration::from_millis(100));
        assert_eq!(RefreshDelay::Short.duration(&cfg), Duration::from_secs(2));
        assert_eq!(RefreshDelay::Long.duration(&cfg), Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn test_only_one_sleeper_armed() {
        let mut state = ThrottleState::new();

        let first = tokio::spawn(tokio::time::sleep(Duration::from_secs(10)));
        let second = tokio::spawn(tokio::time::sleep(Duration::from_secs(10)));

        let ticket = state.issue_ticket();
        assert!(state.arm(ticket, first));
        let late = state.issue_ticket();
        assert!(!state.arm(late, second));
        assert!(state.is_pending());

        assert!(state.cancel_pending());
        assert!(!state.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_ticket_cannot_fire() {
        let mut state = ThrottleState::new();

        let old = state.issue_ticket();
        state.arm(old, tokio::spawn(tokio::time::sleep(Duration::from_secs(10))));
        state.cancel_pending();
        assert!(!state.take_if_current(old));

        let new = state.issue_ticket();
        state.arm(new, tokio::spawn(tokio::time::sleep(Duration::from_secs(10))));
        assert!(!state.take_if_current(old));
        assert!(state.is_pending());

        assert!(state.take_if_current(new));
        assert!(!state.is_pending());
    }
}
