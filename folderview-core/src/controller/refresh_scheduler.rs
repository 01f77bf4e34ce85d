//! src/controller/refresh_scheduler.rs
//! ============================================================================
//! # RefreshScheduler: coalesces change signals into list rebuilds
//!
//! Collaborators call [`RefreshScheduler::on_change_signal`] from any thread.
//! At most one refresh is scheduled at a time; signals arriving while one is
//! pending are dropped, so a burst of N events yields one rebuild. When the
//! timer fires, [`Action::RefreshDue`] is sent to the owning view.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::mpsc::UnboundedSender;
use tokio::time::{Instant, sleep};
use tracing::{debug, instrument, trace, warn};

use crate::config::RefreshConfig;
use crate::controller::actions::Action;
use crate::fs::provider::ChangeEvent;
use crate::util::debounce::{RefreshDelay, ThrottleState};

struct Inner {
    config: RefreshConfig,
    state: Mutex<ThrottleState>,
    row_count: AtomicUsize,
    action_tx: UnboundedSender<Action>,
    runtime: Handle,
}

impl Inner {
    fn fire(&self, ticket: u64, tier: RefreshDelay) {
        if !self.state.lock().take_if_current(ticket) {
            trace!(ticket, "Cancelled refresh woke up, dropped");
            return;
        }

        debug!(marker = "REFRESH_DUE", tier = %tier, ticket, "Scheduled refresh fired");

        if self.action_tx.send(Action::RefreshDue).is_err() {
            warn!("Refresh dropped: notification channel closed");
        }
    }
}

/// Cloneable, `Send` handle; every clone drives the same timer.
#[derive(Clone)]
pub struct RefreshScheduler {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for RefreshScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshScheduler")
            .field("config", &self.inner.config)
            .field("row_count", &self.row_count())
            .field("pending", &self.is_pending())
            .finish()
    }
}

impl RefreshScheduler {
    #[must_use]
    pub fn new(config: RefreshConfig, action_tx: UnboundedSender<Action>, runtime: Handle) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                state: Mutex::new(ThrottleState::new()),
                row_count: AtomicUsize::new(0),
                action_tx,
                runtime,
            }),
        }
    }

    /// Schedule a refresh unless one is already pending. Returns the chosen
    /// tier, or `None` when the signal was coalesced.
    #[instrument(
        level = "trace",
        skip(self),
        fields(operation_type = "refresh_schedule")
    )]
    pub fn on_change_signal(&self, event: ChangeEvent) -> Option<RefreshDelay> {
        let mut state = self.inner.state.lock();

        if state.is_pending() {
            trace!(%event, "Refresh already pending, signal coalesced");
            return None;
        }

        let rows = self.row_count();
        let tier = RefreshDelay::choose(state.since_last_refresh(), rows, &self.inner.config);
        let delay = tier.duration(&self.inner.config);

        debug!(
            marker = "REFRESH_SCHEDULED",
            %event,
            tier = %tier,
            delay_ms = delay.as_millis() as u64,
            rows,
            "Refresh scheduled"
        );

        let ticket = state.issue_ticket();
        let inner = Arc::clone(&self.inner);
        let handle = self.inner.runtime.spawn(async move {
            sleep(delay).await;
            inner.fire(ticket, tier);
        });

        state.arm(ticket, handle);
        Some(tier)
    }

    /// Drop a scheduled refresh, e.g. when a reload is forced.
    pub fn cancel_pending(&self) -> bool {
        self.inner.state.lock().cancel_pending()
    }

    /// Record completion of a rebuild; feeds the next tier decision.
    pub fn record_refresh(&self) {
        self.inner.state.lock().mark_refreshed(Instant::now());
    }

    pub fn set_row_count(&self, rows: usize) {
        self.inner.row_count.store(rows, Ordering::Relaxed);
    }

    #[must_use]
    pub fn row_count(&self) -> usize {
        self.inner.row_count.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.inner.state.lock().is_pending()
    }

    #[must_use]
    pub fn config(&self) -> &RefreshConfig {
        &self.inner.config
    }
}
