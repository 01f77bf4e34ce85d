//! src/controller/actions.rs
//! ============================================================================
//! # Actions: messages on the view's single notification channel
//!
//! Background work (refresh timers, listings, filter and count passes) never
//! touches view state directly; it sends an `Action` that the owning
//! [`FolderView`](super::folder_view::FolderView) applies on its own task.

use std::sync::Arc;
use std::time::Duration;

use crate::error::ViewResult;
use crate::fs::candidate::CandidateItem;
use crate::fs::provider::Membership;
use crate::operators::filter_task::{FilteredResult, StatusCounts};

#[derive(Debug)]
pub enum Action {
    /// A scheduled refresh fired; rebuild the candidate list.
    RefreshDue,

    /// A listing finished on a blocking worker.
    CandidatesLoaded {
        /// Reload sequence number; older loads are ignored.
        load_id: u64,
        result: ViewResult<Vec<CandidateItem>>,
        membership: Membership,
        elapsed: Duration,
    },

    /// The current filter generation published its result.
    FilterPublished(Arc<FilteredResult>),

    /// The count task of the current generation finished.
    CountsPublished { generation: u64, counts: StatusCounts },
}

impl Action {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::RefreshDue => "refresh_due",
            Self::CandidatesLoaded { .. } => "candidates_loaded",
            Self::FilterPublished(_) => "filter_published",
            Self::CountsPublished { .. } => "counts_published",
        }
    }
}
