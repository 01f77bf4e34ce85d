//! ``src/controller/folder_view.rs``
//! ============================================================================
//! # FolderView: one live view over a synchronized folder
//!
//! Owns the candidate list, the filter engine, the refresh scheduler and the
//! presentation model. Every state change is applied on the task that drives
//! the view (`run`, `process_next` or `process_pending`); background work
//! only ever reaches it through the single action channel. Listener callbacks
//! therefore always run on that task, in publish order.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, trace, warn};

use crate::config::Config;
use crate::controller::actions::Action;
use crate::controller::refresh_scheduler::RefreshScheduler;
use crate::error::{ViewError, ViewResult};
use crate::fs::candidate::{CandidateItem, CandidateList, ItemId};
use crate::fs::provider::{FolderProvider, Membership};
use crate::model::criteria::FilterCriteria;
use crate::model::presentation::{Column, PresentationModel};
use crate::model::selection::SelectionRemap;
use crate::operators::filter_task::{FilterEngine, FilteredResult, StatusCounts};

/// UI-side observer. All methods run on the view's own task.
pub trait ViewListener: Send {
    /// New rows were installed.
    fn filter_changed(&mut self, _result: &FilteredResult) {}

    fn count_changed(&mut self, _counts: StatusCounts) {}

    /// Selected rows after an install, sort or explicit selection.
    fn selection_changed(&mut self, _rows: &[usize], _scroll_to: Option<usize>) {}
}

pub struct FolderView {
    provider: Arc<dyn FolderProvider>,
    directory: Arc<PathBuf>,
    recursive: bool,

    criteria: Arc<FilterCriteria>,
    candidates: CandidateList,

    engine: FilterEngine,
    scheduler: RefreshScheduler,
    model: PresentationModel,

    action_tx: UnboundedSender<Action>,
    action_rx: UnboundedReceiver<Action>,
    listeners: Vec<Box<dyn ViewListener>>,

    runtime: Handle,
    load_seq: u64,
}

impl FolderView {
    /// Create a view; nothing is listed until [`Self::refresh_now`] or the
    /// first change signal.
    #[must_use]
    pub fn new(
        provider: Arc<dyn FolderProvider>,
        directory: impl Into<PathBuf>,
        config: &Config,
        runtime: Handle,
    ) -> Self {
        let (action_tx, action_rx) = mpsc::unbounded_channel();

        Self {
            provider,
            directory: Arc::new(directory.into()),
            recursive: config.view.recursive,
            criteria: Arc::new(config.view.initial_criteria()),
            candidates: CandidateList::default(),
            engine: FilterEngine::new(action_tx.clone(), runtime.clone()),
            scheduler: RefreshScheduler::new(
                config.refresh.clone(),
                action_tx.clone(),
                runtime.clone(),
            ),
            model: PresentationModel::new(config.view.sort_key, config.view.sort_ascending),
            action_tx,
            action_rx,
            listeners: Vec::new(),
            runtime,
            load_seq: 0,
        }
    }

    pub fn add_listener(&mut self, listener: Box<dyn ViewListener>) {
        self.listeners.push(listener);
    }

    /// Handle collaborators use to report changes; clone freely.
    #[must_use]
    pub fn notifier(&self) -> RefreshScheduler {
        self.scheduler.clone()
    }

    /* ----------------------------- reads ------------------------------ */

    #[must_use]
    pub const fn model(&self) -> &PresentationModel {
        &self.model
    }

    #[must_use]
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    #[must_use]
    pub const fn is_recursive(&self) -> bool {
        self.recursive
    }

    #[must_use]
    pub fn criteria(&self) -> &FilterCriteria {
        &self.criteria
    }

    #[must_use]
    pub const fn candidates(&self) -> &CandidateList {
        &self.candidates
    }

    /// Last published result, readable from any thread via the engine.
    #[must_use]
    pub fn snapshot(&self) -> Arc<FilteredResult> {
        self.engine.snapshot()
    }

    /* --------------------------- mutations ---------------------------- */

    /// Replace the criteria and refilter the current candidates.
    pub fn set_criteria(&mut self, criteria: FilterCriteria) {
        if *self.criteria == criteria {
            trace!("Criteria unchanged");
            return;
        }

        self.criteria = Arc::new(criteria);
        self.apply_filter();
    }

    /// Switch between a flat and a recursive listing; reloads at once.
    pub fn set_recursive(&mut self, recursive: bool) {
        if self.recursive == recursive {
            return;
        }

        self.recursive = recursive;
        self.refresh_now();
    }

    /// Reload now, dropping any scheduled refresh.
    pub fn refresh_now(&mut self) {
        self.scheduler.cancel_pending();
        self.reload();
    }

    /// Sort by `column`. Returns false when it already is the sort column;
    /// call [`Self::reverse`] in that case.
    pub fn sort_by(&mut self, column: Column) -> bool {
        if !self.model.sort_by(column.sort_key()) {
            return false;
        }

        self.notify_selection();
        true
    }

    pub fn reverse(&mut self) {
        self.model.reverse();
        self.notify_selection();
    }

    /// Header click: sort by a new column, or flip the current one.
    pub fn toggle_sort(&mut self, column: Column) {
        if !self.sort_by(column) {
            self.reverse();
        }
    }

    pub fn select_rows(&mut self, rows: &[usize]) -> ViewResult<()> {
        self.model.select_rows(rows)?;
        self.notify_selection();
        Ok(())
    }

    pub fn select_ids(&mut self, ids: impl IntoIterator<Item = ItemId>) {
        self.model.select_ids(ids);
        self.notify_selection();
    }

    /* --------------------------- event loop --------------------------- */

    /// Apply everything already queued without waiting. Returns the number
    /// of actions handled.
    pub fn process_pending(&mut self) -> usize {
        let mut handled = 0;

        while let Ok(action) = self.action_rx.try_recv() {
            self.handle_action(action);
            handled += 1;
        }

        handled
    }

    /// Wait for one action and apply it.
    pub async fn process_next(&mut self) -> ViewResult<()> {
        let action = self
            .action_rx
            .recv()
            .await
            .ok_or_else(|| ViewError::channel_closed("folder_view").trace())?;

        self.handle_action(action);
        Ok(())
    }

    /// Drive the view until `shutdown` fires.
    pub async fn run(&mut self, shutdown: CancellationToken) {
        info!(directory = %self.directory.display(), "Folder view started");

        loop {
            tokio::select! {
                () = shutdown.cancelled() => break,

                Some(action) = self.action_rx.recv() => self.handle_action(action),
            }
        }

        self.engine.cancel();
        self.scheduler.cancel_pending();
        info!(directory = %self.directory.display(), "Folder view stopped");
    }

    fn handle_action(&mut self, action: Action) {
        trace!(action = action.name(), "Handling action");

        match action {
            Action::RefreshDue => self.reload(),

            Action::CandidatesLoaded {
                load_id,
                result,
                membership,
                elapsed,
            } => {
                if load_id != self.load_seq {
                    debug!(load_id, current = self.load_seq, "Discarding superseded listing");
                    return;
                }

                debug!(
                    load_id,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Listing finished"
                );
                self.install_candidates(result, membership);
            }

            Action::FilterPublished(result) => self.apply_result(&result),

            Action::CountsPublished { generation, counts } => {
                if self.model.set_counts(generation, counts) {
                    for listener in &mut self.listeners {
                        listener.count_changed(counts);
                    }
                }
            }
        }
    }

    /* ---------------------------- internals --------------------------- */

    #[instrument(
        skip(self),
        fields(
            operation_type = "folder_reload",
            directory = %self.directory.display(),
            recursive = self.recursive,
        )
    )]
    fn reload(&mut self) {
        self.load_seq += 1;

        let load_id = self.load_seq;
        let provider = Arc::clone(&self.provider);
        let directory = Arc::clone(&self.directory);
        let recursive = self.recursive;
        let tx = self.action_tx.clone();

        self.runtime.spawn_blocking(move || {
            let started = Instant::now();
            let result = provider.list_entries(&directory, recursive);
            let membership = provider.membership();

            let sent = tx.send(Action::CandidatesLoaded {
                load_id,
                result,
                membership,
                elapsed: started.elapsed(),
            });

            if sent.is_err() {
                trace!(load_id, "View dropped before listing finished");
            }
        });
    }

    fn install_candidates(
        &mut self,
        result: ViewResult<Vec<CandidateItem>>,
        membership: Membership,
    ) {
        match result {
            Ok(entries) => {
                self.candidates = CandidateList::from_entries(entries);
                self.model.set_load_error(None);
            }
            Err(e) => {
                warn!(
                    error = %e,
                    operation_type = e.operation_type(),
                    directory = %self.directory.display(),
                    "Folder listing failed"
                );
                self.candidates = CandidateList::default();
                self.model.set_load_error(Some(&e));
            }
        }

        self.model.set_membership(membership);
        self.scheduler.record_refresh();
        self.apply_filter();
    }

    fn apply_filter(&mut self) {
        let handle = self
            .engine
            .submit(self.candidates.clone(), Arc::clone(&self.criteria));

        if let Some(result) = handle.immediate() {
            let result = Arc::clone(result);
            self.apply_result(&result);
        }
    }

    fn apply_result(&mut self, result: &FilteredResult) {
        if result.generation != self.engine.current_generation()
            || result.generation <= self.model.generation()
        {
            trace!(generation = result.generation, "Skipping stale or installed result");
            return;
        }

        let remap: SelectionRemap = self.model.install(result);
        self.scheduler.set_row_count(self.model.rows().len());

        for listener in &mut self.listeners {
            listener.filter_changed(result);
            listener.selection_changed(&remap.rows, remap.scroll_target());
        }
    }

    fn notify_selection(&mut self) {
        let rows = self.model.selected_rows();
        let scroll_to = self.model.scroll_target();

        for listener in &mut self.listeners {
            listener.selection_changed(rows, scroll_to);
        }
    }
}
