//! ``src/model/presentation.rs``
//! ============================================================================
//! # `PresentationModel`: sorted rows, cells, status row, selection remap
//!
//! Owned by the view's task. Filtered results are installed here, sorted by
//! the current key, and the selection is carried over by item identity.
//! An empty result still has one row: a status message explaining why.

use std::fmt::Write as _;
use std::time::SystemTime;

use bytesize::ByteSize;
use chrono::{DateTime, Local};
use compact_str::{CompactString, ToCompactString};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::error::{ViewError, ViewResult};
use crate::fs::candidate::{CandidateItem, ItemId, ItemKind};
use crate::fs::provider::Membership;
use crate::model::comparators::{SortKey, sort_items};
use crate::model::selection::{SelectionRemap, SelectionSet};
use crate::operators::filter_task::{FilteredResult, StatusCounts};

// ============================================================================
// COLUMNS AND CELLS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Column {
    Kind,
    Name,
    Size,
    ModifiedBy,
    Modified,
    Availability,
}

impl Column {
    pub const ALL: [Self; 6] = [
        Self::Kind,
        Self::Name,
        Self::Size,
        Self::ModifiedBy,
        Self::Modified,
        Self::Availability,
    ];

    pub const COUNT: usize = Self::ALL.len();

    pub fn from_index(column: usize) -> ViewResult<Self> {
        Self::ALL
            .get(column)
            .copied()
            .ok_or_else(|| {
                ViewError::ColumnOutOfRange {
                    column,
                    column_count: Self::COUNT,
                }
                .trace()
            })
    }

    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    #[must_use]
    pub const fn header(self) -> &'static str {
        match self {
            Self::Kind => "Type",
            Self::Name => "Name",
            Self::Size => "Size",
            Self::ModifiedBy => "Modified by",
            Self::Modified => "Modified",
            Self::Availability => "Availability",
        }
    }

    /// Fixed column to sort key mapping.
    #[must_use]
    pub const fn sort_key(self) -> SortKey {
        match self {
            Self::Kind => SortKey::Kind,
            Self::Name => SortKey::Name,
            Self::Size => SortKey::Size,
            Self::ModifiedBy => SortKey::ModifiedBy,
            Self::Modified => SortKey::Modified,
            Self::Availability => SortKey::Availability,
        }
    }
}

/// Typed cell value; `display` renders it for a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cell {
    Kind(ItemKind),
    Name(CompactString),
    Size(u64),
    ModifiedBy(Option<CompactString>),
    Modified(Option<SystemTime>),
    Availability(Option<u32>),

    /// Row 0 of an empty view.
    Status(CompactString),

    Empty,
}

impl Cell {
    #[must_use]
    pub fn of(item: &CandidateItem, column: Column) -> Self {
        match column {
            Column::Kind => Self::Kind(item.kind()),
            Column::Name => Self::Name(CompactString::new(item.name())),
            Column::Size => Self::Size(item.size()),
            Column::ModifiedBy => Self::ModifiedBy(item.attribution().map(CompactString::new)),
            Column::Modified => Self::Modified(item.modified()),
            Column::Availability => Self::Availability(item.availability()),
        }
    }

    #[must_use]
    pub fn display(&self, date_format: &str) -> String {
        match self {
            Self::Kind(kind) => kind.to_string(),
            Self::Name(name) | Self::Status(name) => name.to_string(),
            Self::Size(bytes) => ByteSize::b(*bytes).to_string(),
            Self::ModifiedBy(member) => member.as_deref().unwrap_or_default().to_string(),
            Self::Modified(Some(time)) => {
                let mut out = String::new();
                let formatted = DateTime::<Local>::from(*time).format(date_format);
                if write!(out, "{formatted}").is_err() {
                    trace!(date_format, "Unrenderable date format");
                    out.clear();
                }
                out
            }
            Self::Availability(Some(count)) => count.to_string(),
            Self::Modified(None) | Self::Availability(None) | Self::Empty => String::new(),
        }
    }
}

// ============================================================================
// STATUS ROW
// ============================================================================

/// Why an empty view is empty; checked in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmptyReason {
    LoadFailed(CompactString),
    NoMatches,
    WaitingForMembers,
    FetchingLists,
    EmptyFolder,
}

impl EmptyReason {
    #[must_use]
    pub fn message(&self) -> CompactString {
        match self {
            Self::LoadFailed(reason) => {
                compact_str::format_compact!("Folder contents unavailable: {reason}")
            }
            Self::NoMatches => CompactString::const_new("No files match the current filter"),
            Self::WaitingForMembers => {
                CompactString::const_new("No files yet. Waiting for members to connect")
            }
            Self::FetchingLists => {
                CompactString::const_new("No files yet, still fetching file list from members")
            }
            Self::EmptyFolder => CompactString::const_new("No files, folder is empty"),
        }
    }
}

// ============================================================================
// PRESENTATION MODEL
// ============================================================================

#[derive(Debug, Clone)]
pub struct PresentationModel {
    rows: Vec<CandidateItem>,
    sort_key: SortKey,
    ascending: bool,

    selection: SelectionSet,
    selected_rows: Vec<usize>,
    scroll_target: Option<usize>,

    generation: u64,
    candidate_count: usize,
    counts: Option<StatusCounts>,
    membership: Membership,
    load_error: Option<CompactString>,
}

impl Default for PresentationModel {
    fn default() -> Self {
        Self::new(SortKey::default(), true)
    }
}

impl PresentationModel {
    #[must_use]
    pub fn new(sort_key: SortKey, ascending: bool) -> Self {
        Self {
            rows: Vec::new(),
            sort_key,
            ascending,
            selection: SelectionSet::new(),
            selected_rows: Vec::new(),
            scroll_target: None,
            generation: 0,
            candidate_count: 0,
            counts: None,
            membership: Membership::default(),
            load_error: None,
        }
    }

    /// Number of table rows; an empty view shows one status row.
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.rows.len().max(1)
    }

    #[must_use]
    pub fn rows(&self) -> &[CandidateItem] {
        &self.rows
    }

    #[must_use]
    pub fn item_at(&self, row: usize) -> Option<&CandidateItem> {
        self.rows.get(row)
    }

    pub fn value_at(&self, row: usize, column: Column) -> ViewResult<Cell> {
        if self.rows.is_empty() {
            return match (row, column) {
                (0, Column::Name) => Ok(Cell::Status(self.empty_reason().message())),
                (0, _) => Ok(Cell::Empty),
                _ => Err(ViewError::row_out_of_range(row, self.row_count()).trace()),
            };
        }

        self.rows
            .get(row)
            .map(|item: &CandidateItem| Cell::of(item, column))
            .ok_or_else(|| ViewError::row_out_of_range(row, self.row_count()).trace())
    }

    /// Index-based variant of [`Self::value_at`] for table widgets.
    pub fn value_at_index(&self, row: usize, column: usize) -> ViewResult<Cell> {
        self.value_at(row, Column::from_index(column)?)
    }

    /// Status row text, `None` while rows are shown.
    #[must_use]
    pub fn status_message(&self) -> Option<CompactString> {
        self.rows.is_empty().then(|| self.empty_reason().message())
    }

    #[must_use]
    pub fn empty_reason(&self) -> EmptyReason {
        if let Some(reason) = &self.load_error {
            EmptyReason::LoadFailed(reason.clone())
        } else if self.candidate_count > 0 {
            EmptyReason::NoMatches
        } else if self.membership.remote_members > 0 && self.membership.connected_members == 0 {
            EmptyReason::WaitingForMembers
        } else if self.membership.fetching_lists {
            EmptyReason::FetchingLists
        } else {
            EmptyReason::EmptyFolder
        }
    }

    /* ---------------------------- sorting ----------------------------- */

    /// Sort ascending by `key`. Returns false when `key` is already the
    /// current key; the caller should [`Self::reverse`] instead.
    pub fn sort_by(&mut self, key: SortKey) -> bool {
        if key == self.sort_key {
            return false;
        }

        debug!(from = %self.sort_key, to = %key, "Sort key changed");

        self.sort_key = key;
        self.ascending = true;
        sort_items(&mut self.rows, &self.sort_key);
        self.remap_selection();
        true
    }

    /// Flip the direction by reversing rows in place.
    pub fn reverse(&mut self) {
        self.rows.reverse();
        self.ascending = !self.ascending;
        self.remap_selection();
    }

    #[must_use]
    pub const fn sort_key(&self) -> SortKey {
        self.sort_key
    }

    #[must_use]
    pub const fn is_ascending(&self) -> bool {
        self.ascending
    }

    /* ---------------------------- install ----------------------------- */

    /// Replace rows with a published result, keeping the selection by
    /// identity. Returns the remap so callers can notify listeners.
    pub fn install(&mut self, result: &FilteredResult) -> SelectionRemap {
        let mut rows: Vec<CandidateItem> = result.items.as_slice().to_vec();
        sort_items(&mut rows, &self.sort_key);
        if !self.ascending {
            rows.reverse();
        }

        trace!(
            generation = result.generation,
            rows = rows.len(),
            "Installing filtered rows"
        );

        self.rows = rows;
        self.generation = result.generation;
        self.candidate_count = result.candidate_count;
        // counts belong to one generation; a fast-path result has none yet
        self.counts = result.counts;

        self.remap_selection()
    }

    /// Accept counts only for the installed generation.
    pub fn set_counts(&mut self, generation: u64, counts: StatusCounts) -> bool {
        if generation != self.generation {
            return false;
        }

        self.counts = Some(counts);
        true
    }

    #[must_use]
    pub const fn counts(&self) -> Option<StatusCounts> {
        self.counts
    }

    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    pub const fn set_membership(&mut self, membership: Membership) {
        self.membership = membership;
    }

    #[must_use]
    pub const fn membership(&self) -> Membership {
        self.membership
    }

    pub fn set_load_error(&mut self, error: Option<&ViewError>) {
        self.load_error = error.map(ToCompactString::to_compact_string);
    }

    /* --------------------------- selection ---------------------------- */

    /// Select rows by index; all indices must be in range.
    pub fn select_rows(&mut self, rows: &[usize]) -> ViewResult<()> {
        if let Some(&bad) = rows.iter().find(|&&row| row >= self.rows.len()) {
            return Err(ViewError::row_out_of_range(bad, self.rows.len()).trace());
        }

        self.selection = rows
            .iter()
            .map(|&row| self.rows[row].id().clone())
            .collect();
        self.remap_selection();
        Ok(())
    }

    /// Select by identity; ids not currently shown are dropped.
    pub fn select_ids(&mut self, ids: impl IntoIterator<Item = ItemId>) {
        self.selection = ids.into_iter().collect();
        self.remap_selection();
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
        self.selected_rows.clear();
        self.scroll_target = None;
    }

    #[must_use]
    pub fn selected_rows(&self) -> &[usize] {
        &self.selected_rows
    }

    pub fn selected_ids(&self) -> impl Iterator<Item = &ItemId> {
        self.selection.iter()
    }

    #[must_use]
    pub const fn scroll_target(&self) -> Option<usize> {
        self.scroll_target
    }

    fn remap_selection(&mut self) -> SelectionRemap {
        let remap = self.selection.remap(&self.rows);

        if remap.dropped > 0 {
            debug!(dropped = remap.dropped, "Selected items no longer present");
        }

        self.selection = remap.retained.clone();
        self.selected_rows.clone_from(&remap.rows);
        self.scroll_target = remap.scroll_target();
        remap
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::candidate::{CandidateList, DirectoryEntry, FileEntry, FileFlags, Member};
    use crate::model::criteria::FilterCriteria;
    use std::sync::Arc;
    use std::time::{Duration, UNIX_EPOCH};

    fn result_of(items: Vec<CandidateItem>, candidate_count: usize, generation: u64) -> FilteredResult {
        FilteredResult {
            generation,
            items: CandidateList::from_entries(items),
            counts: None,
            criteria: Arc::new(FilterCriteria::default()),
            candidate_count,
        }
    }

    fn sized(name: &str, size: u64) -> CandidateItem {
        FileEntry::new("f1", name).with_size(size).into()
    }

    fn names(model: &PresentationModel) -> Vec<&str> {
        model.rows().iter().map(CandidateItem::name).collect()
    }

    #[test]
    fn test_filter_then_sort_example() {
        let candidates = CandidateList::from_entries(vec![
            FileEntry::new("f1", "report.txt")
                .with_modified_by(Member::new("a", "alice"))
                .into(),
            FileEntry::new("f1", "photo.jpg")
                .with_modified_by(Member::new("b", "bob"))
                .with_flags(FileFlags {
                    deleted: true,
                    locally_known: true,
                    ..FileFlags::default()
                })
                .into(),
            DirectoryEntry::new("f1", "reports", vec![FileEntry::new("f1", "reports/x").into()])
                .into(),
        ]);
        let criteria = FilterCriteria::default()
            .with_text("report")
            .with_show_deleted(false);
        let items: Vec<CandidateItem> = candidates
            .iter()
            .filter(|item| criteria.matches(item))
            .cloned()
            .collect();

        let mut model = PresentationModel::default();
        model.install(&result_of(items, candidates.len(), 1));

        assert_eq!(names(&model), vec!["report.txt", "reports"]);
        assert_eq!(model.row_count(), 2);
    }

    #[test]
    fn test_sort_by_same_key_returns_false() {
        let mut model = PresentationModel::default();
        model.install(&result_of(vec![sized("b", 1), sized("a", 2)], 2, 1));

        assert!(!model.sort_by(SortKey::Name));
        assert!(model.sort_by(SortKey::Size));
        assert_eq!(names(&model), vec!["b", "a"]);
        assert!(!model.sort_by(SortKey::Size));
    }

    #[test]
    fn test_reverse_matches_descending_sort_and_is_involution() {
        let items = vec![sized("c", 5), sized("a", 5), sized("b", 1), sized("d", 9)];
        let mut model = PresentationModel::default();
        model.install(&result_of(items, 4, 1));
        model.sort_by(SortKey::Size);

        let ascending: Vec<String> = names(&model).into_iter().map(String::from).collect();

        model.reverse();
        assert!(!model.is_ascending());
        assert_eq!(names(&model), vec!["d", "c", "a", "b"]);

        model.reverse();
        assert_eq!(names(&model), ascending);
    }

    #[test]
    fn test_install_keeps_direction() {
        let mut model = PresentationModel::default();
        model.install(&result_of(vec![sized("a", 1), sized("b", 1)], 2, 1));
        model.reverse();

        model.install(&result_of(vec![sized("c", 1), sized("a", 1), sized("b", 1)], 3, 2));
        assert_eq!(names(&model), vec!["c", "b", "a"]);
    }

    #[test]
    fn test_selection_survives_resort_and_refilter() {
        let mut model = PresentationModel::default();
        model.install(&result_of(
            vec![sized("a", 3), sized("b", 2), sized("c", 1)],
            3,
            1,
        ));
        model.select_rows(&[0, 2]).expect("in range");
        assert_eq!(model.selected_rows(), &[0, 2]);

        model.sort_by(SortKey::Size);
        assert_eq!(names(&model), vec!["c", "b", "a"]);
        assert_eq!(model.selected_rows(), &[0, 2]);

        // "a" filtered out: selection shrinks to "c", which moved
        model.install(&result_of(vec![sized("b", 2), sized("c", 1), sized("z", 0)], 3, 2));
        assert_eq!(names(&model), vec!["z", "c", "b"]);
        assert_eq!(model.selected_rows(), &[1]);
        assert_eq!(model.scroll_target(), Some(1));
        assert_eq!(model.selected_ids().count(), 1);
    }

    #[test]
    fn test_select_rows_out_of_range() {
        let mut model = PresentationModel::default();
        model.install(&result_of(vec![sized("a", 1)], 1, 1));

        assert!(matches!(
            model.select_rows(&[0, 3]),
            Err(ViewError::RowOutOfRange { row: 3, row_count: 1 })
        ));
        assert!(model.selected_rows().is_empty());
    }

    #[test]
    fn test_status_row_messages() {
        let mut model = PresentationModel::default();
        assert_eq!(model.row_count(), 1);
        assert_eq!(
            model.value_at(0, Column::Name).expect("status row"),
            Cell::Status(CompactString::new("No files, folder is empty"))
        );
        assert_eq!(model.value_at(0, Column::Size).expect("status row"), Cell::Empty);
        assert!(model.value_at(1, Column::Name).is_err());

        model.set_membership(Membership {
            remote_members: 2,
            connected_members: 1,
            fetching_lists: true,
        });
        assert_eq!(model.empty_reason(), EmptyReason::FetchingLists);

        model.set_membership(Membership {
            remote_members: 2,
            connected_members: 0,
            fetching_lists: true,
        });
        assert_eq!(model.empty_reason(), EmptyReason::WaitingForMembers);

        model.install(&result_of(Vec::new(), 5, 1));
        assert_eq!(
            model.status_message().as_deref(),
            Some("No files match the current filter")
        );

        model.set_load_error(Some(&ViewError::directory_not_found("/gone")));
        assert!(
            model
                .status_message()
                .is_some_and(|m| m.starts_with("Folder contents unavailable: "))
        );
    }

    #[test]
    fn test_cells_and_columns() {
        let item: CandidateItem = FileEntry::new("f1", "song.mp3")
            .with_size(2048)
            .with_modified(UNIX_EPOCH + Duration::from_secs(86_400))
            .with_availability(2)
            .into();

        let mut model = PresentationModel::default();
        model.install(&result_of(vec![item], 1, 1));

        assert_eq!(model.value_at(0, Column::Size).expect("cell"), Cell::Size(2048));
        assert_eq!(
            model.value_at_index(0, 5).expect("cell").display("%Y"),
            "2"
        );
        assert_eq!(model.value_at(0, Column::ModifiedBy).expect("cell").display("%Y"), "");
        assert!(!Cell::Size(2048).display("%Y").is_empty());
        assert!(matches!(
            model.value_at_index(0, Column::COUNT),
            Err(ViewError::ColumnOutOfRange { .. })
        ));

        for column in Column::ALL {
            assert_eq!(Column::from_index(column.index()).expect("valid"), column);
        }
    }

    #[test]
    fn test_counts_follow_installed_generation() {
        let mut model = PresentationModel::default();
        model.install(&result_of(vec![sized("a", 1)], 1, 3));

        let counts = StatusCounts {
            deleted: 0,
            expected: 0,
            normal: 1,
        };
        assert!(!model.set_counts(2, counts));
        assert!(model.set_counts(3, counts));
        assert_eq!(model.counts(), Some(counts));
    }

    #[test]
    fn test_install_without_counts_drops_previous_counts() {
        let mut model = PresentationModel::default();
        let counts = StatusCounts {
            deleted: 0,
            expected: 0,
            normal: 2,
        };

        let mut first = result_of(vec![sized("a", 1), sized("b", 1)], 2, 1);
        first.counts = Some(counts);
        model.install(&first);
        assert_eq!(model.counts(), Some(counts));

        model.install(&result_of(Vec::new(), 0, 2));
        assert_eq!(model.generation(), 2);
        assert_eq!(model.counts(), None);

        // late counts from the old list stay out
        assert!(!model.set_counts(1, counts));
        assert_eq!(model.counts(), None);
    }

    #[test]
    fn test_bad_date_format_renders_placeholder() {
        let cell = Cell::Modified(Some(UNIX_EPOCH));

        assert_eq!(cell.display("%Q"), "");
        assert_eq!(cell.display("%Y").len(), 4);
    }
}
