//! ``src/model/selection.rs``
//!
//! Selection by item identity. Row indices are derived, never stored as the
//! source of truth, so a resort or refilter cannot select the wrong item.

use ahash::AHashSet;

use crate::fs::candidate::{CandidateItem, ItemId};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionSet {
    ids: AHashSet<ItemId>,
}

/// Outcome of mapping a selection onto a new row order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionRemap {
    /// Selected row indices, ascending.
    pub rows: Vec<usize>,

    /// Identities still present.
    pub retained: SelectionSet,

    /// Identities that vanished from the list.
    pub dropped: usize,
}

impl SelectionRemap {
    /// First surviving row, the one a table should scroll to.
    #[must_use]
    pub fn scroll_target(&self) -> Option<usize> {
        self.rows.first().copied()
    }
}

impl SelectionSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: ItemId) -> bool {
        self.ids.insert(id)
    }

    pub fn remove(&mut self, id: &ItemId) -> bool {
        self.ids.remove(id)
    }

    #[must_use]
    pub fn contains(&self, id: &ItemId) -> bool {
        self.ids.contains(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &ItemId> {
        self.ids.iter()
    }

    /// Intersect with `rows` by identity. Never fails; an empty
    /// intersection yields an empty selection.
    #[must_use]
    pub fn remap(&self, rows: &[CandidateItem]) -> SelectionRemap {
        if self.ids.is_empty() {
            return SelectionRemap::default();
        }

        let mut retained = Self::new();
        let mut selected_rows: Vec<usize> = Vec::with_capacity(self.ids.len());

        for (idx, item) in rows.iter().enumerate() {
            if self.ids.contains(item.id()) && retained.insert(item.id().clone()) {
                selected_rows.push(idx);
            }
        }

        SelectionRemap {
            rows: selected_rows,
            dropped: self.ids.len() - retained.len(),
            retained,
        }
    }
}

impl FromIterator<ItemId> for SelectionSet {
    fn from_iter<T: IntoIterator<Item = ItemId>>(iter: T) -> Self {
        Self {
            ids: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::candidate::FileEntry;

    fn rows(paths: &[&str]) -> Vec<CandidateItem> {
        paths
            .iter()
            .map(|p| FileEntry::new("f1", p).into())
            .collect()
    }

    #[test]
    fn test_remap_follows_identity_not_index() {
        let selection: SelectionSet = [ItemId::new("f1", "b"), ItemId::new("f1", "d")]
            .into_iter()
            .collect();

        let remap = selection.remap(&rows(&["d", "a", "b"]));

        assert_eq!(remap.rows, vec![0, 2]);
        assert_eq!(remap.scroll_target(), Some(0));
        assert_eq!(remap.dropped, 0);
    }

    #[test]
    fn test_remap_drops_vanished_items() {
        let selection: SelectionSet = [ItemId::new("f1", "a"), ItemId::new("f1", "gone")]
            .into_iter()
            .collect();

        let remap = selection.remap(&rows(&["x", "a"]));

        assert_eq!(remap.rows, vec![1]);
        assert_eq!(remap.dropped, 1);
        assert!(remap.retained.contains(&ItemId::new("f1", "a")));
        assert!(!remap.retained.contains(&ItemId::new("f1", "gone")));
    }

    #[test]
    fn test_remap_empty_intersection_is_not_an_error() {
        let selection: SelectionSet = std::iter::once(ItemId::new("f1", "a")).collect();

        let remap = selection.remap(&rows(&["b", "c"]));

        assert!(remap.rows.is_empty());
        assert!(remap.retained.is_empty());
        assert_eq!(remap.scroll_target(), None);
    }
}
