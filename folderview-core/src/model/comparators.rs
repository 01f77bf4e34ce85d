//! ``src/model/comparators.rs``
//! ============================================================================
//! Multi-key comparators for the presentation model.
//!
//! Every key falls back to case-insensitive name and then to item identity,
//! so orderings are total and `reverse(reverse(rows)) == rows` holds.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::fs::candidate::{CandidateItem, ItemKind};

pub trait EntryComparator {
    fn compare(&self, a: &CandidateItem, b: &CandidateItem) -> Ordering;
}

/// Sort keys, one per table column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    Kind,
    #[default]
    Name,
    Size,
    ModifiedBy,
    Modified,
    Availability,
}

impl std::fmt::Display for SortKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s: &str = match self {
            Self::Kind => "kind",
            Self::Name => "name",
            Self::Size => "size",
            Self::ModifiedBy => "modified_by",
            Self::Modified => "modified",
            Self::Availability => "availability",
        };

        write!(f, "{s}")
    }
}

impl EntryComparator for SortKey {
    fn compare(&self, a: &CandidateItem, b: &CandidateItem) -> Ordering {
        let primary: Ordering = match self {
            Self::Kind => kind_rank(a.kind()).cmp(&kind_rank(b.kind())),
            Self::Name => Ordering::Equal,
            Self::Size => a.size().cmp(&b.size()),
            Self::ModifiedBy => compare_attribution(a.attribution(), b.attribution()),
            Self::Modified => a.modified().cmp(&b.modified()),
            Self::Availability => a.availability().cmp(&b.availability()),
        };

        primary.then_with(|| compare_names(a, b))
    }
}

/// Inverts any comparator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reversed<C>(pub C);

impl<C: EntryComparator> EntryComparator for Reversed<C> {
    fn compare(&self, a: &CandidateItem, b: &CandidateItem) -> Ordering {
        self.0.compare(b, a)
    }
}

impl<F> EntryComparator for F
where
    F: Fn(&CandidateItem, &CandidateItem) -> Ordering,
{
    fn compare(&self, a: &CandidateItem, b: &CandidateItem) -> Ordering {
        self(a, b)
    }
}

/// Stable in-place sort.
pub fn sort_items<C: EntryComparator + ?Sized>(items: &mut [CandidateItem], comparator: &C) {
    items.sort_by(|a: &CandidateItem, b: &CandidateItem| -> Ordering { comparator.compare(a, b) });
}

// Directories first.
const fn kind_rank(kind: ItemKind) -> u8 {
    match kind {
        ItemKind::Directory => 0,
        ItemKind::File => 1,
    }
}

// Unattributed entries sort after attributed ones.
fn compare_attribution(a: Option<&str>, b: Option<&str>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => caseless_cmp(a, b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn compare_names(a: &CandidateItem, b: &CandidateItem) -> Ordering {
    caseless_cmp(a.name(), b.name())
        .then_with(|| a.name().cmp(b.name()))
        .then_with(|| a.id().cmp(b.id()))
}

fn caseless_cmp(a: &str, b: &str) -> Ordering {
    a.chars()
        .flat_map(char::to_lowercase)
        .cmp(b.chars().flat_map(char::to_lowercase))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::candidate::{DirectoryEntry, FileEntry, Member};
    use std::time::{Duration, UNIX_EPOCH};

    fn names(items: &[CandidateItem]) -> Vec<&str> {
        items.iter().map(CandidateItem::name).collect()
    }

    fn sample() -> Vec<CandidateItem> {
        vec![
            FileEntry::new("f1", "beta.txt")
                .with_size(300)
                .with_modified(UNIX_EPOCH + Duration::from_secs(10))
                .with_modified_by(Member::new("m2", "bob"))
                .with_availability(1)
                .into(),
            FileEntry::new("f1", "Alpha.txt")
                .with_size(100)
                .with_modified(UNIX_EPOCH + Duration::from_secs(30))
                .with_availability(3)
                .into(),
            DirectoryEntry::new("f1", "zeta", Vec::new()).into(),
            FileEntry::new("f1", "gamma.txt")
                .with_size(100)
                .with_modified(UNIX_EPOCH + Duration::from_secs(20))
                .with_modified_by(Member::new("m1", "Alice"))
                .with_availability(2)
                .into(),
        ]
    }

    #[test]
    fn test_name_sort_is_case_insensitive() {
        let mut items = sample();
        sort_items(&mut items, &SortKey::Name);
        assert_eq!(names(&items), vec!["Alpha.txt", "beta.txt", "gamma.txt", "zeta"]);
    }

    #[test]
    fn test_kind_sort_puts_directories_first() {
        let mut items = sample();
        sort_items(&mut items, &SortKey::Kind);
        assert_eq!(names(&items), vec!["zeta", "Alpha.txt", "beta.txt", "gamma.txt"]);
    }

    #[test]
    fn test_size_ties_fall_back_to_name() {
        let mut items = sample();
        sort_items(&mut items, &SortKey::Size);
        assert_eq!(names(&items), vec!["zeta", "Alpha.txt", "gamma.txt", "beta.txt"]);
    }

    #[test]
    fn test_attribution_sort_puts_unattributed_last() {
        let mut items = sample();
        sort_items(&mut items, &SortKey::ModifiedBy);
        assert_eq!(names(&items), vec!["gamma.txt", "beta.txt", "Alpha.txt", "zeta"]);
    }

    #[test]
    fn test_modified_and_availability() {
        let mut items = sample();
        sort_items(&mut items, &SortKey::Modified);
        assert_eq!(names(&items), vec!["zeta", "beta.txt", "gamma.txt", "Alpha.txt"]);

        sort_items(&mut items, &SortKey::Availability);
        assert_eq!(names(&items), vec!["zeta", "beta.txt", "gamma.txt", "Alpha.txt"]);
    }

    #[test]
    fn test_reversed_inverts_order() {
        let mut forward = sample();
        sort_items(&mut forward, &SortKey::Size);

        let mut backward = sample();
        sort_items(&mut backward, &Reversed(SortKey::Size));

        forward.reverse();
        assert_eq!(names(&forward), names(&backward));
    }

    #[test]
    fn test_closure_comparator() {
        let mut items = sample();
        sort_items(&mut items, &|a: &CandidateItem, b: &CandidateItem| {
            b.size().cmp(&a.size())
        });
        assert_eq!(items[0].name(), "beta.txt");
    }
}
