//! ``src/model/criteria.rs``
//! ============================================================================
//! # `FilterCriteria`: immutable filter snapshot and keyword matching
//!
//! The UI replaces criteria wholesale on every edit; a running filter pass
//! holds its own `Arc<FilterCriteria>` and never observes a later edit.

use compact_str::CompactString;
use smallvec::SmallVec;

use crate::fs::candidate::{CandidateItem, ItemStatus};

/// One whitespace-separated token of the query, lower-cased.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Keyword {
    Include(CompactString),

    /// `-foo`: excludes any item whose name or attribution contains `foo`.
    Exclude(CompactString),
}

/// Split a query into keywords. Blank text and a bare `-` yield nothing.
#[must_use]
pub fn tokenize(text: &str) -> SmallVec<[Keyword; 4]> {
    text.split_whitespace()
        .filter_map(|token: &str| -> Option<Keyword> {
            match token.strip_prefix('-') {
                Some("") => None,
                Some(rest) => Some(Keyword::Exclude(CompactString::new(rest.to_lowercase()))),
                None => Some(Keyword::Include(CompactString::new(token.to_lowercase()))),
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterCriteria {
    text: CompactString,
    keywords: SmallVec<[Keyword; 4]>,
    show_normal: bool,
    show_expected: bool,
    show_deleted: bool,
}

impl Default for FilterCriteria {
    fn default() -> Self {
        Self {
            text: CompactString::const_new(""),
            keywords: SmallVec::new(),
            show_normal: true,
            show_expected: true,
            show_deleted: true,
        }
    }
}

impl FilterCriteria {
    #[must_use]
    pub fn new(text: &str, show_normal: bool, show_expected: bool, show_deleted: bool) -> Self {
        Self {
            text: CompactString::new(text),
            keywords: tokenize(text),
            show_normal,
            show_expected,
            show_deleted,
        }
    }

    #[must_use]
    pub fn with_text(mut self, text: &str) -> Self {
        self.text = CompactString::new(text);
        self.keywords = tokenize(text);
        self
    }

    #[must_use]
    pub const fn with_show_normal(mut self, show: bool) -> Self {
        self.show_normal = show;
        self
    }

    #[must_use]
    pub const fn with_show_expected(mut self, show: bool) -> Self {
        self.show_expected = show;
        self
    }

    #[must_use]
    pub const fn with_show_deleted(mut self, show: bool) -> Self {
        self.show_deleted = show;
        self
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn keywords(&self) -> &[Keyword] {
        &self.keywords
    }

    #[must_use]
    pub const fn show_normal(&self) -> bool {
        self.show_normal
    }

    #[must_use]
    pub const fn show_expected(&self) -> bool {
        self.show_expected
    }

    #[must_use]
    pub const fn show_deleted(&self) -> bool {
        self.show_deleted
    }

    #[inline]
    #[must_use]
    pub fn has_text_filter(&self) -> bool {
        !self.keywords.is_empty()
    }

    /// Criteria that let every prepared candidate through.
    #[inline]
    #[must_use]
    pub fn is_noop(&self) -> bool {
        !self.has_text_filter() && self.show_normal && self.show_expected && self.show_deleted
    }

    #[must_use]
    pub fn matches(&self, item: &CandidateItem) -> bool {
        self.passes_status(item.status()) && self.matches_text(item)
    }

    #[inline]
    #[must_use]
    pub const fn passes_status(&self, status: ItemStatus) -> bool {
        match status {
            ItemStatus::Normal => self.show_normal,
            ItemStatus::Expected => self.show_expected,
            ItemStatus::KnownDeleted => self.show_deleted,
            ItemStatus::RemoteDeleted => false,
        }
    }

    /// AND across keywords, OR across the fields checked for one keyword.
    /// Exclusions only look at name and attribution; media tags are tried
    /// last and only for inclusions.
    #[must_use]
    pub fn matches_text(&self, item: &CandidateItem) -> bool {
        if self.keywords.is_empty() {
            return true;
        }

        let name: String = item.name().to_lowercase();
        let attribution: Option<String> = item.attribution().map(str::to_lowercase);

        let in_name_or_attribution = |needle: &str| -> bool {
            name.contains(needle) || attribution.as_deref().is_some_and(|a| a.contains(needle))
        };

        if self.keywords.iter().any(|kw: &Keyword| -> bool {
            matches!(kw, Keyword::Exclude(needle) if in_name_or_attribution(needle.as_str()))
        }) {
            return false;
        }

        self.keywords.iter().all(|kw: &Keyword| -> bool {
            match kw {
                Keyword::Exclude(_) => true,
                Keyword::Include(needle) => {
                    in_name_or_attribution(needle.as_str()) || media_contains(item, needle)
                }
            }
        })
    }
}

fn media_contains(item: &CandidateItem, needle: &str) -> bool {
    item.media().is_some_and(|tags| {
        tags.fields()
            .any(|field: &CompactString| field.to_lowercase().contains(needle))
    })
}

impl std::fmt::Display for FilterCriteria {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "text={:?} normal={} expected={} deleted={}",
            self.text.as_str(),
            self.show_normal,
            self.show_expected,
            self.show_deleted
        )
    }
}
