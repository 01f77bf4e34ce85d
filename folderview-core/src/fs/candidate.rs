//! `src/fs/candidate.rs`
//! ============================================================
//! Candidate entries of a synchronized folder view.
//!
//! Lists are rebuilt from scratch on every refresh, so identity is a
//! value (`ItemId`: folder + relative path), never a pointer. Entries are
//! shared behind `Arc` so filtered results reference rather than copy them.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use compact_str::CompactString;
use serde::{Deserialize, Serialize};

// ------------------------------------------------------------
// ItemId: stable identity across rebuilt lists.
// ------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemId {
    /// Owning folder.
    pub folder: CompactString,

    /// Path relative to the folder root.
    pub path: Arc<PathBuf>,
}

impl ItemId {
    #[must_use]
    pub fn new(folder: &str, path: impl AsRef<Path>) -> Self {
        Self {
            folder: CompactString::new(folder),
            path: Arc::new(path.as_ref().to_path_buf()),
        }
    }

    /// Last path component, empty for the folder root.
    #[must_use]
    pub fn file_name(&self) -> CompactString {
        CompactString::new(
            self.path
                .file_name()
                .map(|n| n.to_string_lossy())
                .unwrap_or_default(),
        )
    }
}

impl std::fmt::Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.folder, self.path.display())
    }
}

// ------------------------------------------------------------
// Status classification.
// ------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemStatus {
    /// Present locally and not deleted.
    Normal,

    /// Listed by a peer, not yet present locally.
    Expected,

    /// Deletion recorded in this node's own metadata.
    KnownDeleted,

    /// Deleted only in a remote peer's view; never displayed.
    RemoteDeleted,
}

impl ItemStatus {
    #[inline]
    #[must_use]
    pub const fn is_deleted(self) -> bool {
        matches!(self, Self::KnownDeleted | Self::RemoteDeleted)
    }
}

impl std::fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s: &str = match self {
            Self::Normal => "normal",
            Self::Expected => "expected",
            Self::KnownDeleted => "deleted",
            Self::RemoteDeleted => "remote_deleted",
        };

        write!(f, "{s}")
    }
}

/// Status flags as reported by the folder collaborator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileFlags {
    pub deleted: bool,

    /// Listed by a peer but not present locally.
    pub expected: bool,

    /// Recorded in this node's own metadata.
    pub locally_known: bool,

    pub ignored: bool,
}

impl FileFlags {
    #[must_use]
    pub const fn status(self) -> ItemStatus {
        if self.deleted {
            if self.locally_known {
                ItemStatus::KnownDeleted
            } else {
                ItemStatus::RemoteDeleted
            }
        } else if self.expected && !self.ignored {
            ItemStatus::Expected
        } else {
            ItemStatus::Normal
        }
    }
}

// ------------------------------------------------------------
// Attribution and media metadata.
// ------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub id: CompactString,
    pub display_name: CompactString,
}

impl Member {
    #[must_use]
    pub fn new(id: &str, display_name: &str) -> Self {
        Self {
            id: CompactString::new(id),
            display_name: CompactString::new(display_name),
        }
    }
}

/// Extended tags exposed by audio/video files.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaTags {
    pub title: Option<CompactString>,
    pub album: Option<CompactString>,
    pub artist: Option<CompactString>,
}

impl MediaTags {
    pub fn fields(&self) -> impl Iterator<Item = &CompactString> {
        [&self.title, &self.album, &self.artist]
            .into_iter()
            .flatten()
    }
}

// ------------------------------------------------------------
// FileEntry
// ------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub id: ItemId,
    pub name: CompactString,
    pub size: u64,
    pub modified: SystemTime,
    pub modified_by: Option<Member>,

    /// Number of members holding the current version.
    pub availability: u32,

    pub flags: FileFlags,
    pub media: Option<MediaTags>,
}

impl FileEntry {
    #[must_use]
    pub fn new(folder: &str, path: impl AsRef<Path>) -> Self {
        let id = ItemId::new(folder, path);
        let name = id.file_name();

        Self {
            id,
            name,
            size: 0,
            modified: UNIX_EPOCH,
            modified_by: None,
            availability: 0,
            flags: FileFlags::default(),
            media: None,
        }
    }

    #[must_use]
    pub const fn with_size(mut self, size: u64) -> Self {
        self.size = size;
        self
    }

    #[must_use]
    pub const fn with_modified(mut self, modified: SystemTime) -> Self {
        self.modified = modified;
        self
    }

    #[must_use]
    pub fn with_modified_by(mut self, member: Member) -> Self {
        self.modified_by = Some(member);
        self
    }

    #[must_use]
    pub const fn with_availability(mut self, availability: u32) -> Self {
        self.availability = availability;
        self
    }

    #[must_use]
    pub const fn with_flags(mut self, flags: FileFlags) -> Self {
        self.flags = flags;
        self
    }

    #[must_use]
    pub fn with_media(mut self, media: MediaTags) -> Self {
        self.media = Some(media);
        self
    }

    #[inline]
    #[must_use]
    pub const fn is_deleted(&self) -> bool {
        self.flags.deleted
    }

    #[inline]
    #[must_use]
    pub const fn is_expected(&self) -> bool {
        self.flags.expected
    }

    #[inline]
    #[must_use]
    pub const fn is_locally_known(&self) -> bool {
        self.flags.locally_known
    }

    #[inline]
    #[must_use]
    pub const fn is_ignored(&self) -> bool {
        self.flags.ignored
    }

    #[inline]
    #[must_use]
    pub const fn status(&self) -> ItemStatus {
        self.flags.status()
    }
}

// ------------------------------------------------------------
// DirectoryEntry: aggregates are computed once at construction.
// ------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
    id: ItemId,
    name: CompactString,
    children: Vec<CandidateItem>,
    size: u64,
    modified: Option<SystemTime>,
    status: ItemStatus,
}

impl DirectoryEntry {
    #[must_use]
    pub fn new(folder: &str, path: impl AsRef<Path>, children: Vec<CandidateItem>) -> Self {
        let id = ItemId::new(folder, path);
        let name = id.file_name();
        let size: u64 = children.iter().map(CandidateItem::size).sum();
        let modified: Option<SystemTime> = children.iter().filter_map(CandidateItem::modified).max();
        let status = aggregate_status(&children);

        Self {
            id,
            name,
            children,
            size,
            modified,
            status,
        }
    }

    #[must_use]
    pub const fn id(&self) -> &ItemId {
        &self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn children(&self) -> &[CandidateItem] {
        &self.children
    }

    /// Sum of all contained file sizes.
    #[must_use]
    pub const fn size(&self) -> u64 {
        self.size
    }

    /// Latest modification among contained items.
    #[must_use]
    pub const fn modified(&self) -> Option<SystemTime> {
        self.modified
    }

    #[must_use]
    pub const fn status(&self) -> ItemStatus {
        self.status
    }
}

// Deleted if every child is deleted (known when any child deletion is
// known), expected if every child is expected, otherwise normal.
fn aggregate_status(children: &[CandidateItem]) -> ItemStatus {
    if children.is_empty() {
        return ItemStatus::Normal;
    }

    let mut all_deleted = true;
    let mut any_known_deleted = false;
    let mut all_expected = true;

    for child in children {
        let status = child.status();
        all_deleted &= status.is_deleted();
        any_known_deleted |= status == ItemStatus::KnownDeleted;
        all_expected &= status == ItemStatus::Expected;
    }

    if all_deleted {
        if any_known_deleted {
            ItemStatus::KnownDeleted
        } else {
            ItemStatus::RemoteDeleted
        }
    } else if all_expected {
        ItemStatus::Expected
    } else {
        ItemStatus::Normal
    }
}

// ------------------------------------------------------------
// CandidateItem: the closed set of displayable entries.
// ------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemKind {
    Directory,
    File,
}

impl std::fmt::Display for ItemKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Directory => write!(f, "Dir"),
            Self::File => write!(f, "File"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CandidateItem {
    File(Arc<FileEntry>),
    Directory(Arc<DirectoryEntry>),
}

impl From<FileEntry> for CandidateItem {
    fn from(entry: FileEntry) -> Self {
        Self::File(Arc::new(entry))
    }
}

impl From<DirectoryEntry> for CandidateItem {
    fn from(entry: DirectoryEntry) -> Self {
        Self::Directory(Arc::new(entry))
    }
}

impl CandidateItem {
    #[inline]
    #[must_use]
    pub const fn kind(&self) -> ItemKind {
        match self {
            Self::File(_) => ItemKind::File,
            Self::Directory(_) => ItemKind::Directory,
        }
    }

    #[inline]
    #[must_use]
    pub fn id(&self) -> &ItemId {
        match self {
            Self::File(file) => &file.id,
            Self::Directory(dir) => dir.id(),
        }
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::File(file) => &file.name,
            Self::Directory(dir) => dir.name(),
        }
    }

    #[inline]
    #[must_use]
    pub fn status(&self) -> ItemStatus {
        match self {
            Self::File(file) => file.status(),
            Self::Directory(dir) => dir.status(),
        }
    }

    #[must_use]
    pub fn size(&self) -> u64 {
        match self {
            Self::File(file) => file.size,
            Self::Directory(dir) => dir.size(),
        }
    }

    #[must_use]
    pub fn modified(&self) -> Option<SystemTime> {
        match self {
            Self::File(file) => Some(file.modified),
            Self::Directory(dir) => dir.modified(),
        }
    }

    /// Display name of the member that last modified a file.
    #[must_use]
    pub fn attribution(&self) -> Option<&str> {
        match self {
            Self::File(file) => file.modified_by.as_ref().map(|m| m.display_name.as_str()),
            Self::Directory(_) => None,
        }
    }

    #[must_use]
    pub fn availability(&self) -> Option<u32> {
        match self {
            Self::File(file) => Some(file.availability),
            Self::Directory(_) => None,
        }
    }

    #[must_use]
    pub fn media(&self) -> Option<&MediaTags> {
        match self {
            Self::File(file) => file.media.as_ref(),
            Self::Directory(_) => None,
        }
    }
}

// ------------------------------------------------------------
// CandidateList: shared, immutable snapshot of one listing.
// ------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct CandidateList(Arc<Vec<CandidateItem>>);

impl CandidateList {
    /// Build a displayable list; remote-only deletions are dropped here so
    /// an unfiltered view never shows them.
    #[must_use]
    pub fn from_entries(entries: Vec<CandidateItem>) -> Self {
        let mut entries = entries;
        entries.retain(|item| item.status() != ItemStatus::RemoteDeleted);

        Self(Arc::new(entries))
    }

    /// Wrap items that were already taken from a prepared list.
    pub(crate) fn from_filtered(items: Vec<CandidateItem>) -> Self {
        Self(Arc::new(items))
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn get(&self, idx: usize) -> Option<&CandidateItem> {
        self.0.get(idx)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CandidateItem> {
        self.0.iter()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[CandidateItem] {
        &self.0
    }

    /// True when both lists are the same allocation.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl<'a> IntoIterator for &'a CandidateList {
    type Item = &'a CandidateItem;
    type IntoIter = std::slice::Iter<'a, CandidateItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
