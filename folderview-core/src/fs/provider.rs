//! `src/fs/provider.rs`
//! ============================================================
//! Narrow interface to the folder / file-tree collaborator.
//!
//! The collaborator owns disk, database and peer state; this crate only
//! asks it for a fresh listing and for the folder's membership picture.
//! Per-item status (deleted / expected / locally known / ignored) travels
//! inside the returned entries as [`FileFlags`](super::candidate::FileFlags).

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ViewResult;
use crate::fs::candidate::CandidateItem;

/// Membership and connectivity of the folder, used for the status row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Membership {
    /// Members other than this node.
    pub remote_members: usize,

    /// Remote members currently connected.
    pub connected_members: usize,

    /// True while remote file lists are still being received.
    pub fetching_lists: bool,
}

pub trait FolderProvider: Send + Sync + 'static {
    /// Fresh listing of `directory`; when `recursive` the collaborator
    /// flattens nested entries into the returned list.
    fn list_entries(&self, directory: &Path, recursive: bool) -> ViewResult<Vec<CandidateItem>>;

    fn membership(&self) -> Membership;
}

/// External signals that the listing may be stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChangeEvent {
    FolderContentChanged,
    RemoteListChanged,
    MembershipChanged,
    PeerDisconnected,
    TransferProgressed,
}

impl std::fmt::Display for ChangeEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s: &str = match self {
            Self::FolderContentChanged => "folder_content_changed",
            Self::RemoteListChanged => "remote_list_changed",
            Self::MembershipChanged => "membership_changed",
            Self::PeerDisconnected => "peer_disconnected",
            Self::TransferProgressed => "transfer_progressed",
        };

        write!(f, "{s}")
    }
}
