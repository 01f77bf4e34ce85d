pub mod error;

pub mod config;

pub mod logging;

pub mod fs {
    pub mod candidate;
    pub use candidate::{
        CandidateItem, CandidateList, DirectoryEntry, FileEntry, FileFlags, ItemId, ItemKind,
        ItemStatus, MediaTags, Member,
    };

    pub mod provider;
    pub use provider::{ChangeEvent, FolderProvider, Membership};
}

pub mod model {
    pub mod criteria;
    pub use criteria::{FilterCriteria, Keyword};

    pub mod comparators;
    pub use comparators::{EntryComparator, Reversed, SortKey};

    pub mod selection;
    pub use selection::{SelectionRemap, SelectionSet};

    pub mod presentation;
    pub use presentation::{Cell, Column, EmptyReason, PresentationModel};
}

pub mod operators {
    pub mod filter_task;
    pub use filter_task::{FilterEngine, FilterHandle, FilteredResult, StatusCounts};
}

pub mod util {
    pub mod debounce;
}

pub mod controller {
    pub mod actions;
    pub use actions::Action;

    pub mod refresh_scheduler;
    pub use refresh_scheduler::RefreshScheduler;

    pub mod folder_view;
    pub use folder_view::{FolderView, ViewListener};
}

pub use config::Config;
pub use controller::FolderView;
pub use error::{ViewError, ViewResult};
