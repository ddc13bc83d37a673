use std::fmt::Display;

use crate::thread::{Folder, LabelId, Thread, ThreadFlag, ThreadId};

/// Handle of one applied diff. Ids grow monotonically, so ordering by id is
/// ordering by application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct OptimisticId(u64);

impl OptimisticId {
    pub(super) fn first() -> Self {
        Self(1)
    }

    pub(super) fn successor(self) -> Self {
        Self(self.0 + 1)
    }
}

impl Display for OptimisticId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "opt-{}", self.0)
    }
}

/// Local projection patch shown until the mailbox service confirms a change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptimisticDiff {
    Flag {
        thread_ids: Vec<ThreadId>,
        flag: ThreadFlag,
        value: bool,
    },
    Labels {
        thread_ids: Vec<ThreadId>,
        added: Vec<LabelId>,
        removed: Vec<LabelId>,
    },
    Move {
        thread_ids: Vec<ThreadId>,
        destination: Folder,
    },
}

impl OptimisticDiff {
    pub fn thread_ids(&self) -> &[ThreadId] {
        match self {
            OptimisticDiff::Flag { thread_ids, .. }
            | OptimisticDiff::Labels { thread_ids, .. }
            | OptimisticDiff::Move { thread_ids, .. } => thread_ids,
        }
    }

    pub fn touches(&self, thread_id: &ThreadId) -> bool {
        self.thread_ids().contains(thread_id)
    }

    /// Overlays this diff on `thread`. Only the fields the diff names change.
    pub fn apply_to(&self, thread: &mut Thread) {
        match self {
            OptimisticDiff::Flag { flag, value, .. } => thread.set_flag(*flag, *value),
            OptimisticDiff::Labels { added, removed, .. } => {
                for label in removed {
                    thread.remove_label(label);
                }
                for label in added {
                    thread.add_label(label.clone());
                }
            }
            OptimisticDiff::Move { destination, .. } => thread.set_folder(destination.clone()),
        }
    }
}
