use std::{collections::HashSet, fmt::Display};

use crate::{
    store::OptimisticDiff,
    thread::{Folder, LabelId, ThreadFlag, ThreadId},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    Move,
    Star,
    Read,
    Important,
    Label,
}

impl Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActionKind::Move => write!(f, "move"),
            ActionKind::Star => write!(f, "star"),
            ActionKind::Read => write!(f, "read"),
            ActionKind::Important => write!(f, "important"),
            ActionKind::Label => write!(f, "label"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionParams {
    Move {
        source: Option<Folder>,
        destination: Folder,
    },
    Star(bool),
    Read(bool),
    Important(bool),
    Label {
        added: Vec<LabelId>,
        removed: Vec<LabelId>,
    },
}

/// What the user asked for: the same change applied to every target thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionRequest {
    thread_ids: Vec<ThreadId>,
    params: ActionParams,
}

impl ActionRequest {
    /// Duplicate thread ids are dropped, first occurrence wins.
    pub fn new(thread_ids: impl IntoIterator<Item = ThreadId>, params: ActionParams) -> Self {
        let mut seen = HashSet::new();
        let thread_ids = thread_ids
            .into_iter()
            .filter(|id| seen.insert(id.clone()))
            .collect();
        Self { thread_ids, params }
    }

    pub fn move_to(
        thread_ids: impl IntoIterator<Item = ThreadId>,
        source: Option<Folder>,
        destination: Folder,
    ) -> Self {
        Self::new(
            thread_ids,
            ActionParams::Move {
                source,
                destination,
            },
        )
    }

    pub fn star(thread_ids: impl IntoIterator<Item = ThreadId>, starred: bool) -> Self {
        Self::new(thread_ids, ActionParams::Star(starred))
    }

    pub fn read(thread_ids: impl IntoIterator<Item = ThreadId>, read: bool) -> Self {
        Self::new(thread_ids, ActionParams::Read(read))
    }

    pub fn important(thread_ids: impl IntoIterator<Item = ThreadId>, important: bool) -> Self {
        Self::new(thread_ids, ActionParams::Important(important))
    }

    pub fn labels(
        thread_ids: impl IntoIterator<Item = ThreadId>,
        added: Vec<LabelId>,
        removed: Vec<LabelId>,
    ) -> Self {
        Self::new(thread_ids, ActionParams::Label { added, removed })
    }

    pub fn thread_ids(&self) -> &[ThreadId] {
        &self.thread_ids
    }

    pub fn params(&self) -> &ActionParams {
        &self.params
    }

    pub fn kind(&self) -> ActionKind {
        match self.params {
            ActionParams::Move { .. } => ActionKind::Move,
            ActionParams::Star(_) => ActionKind::Star,
            ActionParams::Read(_) => ActionKind::Read,
            ActionParams::Important(_) => ActionKind::Important,
            ActionParams::Label { .. } => ActionKind::Label,
        }
    }

    /// Whether the targets leave their current folder, which hides them from
    /// list views until the move is confirmed.
    pub fn transitions_folder(&self) -> bool {
        matches!(self.params, ActionParams::Move { .. })
    }

    /// Folders whose lists change once this action is confirmed. Empty when
    /// that is not known, as for flag changes or a move without a source.
    pub fn affected_folders(&self) -> Vec<Folder> {
        match &self.params {
            ActionParams::Move {
                source: Some(source),
                destination,
            } => vec![source.clone(), destination.clone()],
            _ => Vec::new(),
        }
    }

    pub fn diff(&self) -> OptimisticDiff {
        let thread_ids = self.thread_ids.clone();
        match &self.params {
            ActionParams::Move { destination, .. } => OptimisticDiff::Move {
                thread_ids,
                destination: destination.clone(),
            },
            ActionParams::Star(value) => OptimisticDiff::Flag {
                thread_ids,
                flag: ThreadFlag::Starred,
                value: *value,
            },
            ActionParams::Read(value) => OptimisticDiff::Flag {
                thread_ids,
                flag: ThreadFlag::Read,
                value: *value,
            },
            ActionParams::Important(value) => OptimisticDiff::Flag {
                thread_ids,
                flag: ThreadFlag::Important,
                value: *value,
            },
            ActionParams::Label { added, removed } => OptimisticDiff::Labels {
                thread_ids,
                added: added.clone(),
                removed: removed.clone(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use assertables::*;
    use rstest::*;

    use super::*;

    fn ids(ids: &[&str]) -> Vec<ThreadId> {
        ids.iter().copied().map(ThreadId::from).collect()
    }

    #[rstest]
    fn test_duplicate_targets_are_dropped() {
        let request = ActionRequest::star(ids(&["t1", "t2", "t1"]), true);
        assert_eq!(ids(&["t1", "t2"]), request.thread_ids());
    }

    #[rstest]
    #[case(ActionRequest::star(ids(&["t1"]), true), ActionKind::Star, false)]
    #[case(ActionRequest::read(ids(&["t1"]), false), ActionKind::Read, false)]
    #[case(ActionRequest::important(ids(&["t1"]), true), ActionKind::Important, false)]
    #[case(ActionRequest::labels(ids(&["t1"]), vec!["L1".into()], vec![]), ActionKind::Label, false)]
    #[case(ActionRequest::move_to(ids(&["t1"]), None, Folder::bin()), ActionKind::Move, true)]
    fn test_kind_and_folder_transition(
        #[case] request: ActionRequest,
        #[case] kind: ActionKind,
        #[case] transitions: bool,
    ) {
        assert_eq!(kind, request.kind());
        assert_eq!(transitions, request.transitions_folder());
    }

    #[rstest]
    fn test_move_affects_source_and_destination() {
        let request = ActionRequest::move_to(ids(&["t1"]), Some(Folder::inbox()), Folder::archive());
        assert_eq!(
            vec![Folder::inbox(), Folder::archive()],
            request.affected_folders()
        );
        assert_eq!(
            OptimisticDiff::Move {
                thread_ids: ids(&["t1"]),
                destination: Folder::archive(),
            },
            request.diff()
        );
        assert_is_empty!(ActionRequest::move_to(ids(&["t1"]), None, Folder::archive()).affected_folders());
        assert_is_empty!(ActionRequest::star(ids(&["t1"]), true).affected_folders());
    }

    #[rstest]
    fn test_read_maps_to_read_flag_diff() {
        let diff = ActionRequest::read(ids(&["t1", "t2"]), true).diff();
        assert_eq!(
            OptimisticDiff::Flag {
                thread_ids: ids(&["t1", "t2"]),
                flag: ThreadFlag::Read,
                value: true,
            },
            diff
        );
    }
}
