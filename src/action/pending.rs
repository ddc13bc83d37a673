use std::collections::{HashMap, HashSet};

use derive_getters::Getters;

use crate::{
    action::{ActionId, ActionKind, ActionRequest},
    store::OptimisticId,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// The undo window is open; the command has not been sent.
    AwaitingWindow,
    /// The command service has been invoked. No way back from here.
    Committing,
}

/// One registered optimistic operation.
#[derive(Debug, Getters)]
pub struct PendingAction {
    #[getter(skip)]
    id: ActionId,
    request: ActionRequest,
    #[getter(skip)]
    optimistic_id: OptimisticId,
    #[getter(skip)]
    phase: Phase,
}

impl PendingAction {
    pub(crate) fn new(id: ActionId, request: ActionRequest, optimistic_id: OptimisticId) -> Self {
        Self {
            id,
            request,
            optimistic_id,
            phase: Phase::AwaitingWindow,
        }
    }

    pub fn id(&self) -> ActionId {
        self.id
    }

    pub fn optimistic_id(&self) -> OptimisticId {
        self.optimistic_id
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn kind(&self) -> ActionKind {
        self.request.kind()
    }

    pub fn is_awaiting_window(&self) -> bool {
        self.phase == Phase::AwaitingWindow
    }

    pub(crate) fn start_commit(&mut self) -> bool {
        if self.phase == Phase::Committing {
            return false;
        }
        self.phase = Phase::Committing;
        true
    }
}

/// Registered actions keyed by id, grouped by kind, in registration order.
#[derive(Debug, Default)]
pub struct ActionRegistry {
    actions: HashMap<ActionId, PendingAction>,
    by_kind: HashMap<ActionKind, HashSet<ActionId>>,
    order: Vec<ActionId>,
}

impl ActionRegistry {
    pub fn insert(&mut self, action: PendingAction) {
        let id = action.id();
        self.by_kind.entry(action.kind()).or_default().insert(id);
        self.order.push(id);
        self.actions.insert(id, action);
    }

    pub fn get_mut(&mut self, id: ActionId) -> Option<&mut PendingAction> {
        self.actions.get_mut(&id)
    }

    pub fn remove(&mut self, id: ActionId) -> Option<PendingAction> {
        let action = self.actions.remove(&id)?;
        if let Some(ids) = self.by_kind.get_mut(&action.kind()) {
            ids.remove(&id);
        }
        self.order.retain(|other| *other != id);
        Some(action)
    }

    /// Number of registered actions of `kind`, whatever their phase.
    pub fn in_flight(&self, kind: ActionKind) -> usize {
        self.by_kind.get(&kind).map_or(0, HashSet::len)
    }

    pub fn is_awaiting_window(&self, id: ActionId) -> bool {
        self.actions
            .get(&id)
            .is_some_and(PendingAction::is_awaiting_window)
    }

    /// Most recently registered action that can still be rolled back.
    pub fn latest_undoable(&self) -> Option<ActionId> {
        self.order
            .iter()
            .rev()
            .copied()
            .find(|id| self.is_awaiting_window(*id))
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use assertables::*;
    use rstest::*;

    use super::*;
    use crate::store::OptimisticStore;

    fn action(store: &mut OptimisticStore, request: ActionRequest) -> PendingAction {
        let optimistic_id = store.apply_diff(request.diff());
        PendingAction::new(ActionId::next(), request, optimistic_id)
    }

    #[rstest]
    fn test_registry_groups_by_kind() {
        let mut store = OptimisticStore::default();
        let mut registry = ActionRegistry::default();
        let star = action(&mut store, ActionRequest::star(["t1".into()], true));
        let star_id = star.id();
        registry.insert(star);
        registry.insert(action(&mut store, ActionRequest::star(["t2".into()], true)));
        registry.insert(action(&mut store, ActionRequest::read(["t1".into()], true)));

        assert_eq!(2, registry.in_flight(ActionKind::Star));
        assert_eq!(1, registry.in_flight(ActionKind::Read));
        assert_eq!(0, registry.in_flight(ActionKind::Move));

        assert_some!(registry.remove(star_id));
        assert_none!(registry.remove(star_id));
        assert_eq!(1, registry.in_flight(ActionKind::Star));
        assert_eq!(2, registry.len());
    }

    #[rstest]
    fn test_latest_undoable_skips_committing_actions() {
        let mut store = OptimisticStore::default();
        let mut registry = ActionRegistry::default();
        let older = action(&mut store, ActionRequest::star(["t1".into()], true));
        let older_id = older.id();
        let newer = action(&mut store, ActionRequest::read(["t1".into()], true));
        let newer_id = newer.id();
        registry.insert(older);
        registry.insert(newer);

        assert_eq!(Some(newer_id), registry.latest_undoable());

        let newer = assert_some!(registry.get_mut(newer_id));
        assert!(newer.start_commit());
        assert!(!newer.start_commit());
        assert_eq!(Some(older_id), registry.latest_undoable());
    }
}
