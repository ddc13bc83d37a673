use std::collections::{HashMap, HashSet};

use log::trace;

use crate::{action::ActionId, thread::ThreadId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Thread,
}

/// Hides one entity from list views while the action owning the marker is
/// in flight.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SuppressionMarker {
    entity_kind: EntityKind,
    entity_id: ThreadId,
    owner: ActionId,
}

impl SuppressionMarker {
    pub fn thread(entity_id: ThreadId, owner: ActionId) -> Self {
        Self {
            entity_kind: EntityKind::Thread,
            entity_id,
            owner,
        }
    }

    pub fn entity_id(&self) -> &ThreadId {
        &self.entity_id
    }

    pub fn owner(&self) -> ActionId {
        self.owner
    }
}

/// Set of active markers. An entity stays suppressed as long as at least one
/// action still holds a marker for it.
#[derive(Debug, Default)]
pub struct SuppressionQueue {
    threads: HashMap<ThreadId, HashSet<ActionId>>,
}

impl SuppressionQueue {
    fn entities(&mut self, kind: EntityKind) -> &mut HashMap<ThreadId, HashSet<ActionId>> {
        match kind {
            EntityKind::Thread => &mut self.threads,
        }
    }

    /// Returns `false` if the marker was already present.
    pub fn add(&mut self, marker: SuppressionMarker) -> bool {
        trace!("suppressing {} for {}", marker.entity_id, marker.owner);
        self.entities(marker.entity_kind)
            .entry(marker.entity_id)
            .or_default()
            .insert(marker.owner)
    }

    /// Returns `false` if the marker was not present.
    pub fn remove(&mut self, marker: &SuppressionMarker) -> bool {
        let entities = self.entities(marker.entity_kind);
        let Some(owners) = entities.get_mut(&marker.entity_id) else {
            return false;
        };
        let removed = owners.remove(&marker.owner);
        if owners.is_empty() {
            trace!("{} visible again", marker.entity_id);
            entities.remove(&marker.entity_id);
        }
        removed
    }

    pub fn is_suppressed(&self, thread_id: &ThreadId) -> bool {
        self.threads.contains_key(thread_id)
    }

    /// Actions currently holding a marker for the thread.
    pub fn owners(&self, thread_id: &ThreadId) -> Vec<ActionId> {
        self.threads
            .get(thread_id)
            .map_or_else(Vec::new, |owners| owners.iter().copied().collect())
    }

    pub fn len(&self) -> usize {
        self.threads.values().map(HashSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.threads.is_empty()
    }
}
