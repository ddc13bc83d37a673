use std::collections::{BTreeMap, HashMap};

use log::trace;
use tokio::sync::broadcast;

use crate::{
    store::{OptimisticDiff, OptimisticId, ThreadListCache},
    thread::{Folder, Thread, ThreadId},
};

const CHANGE_BUFFER: usize = 64;

/// Published after every write so readers can re-render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreChange {
    List(Folder),
    Thread(ThreadId),
    Diff(Vec<ThreadId>),
}

/// Holds the authoritative snapshots received from the channel together
/// with the optimistic diffs that currently sit on top of them.
pub struct OptimisticStore {
    lists: HashMap<Folder, ThreadListCache>,
    threads: HashMap<ThreadId, Thread>,
    diffs: BTreeMap<OptimisticId, OptimisticDiff>,
    next_id: OptimisticId,
    changes: broadcast::Sender<StoreChange>,
}

impl Default for OptimisticStore {
    fn default() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_BUFFER);
        Self {
            lists: HashMap::new(),
            threads: HashMap::new(),
            diffs: BTreeMap::new(),
            next_id: OptimisticId::first(),
            changes,
        }
    }
}

impl OptimisticStore {
    pub fn subscribe(&self) -> broadcast::Receiver<StoreChange> {
        self.changes.subscribe()
    }

    pub fn apply_diff(&mut self, diff: OptimisticDiff) -> OptimisticId {
        let id = self.next_id;
        self.next_id = id.successor();
        trace!("applying {id}: {diff:?}");
        let thread_ids = diff.thread_ids().to_vec();
        self.diffs.insert(id, diff);
        self.publish(StoreChange::Diff(thread_ids));
        id
    }

    pub fn clear_diff(&mut self, id: OptimisticId) -> Option<OptimisticDiff> {
        let diff = self.diffs.remove(&id)?;
        trace!("cleared {id}");
        self.publish(StoreChange::Diff(diff.thread_ids().to_vec()));
        Some(diff)
    }

    pub fn diff(&self, id: OptimisticId) -> Option<&OptimisticDiff> {
        self.diffs.get(&id)
    }

    pub fn active_diffs(&self) -> usize {
        self.diffs.len()
    }

    /// Latest snapshot of a thread without any diff applied. Detail
    /// snapshots win over list entries.
    pub fn authoritative(&self, thread_id: &ThreadId) -> Option<&Thread> {
        self.threads.get(thread_id).or_else(|| {
            self.lists
                .values()
                .find_map(|list| list.find(thread_id.as_str()))
        })
    }

    pub fn has_detail(&self, thread_id: &ThreadId) -> bool {
        self.threads.contains_key(thread_id)
    }

    /// Merged view of a thread: the authoritative snapshot with every active
    /// diff touching it applied in registration order.
    pub fn read(&self, thread_id: &ThreadId) -> Option<Thread> {
        self.authoritative(thread_id)
            .map(|thread| self.merge(thread.clone()))
    }

    pub fn list(&self, folder: &Folder) -> Option<&ThreadListCache> {
        self.lists.get(folder)
    }

    pub fn cached_folders(&self) -> impl Iterator<Item = &Folder> {
        self.lists.keys()
    }

    /// Merged views of a folder's cached threads in list order.
    pub fn merged_list(&self, folder: &Folder) -> Vec<Thread> {
        self.lists.get(folder).map_or_else(Vec::new, |list| {
            list.threads()
                .iter()
                .map(|thread| self.merge(thread.clone()))
                .collect()
        })
    }

    pub fn mark_loading(&mut self, folder: &Folder) {
        self.lists
            .entry(folder.clone())
            .and_modify(ThreadListCache::set_loading)
            .or_insert_with(ThreadListCache::loading);
        self.publish(StoreChange::List(folder.clone()));
    }

    pub fn replace_list(
        &mut self,
        folder: Folder,
        threads: Vec<Thread>,
        next_page_token: Option<String>,
    ) {
        trace!("replacing {folder} with {} threads", threads.len());
        self.lists.insert(
            folder.clone(),
            ThreadListCache::snapshot(threads, next_page_token),
        );
        self.publish(StoreChange::List(folder));
    }

    pub fn upsert_thread(&mut self, thread: Thread) {
        let thread_id = thread.id().clone();
        trace!("upserting thread {thread_id}");
        self.threads.insert(thread_id.clone(), thread);
        self.publish(StoreChange::Thread(thread_id));
    }

    fn merge(&self, mut thread: Thread) -> Thread {
        for diff in self.diffs.values() {
            if diff.touches(thread.id()) {
                diff.apply_to(&mut thread);
            }
        }
        thread
    }

    fn publish(&self, change: StoreChange) {
        // no subscribers is fine
        let _ = self.changes.send(change);
    }
}

#[cfg(test)]
mod tests {
    use assertables::*;
    use rstest::*;

    use super::*;
    use crate::thread::{ThreadBuilder, ThreadFlag};

    fn thread(id: &str, folder: &str) -> Thread {
        assert_ok!(ThreadBuilder::default().id(id).folder(folder).build())
    }

    #[fixture]
    fn store() -> OptimisticStore {
        let mut store = OptimisticStore::default();
        store.replace_list(
            Folder::inbox(),
            vec![thread("t1", "inbox"), thread("t2", "inbox")],
            Some("page-2".to_string()),
        );
        store
    }

    fn star(ids: &[&str], value: bool) -> OptimisticDiff {
        OptimisticDiff::Flag {
            thread_ids: ids.iter().copied().map(ThreadId::from).collect(),
            flag: ThreadFlag::Starred,
            value,
        }
    }

    #[rstest]
    fn test_read_overlays_active_diff(mut store: OptimisticStore) {
        store.apply_diff(star(&["t1"], true));

        assert!(assert_some!(store.read(&"t1".into())).has(ThreadFlag::Starred));
        assert!(!assert_some!(store.read(&"t2".into())).has(ThreadFlag::Starred));
        assert!(
            !assert_some!(store.authoritative(&"t1".into())).has(ThreadFlag::Starred),
            "authoritative data should stay untouched"
        );
    }

    #[rstest]
    fn test_later_diff_wins(mut store: OptimisticStore) {
        store.apply_diff(star(&["t1"], true));
        let unstar = store.apply_diff(star(&["t1"], false));
        assert!(!assert_some!(store.read(&"t1".into())).has(ThreadFlag::Starred));

        store.clear_diff(unstar);
        assert!(assert_some!(store.read(&"t1".into())).has(ThreadFlag::Starred));
    }

    #[rstest]
    fn test_merged_list_applies_only_touching_diffs(mut store: OptimisticStore) {
        store.apply_diff(star(&["t2"], true));
        store.apply_diff(star(&["t3"], true));

        let starred: Vec<bool> = store
            .merged_list(&Folder::inbox())
            .iter()
            .map(|thread| thread.has(ThreadFlag::Starred))
            .collect();
        assert_eq!(vec![false, true], starred);
    }

    #[rstest]
    fn test_clear_diff_restores_authoritative_view(mut store: OptimisticStore) {
        let id = store.apply_diff(star(&["t1", "t2"], true));
        assert_some!(store.clear_diff(id));
        assert_none!(store.clear_diff(id));

        assert_eq!(store.authoritative(&"t1".into()).cloned(), store.read(&"t1".into()));
        assert_eq!(0, store.active_diffs());
    }

    #[rstest]
    fn test_detail_snapshot_wins_over_list_entry(mut store: OptimisticStore) {
        let mut detail = thread("t1", "inbox");
        detail.set_flag(ThreadFlag::Read, true);
        store.upsert_thread(detail);

        assert!(store.has_detail(&"t1".into()));
        assert!(assert_some!(store.read(&"t1".into())).has(ThreadFlag::Read));
    }

    #[rstest]
    fn test_replace_list_is_wholesale(mut store: OptimisticStore) {
        store.mark_loading(&Folder::inbox());
        assert!(assert_some!(store.list(&Folder::inbox())).is_loading());

        store.replace_list(Folder::inbox(), vec![thread("t3", "inbox")], None);

        let list = assert_some!(store.list(&Folder::inbox()));
        assert!(!list.is_loading());
        assert_none!(list.next_page_token());
        assert_some!(list.last_updated());
        assert_none!(store.read(&"t1".into()));
        assert_eq!(1, store.merged_list(&Folder::inbox()).len());
    }

    #[rstest]
    fn test_mark_loading_creates_placeholder() {
        let mut store = OptimisticStore::default();
        store.mark_loading(&Folder::bin());
        let list = assert_some!(store.list(&Folder::bin()));
        assert!(list.is_loading());
        assert_is_empty!(list.threads());
    }

    #[rstest]
    fn test_writes_are_published(mut store: OptimisticStore) {
        let mut changes = store.subscribe();
        let id = store.apply_diff(star(&["t1"], true));
        store.clear_diff(id);
        store.upsert_thread(thread("t9", "inbox"));

        let expected_diff = StoreChange::Diff(vec!["t1".into()]);
        assert_eq!(expected_diff, assert_ok!(changes.try_recv()));
        assert_eq!(expected_diff, assert_ok!(changes.try_recv()));
        assert_eq!(StoreChange::Thread("t9".into()), assert_ok!(changes.try_recv()));
        assert_err!(changes.try_recv());
    }
}
