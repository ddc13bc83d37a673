use std::{
    collections::{HashMap, VecDeque},
    time::Duration,
};

use futures::{FutureExt as _, StreamExt as _, future::LocalBoxFuture, stream::FuturesUnordered};
use log::{debug, error, info, trace};
use thiserror::Error;

use crate::{
    action::{ActionId, ActionKind, ActionRegistry, ActionRequest, Notifier, PendingAction, UndoWindows},
    command::{CommandError, CommandService},
    store::OptimisticStore,
    suppression::{SuppressionMarker, SuppressionQueue},
    sync::InboundSink,
    thread::{Folder, LabelId, Thread, ThreadId},
};

pub const DEFAULT_UNDO_WINDOW: Duration = Duration::from_secs(5);

type Commit = LocalBoxFuture<'static, (ActionId, Result<(), CommandError>)>;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum CoordinatorError {
    #[error("an action needs at least one target thread")]
    NoTargets,
}

/// Single read-refresh issued once the last in-flight action of a kind
/// settled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Refresh {
    pub kind: ActionKind,
    pub actions: Vec<ActionId>,
    pub thread_ids: Vec<ThreadId>,
    /// Listings changed by the batch. Empty when any listing may have
    /// changed.
    pub folders: Vec<Folder>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoordinatorEvent {
    CommitStarted(ActionId),
    Committed(ActionId),
    Failed {
        action: ActionId,
        error: CommandError,
    },
    Refresh(Refresh),
}

/// Drives every registered action from its optimistic diff through the undo
/// window to a commit or a rollback.
///
/// Registration, undo and dismissal are plain synchronous calls. Window
/// expiry and command completion surface through [`Coordinator::next_event`],
/// which the owner polls from its event loop.
pub struct Coordinator<C, N> {
    commands: C,
    notifier: N,
    undo_window: Duration,
    store: OptimisticStore,
    suppression: SuppressionQueue,
    registry: ActionRegistry,
    windows: UndoWindows,
    commits: FuturesUnordered<Commit>,
    settled: HashMap<ActionKind, Vec<PendingAction>>,
    events: VecDeque<CoordinatorEvent>,
}

impl<C: CommandService, N: Notifier> Coordinator<C, N> {
    pub fn new(commands: C, notifier: N, undo_window: Duration) -> Self {
        Self {
            commands,
            notifier,
            undo_window,
            store: OptimisticStore::default(),
            suppression: SuppressionQueue::default(),
            registry: ActionRegistry::default(),
            windows: UndoWindows::default(),
            commits: FuturesUnordered::new(),
            settled: HashMap::new(),
            events: VecDeque::new(),
        }
    }

    pub fn store(&self) -> &OptimisticStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut OptimisticStore {
        &mut self.store
    }

    pub fn suppression(&self) -> &SuppressionQueue {
        &self.suppression
    }

    pub fn registry(&self) -> &ActionRegistry {
        &self.registry
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    pub fn is_suppressed(&self, thread_id: &ThreadId) -> bool {
        self.suppression.is_suppressed(thread_id)
    }

    pub fn read_thread(&self, thread_id: &ThreadId) -> Option<Thread> {
        self.store.read(thread_id)
    }

    /// Applies the diff of `request` and registers it. The diff is visible in
    /// the store when this returns.
    ///
    /// With a non-empty `undo_message` the command is held back for the undo
    /// window; otherwise it is sent right away.
    pub fn register(
        &mut self,
        request: ActionRequest,
        undo_message: Option<&str>,
    ) -> Result<ActionId, CoordinatorError> {
        if request.thread_ids().is_empty() {
            return Err(CoordinatorError::NoTargets);
        }
        let id = ActionId::next();
        let optimistic_id = self.store.apply_diff(request.diff());
        if request.transitions_folder() {
            for thread_id in request.thread_ids() {
                self.suppression
                    .add(SuppressionMarker::thread(thread_id.clone(), id));
            }
        }
        debug!(
            "registered {id} ({}) on {} thread(s) as {optimistic_id}",
            request.kind(),
            request.thread_ids().len()
        );
        self.registry
            .insert(PendingAction::new(id, request, optimistic_id));

        match undo_message.map(str::trim).filter(|message| !message.is_empty()) {
            Some(message) => {
                self.windows.open(id, self.undo_window);
                self.notifier.undo_offered(id, message, self.undo_window);
            }
            None => self.commit(id),
        }
        Ok(id)
    }

    pub fn move_threads(
        &mut self,
        thread_ids: impl IntoIterator<Item = ThreadId>,
        source: Option<Folder>,
        destination: Folder,
        undo_message: Option<&str>,
    ) -> Result<ActionId, CoordinatorError> {
        self.register(
            ActionRequest::move_to(thread_ids, source, destination),
            undo_message,
        )
    }

    pub fn star(
        &mut self,
        thread_ids: impl IntoIterator<Item = ThreadId>,
        starred: bool,
        undo_message: Option<&str>,
    ) -> Result<ActionId, CoordinatorError> {
        self.register(ActionRequest::star(thread_ids, starred), undo_message)
    }

    pub fn mark_read(
        &mut self,
        thread_ids: impl IntoIterator<Item = ThreadId>,
        read: bool,
        undo_message: Option<&str>,
    ) -> Result<ActionId, CoordinatorError> {
        self.register(ActionRequest::read(thread_ids, read), undo_message)
    }

    pub fn mark_important(
        &mut self,
        thread_ids: impl IntoIterator<Item = ThreadId>,
        important: bool,
        undo_message: Option<&str>,
    ) -> Result<ActionId, CoordinatorError> {
        self.register(ActionRequest::important(thread_ids, important), undo_message)
    }

    pub fn modify_labels(
        &mut self,
        thread_ids: impl IntoIterator<Item = ThreadId>,
        added: Vec<LabelId>,
        removed: Vec<LabelId>,
        undo_message: Option<&str>,
    ) -> Result<ActionId, CoordinatorError> {
        self.register(ActionRequest::labels(thread_ids, added, removed), undo_message)
    }

    /// Rolls back an action whose window is still open. Returns `false` once
    /// the command has been sent.
    pub fn undo(&mut self, id: ActionId) -> bool {
        if !self.windows.cancel(id) {
            debug!("{id} can no longer be undone");
            return false;
        }
        let Some(action) = self.registry.remove(id) else {
            return false;
        };
        self.rollback(&action);
        self.notifier.undo_withdrawn(id);
        info!("undid {id} ({})", action.kind());
        self.refresh_if_settled(action.kind());
        true
    }

    pub fn undo_last(&mut self) -> Option<ActionId> {
        let id = self.registry.latest_undoable()?;
        self.undo(id).then_some(id)
    }

    /// Closes the undo window early and commits.
    pub fn dismiss(&mut self, id: ActionId) -> bool {
        if !self.windows.cancel(id) {
            return false;
        }
        self.notifier.undo_withdrawn(id);
        self.commit(id);
        true
    }

    /// Uncorrelated completion for `thread_ids`. Drops markers owned by
    /// actions that already left their undo window; markers of actions still
    /// awaiting theirs cannot be what completed.
    pub fn acknowledge(&mut self, thread_ids: &[ThreadId]) {
        for thread_id in thread_ids {
            for owner in self.suppression.owners(thread_id) {
                self.acknowledge_owner(thread_id, owner);
            }
        }
    }

    /// Completion of the dispatch sent for `id`. Markers of other actions on
    /// the same threads stay.
    pub fn acknowledge_action(&mut self, id: ActionId, thread_ids: &[ThreadId]) {
        for thread_id in thread_ids {
            self.acknowledge_owner(thread_id, id);
        }
    }

    fn acknowledge_owner(&mut self, thread_id: &ThreadId, owner: ActionId) {
        if !self.registry.is_awaiting_window(owner) {
            self.suppression
                .remove(&SuppressionMarker::thread(thread_id.clone(), owner));
        }
    }

    /// Next lifecycle event. Never resolves while nothing is pending. Cancel
    /// safe, so it can sit in a `select!` next to other sources.
    pub async fn next_event(&mut self) -> CoordinatorEvent {
        loop {
            if let Some(event) = self.events.pop_front() {
                return event;
            }
            tokio::select! {
                Some(id) = self.windows.next_expired() => {
                    self.notifier.undo_withdrawn(id);
                    self.commit(id);
                }
                Some((id, result)) = self.commits.next() => self.settle(id, result),
                else => std::future::pending::<()>().await,
            }
        }
    }

    fn commit(&mut self, id: ActionId) {
        let Some(action) = self.registry.get_mut(id) else {
            return;
        };
        if !action.start_commit() {
            return;
        }
        debug!("committing {id}");
        let future = self.commands.execute(id, action.request());
        self.commits
            .push(async move { (id, future.await) }.boxed_local());
        self.events.push_back(CoordinatorEvent::CommitStarted(id));
    }

    fn settle(&mut self, id: ActionId, result: Result<(), CommandError>) {
        let Some(action) = self.registry.remove(id) else {
            trace!("{id} settled after it was dropped");
            return;
        };
        let kind = action.kind();
        match result {
            Ok(()) => {
                info!("{id} ({kind}) committed");
                self.release_markers(&action);
                self.settled.entry(kind).or_default().push(action);
                self.events.push_back(CoordinatorEvent::Committed(id));
            }
            Err(error) => {
                error!("{id} ({kind}) failed: {error}");
                self.rollback(&action);
                self.notifier.action_failed(&action, &error);
                self.events
                    .push_back(CoordinatorEvent::Failed { action: id, error });
            }
        }
        self.refresh_if_settled(kind);
    }

    /// Emits the coalesced refresh for `kind` once no action of that kind is
    /// registered anymore, and clears the diffs of the settled batch.
    fn refresh_if_settled(&mut self, kind: ActionKind) {
        if self.registry.in_flight(kind) > 0 {
            return;
        }
        let Some(batch) = self.settled.remove(&kind) else {
            return;
        };
        let mut refresh = Refresh {
            kind,
            actions: Vec::with_capacity(batch.len()),
            thread_ids: Vec::new(),
            folders: Vec::new(),
        };
        let mut every_folder = false;
        for action in batch {
            self.store.clear_diff(action.optimistic_id());
            every_folder |= action.request().affected_folders().is_empty();
            refresh.actions.push(action.id());
            for thread_id in action.request().thread_ids() {
                if !refresh.thread_ids.contains(thread_id) {
                    refresh.thread_ids.push(thread_id.clone());
                }
            }
            for folder in action.request().affected_folders() {
                if !refresh.folders.contains(&folder) {
                    refresh.folders.push(folder);
                }
            }
        }
        if every_folder {
            refresh.folders.clear();
        }
        debug!(
            "refreshing after {} {kind} action(s) settled",
            refresh.actions.len()
        );
        self.events.push_back(CoordinatorEvent::Refresh(refresh));
    }

    fn rollback(&mut self, action: &PendingAction) {
        self.store.clear_diff(action.optimistic_id());
        self.release_markers(action);
    }

    fn release_markers(&mut self, action: &PendingAction) {
        if !action.request().transitions_folder() {
            return;
        }
        for thread_id in action.request().thread_ids() {
            self.suppression
                .remove(&SuppressionMarker::thread(thread_id.clone(), action.id()));
        }
    }
}

impl<C: CommandService, N: Notifier> InboundSink for Coordinator<C, N> {
    fn list_snapshot(&mut self, folder: Folder, threads: Vec<Thread>, next_page_token: Option<String>) {
        self.store.replace_list(folder, threads, next_page_token);
    }

    fn thread_snapshot(&mut self, thread: Thread) {
        self.store.upsert_thread(thread);
    }

    fn action_complete(&mut self, request_id: Option<&str>, thread_ids: &[ThreadId]) {
        match request_id.map(str::parse::<ActionId>) {
            Some(Ok(id)) => self.acknowledge_action(id, thread_ids),
            Some(Err(_)) => {
                debug!("completion for unknown request {request_id:?}");
                self.acknowledge(thread_ids);
            }
            None => self.acknowledge(thread_ids),
        }
    }
}
