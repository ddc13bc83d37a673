use log::{debug, warn};
use tokio::sync::{broadcast, watch};

use crate::{
    action::{
        ActionId, ActionRequest, Coordinator, CoordinatorError, CoordinatorEvent, LogNotifier,
        Notifier, Refresh,
    },
    command::CommandError,
    config::{ChannelConfig, Config},
    store::StoreChange,
    sync::{
        ChannelCommandService, ChannelEvent, ListRequest, MalformedMessage, MessageType,
        SyncClient, SyncConnectionState, SyncError,
    },
    thread::{ConnectionId, Folder, Thread, ThreadId},
};

#[derive(Debug)]
pub enum SessionEvent {
    Action(CoordinatorEvent),
    Synced(MessageType),
    Malformed(MalformedMessage),
    Disconnected,
}

/// Everything one mailbox view talks to: the action coordinator with its
/// store, and the sync channel feeding both.
pub struct Session<N: Notifier = LogNotifier> {
    coordinator: Coordinator<ChannelCommandService, N>,
    channel: SyncClient,
    channel_config: ChannelConfig,
}

impl Session<LogNotifier> {
    pub fn new(config: &Config) -> Self {
        Self::with_notifier(config, LogNotifier)
    }
}

impl<N: Notifier> Session<N> {
    pub fn with_notifier(config: &Config, notifier: N) -> Self {
        let channel = SyncClient::new(config.channel().max_line_length());
        let commands = channel.command_service(config.actions().commit_timeout());
        Self {
            coordinator: Coordinator::new(commands, notifier, config.actions().undo_window()),
            channel,
            channel_config: config.channel().clone(),
        }
    }

    pub fn coordinator(&self) -> &Coordinator<ChannelCommandService, N> {
        &self.coordinator
    }

    pub fn register_action(
        &mut self,
        request: ActionRequest,
        undo_message: Option<&str>,
    ) -> Result<ActionId, CoordinatorError> {
        self.coordinator.register(request, undo_message)
    }

    pub fn undo(&mut self, id: ActionId) -> bool {
        self.coordinator.undo(id)
    }

    pub fn undo_last(&mut self) -> Option<ActionId> {
        self.coordinator.undo_last()
    }

    pub fn dismiss(&mut self, id: ActionId) -> bool {
        self.coordinator.dismiss(id)
    }

    pub fn is_suppressed(&self, thread_id: &ThreadId) -> bool {
        self.coordinator.is_suppressed(thread_id)
    }

    pub fn read_thread(&self, thread_id: &ThreadId) -> Option<Thread> {
        self.coordinator.read_thread(thread_id)
    }

    /// Merged threads of `folder` without the ones hidden by in-flight
    /// moves.
    pub fn list_view(&self, folder: &Folder) -> Vec<Thread> {
        self.coordinator
            .store()
            .merged_list(folder)
            .into_iter()
            .filter(|thread| !self.is_suppressed(thread.id()))
            .collect()
    }

    pub fn is_loading(&self, folder: &Folder) -> bool {
        self.coordinator
            .store()
            .list(folder)
            .is_some_and(|list| list.is_loading())
    }

    pub fn connection_state(&self) -> &SyncConnectionState {
        self.channel.state()
    }

    pub fn joined(&self) -> watch::Receiver<Option<ConnectionId>> {
        self.channel.joined()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreChange> {
        self.coordinator.store().subscribe()
    }

    pub fn request_list(&mut self, request: &ListRequest) -> Result<(), CommandError> {
        self.channel.request_list(request)?;
        self.coordinator.store_mut().mark_loading(request.folder());
        Ok(())
    }

    pub fn request_thread(&mut self, thread_id: ThreadId) -> Result<(), CommandError> {
        self.channel.request_thread(thread_id)
    }

    pub async fn connect(&mut self, connection_id: ConnectionId) -> Result<(), SyncError> {
        self.channel.connect(&self.channel_config, connection_id).await
    }

    pub async fn switch_connection(&mut self, connection_id: ConnectionId) -> Result<(), SyncError> {
        self.channel
            .switch_connection(&self.channel_config, connection_id)
            .await
    }

    /// Uses an established transport as the channel of `connection_id`.
    pub fn attach<T>(&mut self, transport: T, connection_id: ConnectionId)
    where
        T: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin + Send + 'static,
    {
        self.channel.attach(transport, connection_id);
    }

    /// Waits for the next thing that happened: an action moving through its
    /// lifecycle or a message from the channel, which is applied before this
    /// returns.
    pub async fn turn(&mut self) -> SessionEvent {
        tokio::select! {
            event = self.coordinator.next_event() => {
                if let CoordinatorEvent::Refresh(refresh) = &event {
                    self.refresh(refresh);
                }
                SessionEvent::Action(event)
            }
            event = self.channel.next_event() => match event {
                ChannelEvent::Message(envelope) => {
                    match self.channel.handle(envelope, &mut self.coordinator) {
                        Ok(kind) => SessionEvent::Synced(kind),
                        Err(malformed) => {
                            warn!("ignoring message: {malformed}");
                            SessionEvent::Malformed(malformed)
                        }
                    }
                }
                ChannelEvent::Malformed(malformed) => SessionEvent::Malformed(malformed),
                ChannelEvent::Closed => SessionEvent::Disconnected,
            },
        }
    }

    /// Re-reads the cached lists and cached details touched by the settled
    /// batch.
    fn refresh(&mut self, refresh: &Refresh) {
        let folders: Vec<Folder> = self
            .coordinator
            .store()
            .cached_folders()
            .filter(|folder| refresh.folders.is_empty() || refresh.folders.contains(folder))
            .cloned()
            .collect();
        debug!(
            "{} refresh: {} folder(s), {} thread(s)",
            refresh.kind,
            folders.len(),
            refresh.thread_ids.len()
        );
        for folder in folders {
            if self.request_list(&ListRequest::first_page(folder)).is_err() {
                return;
            }
        }
        for thread_id in &refresh.thread_ids {
            if self.coordinator.store().has_detail(thread_id)
                && self.request_thread(thread_id.clone()).is_err()
            {
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use assertables::*;
    use futures::{SinkExt, StreamExt};
    use rstest::*;
    use serde_json::{Value, json};
    use tokio::{
        io::{DuplexStream, duplex},
        time::timeout,
    };
    use tokio_util::codec::{Framed, LinesCodec};

    use super::*;
    use crate::{action::ActionKind, thread::ThreadFlag};

    type Remote = Framed<DuplexStream, LinesCodec>;

    #[fixture]
    fn config() -> Config {
        assert_ok!("[channel]\nhost = \"localhost\"\nport = 1\n[actions]\nundo_window_ms = 5000\n".parse())
    }

    async fn receive(remote: &mut Remote) -> Value {
        let line = assert_ok!(assert_some!(remote.next().await));
        assert_ok!(serde_json::from_str(&line))
    }

    async fn turn(session: &mut Session) -> SessionEvent {
        timeout(std::time::Duration::from_secs(60), session.turn())
            .await
            .expect("the session should make progress")
    }

    async fn connected(config: &Config) -> (Session, Remote) {
        let (local, remote) = duplex(64 * 1024);
        let mut session = Session::new(config);
        session.attach(local, "conn-1".into());
        let mut remote = Framed::new(remote, LinesCodec::new());
        assert_eq!("join", receive(&mut remote).await["type"]);

        assert_ok!(session.request_list(&ListRequest::first_page(Folder::inbox())));
        assert!(session.is_loading(&Folder::inbox()));
        assert_eq!("list-request", receive(&mut remote).await["type"]);
        assert_ok!(remote
            .send(r#"{"type":"list-snapshot","data":{"folder":"inbox","threads":[{"id":"t1","folder":"inbox"},{"id":"t2","folder":"inbox"}]}}"#)
            .await);
        assert_matches!(turn(&mut session).await, SessionEvent::Synced(MessageType::ListSnapshot));
        assert!(!session.is_loading(&Folder::inbox()));
        (session, remote)
    }

    #[rstest]
    #[tokio::test(start_paused = true)]
    async fn test_move_round_trip(config: Config) {
        let (mut session, mut remote) = connected(&config).await;

        let id = assert_ok!(session.register_action(
            ActionRequest::move_to(["t1".into()], Some(Folder::inbox()), Folder::bin()),
            Some("Moved to bin"),
        ));
        let visible: Vec<_> = session
            .list_view(&Folder::inbox())
            .into_iter()
            .map(|thread| thread.id().clone())
            .collect();
        assert_eq!(vec![ThreadId::from("t2")], visible);

        assert_matches!(turn(&mut session).await, SessionEvent::Action(CoordinatorEvent::CommitStarted(_)));
        let dispatch = receive(&mut remote).await;
        assert_eq!("action-dispatch", dispatch["type"]);
        assert_eq!("BULK_DELETE", dispatch["data"]["action"]);
        assert_eq!(id.to_string(), dispatch["requestId"]);

        let reply = json!({
            "type": "action-complete",
            "data": {"threadIds": ["t1"]},
            "requestId": id.to_string(),
        });
        assert_ok!(remote.send(reply.to_string()).await);

        let mut refreshed = false;
        while !refreshed {
            match turn(&mut session).await {
                SessionEvent::Action(CoordinatorEvent::Refresh(refresh)) => {
                    assert_eq!(vec![id], refresh.actions);
                    refreshed = true;
                }
                SessionEvent::Action(CoordinatorEvent::Committed(committed)) => assert_eq!(id, committed),
                SessionEvent::Synced(MessageType::ActionComplete) => {}
                other => panic!("unexpected {other:?}"),
            }
        }
        assert!(!session.is_suppressed(&"t1".into()));

        let request = receive(&mut remote).await;
        assert_eq!("list-request", request["type"]);
        assert_eq!("inbox", request["data"]["folder"]);
    }

    #[rstest]
    #[tokio::test(start_paused = true)]
    async fn test_move_refresh_skips_untouched_folders(config: Config) {
        let (mut session, mut remote) = connected(&config).await;
        assert_ok!(session.request_list(&ListRequest::first_page(Folder::from("spam"))));
        receive(&mut remote).await;
        assert_ok!(remote
            .send(r#"{"type":"list-snapshot","data":{"folder":"spam","threads":[{"id":"s1","folder":"spam"}]}}"#)
            .await);
        assert_matches!(turn(&mut session).await, SessionEvent::Synced(MessageType::ListSnapshot));

        let id = assert_ok!(session.register_action(
            ActionRequest::move_to(["t1".into()], Some(Folder::inbox()), Folder::archive()),
            None,
        ));
        receive(&mut remote).await;
        let reply = json!({
            "type": "action-complete",
            "data": {"threadIds": ["t1"]},
            "requestId": id.to_string(),
        });
        assert_ok!(remote.send(reply.to_string()).await);
        loop {
            if let SessionEvent::Action(CoordinatorEvent::Refresh(refresh)) = turn(&mut session).await {
                assert_eq!(vec![Folder::inbox(), Folder::archive()], refresh.folders);
                break;
            }
        }

        let request = receive(&mut remote).await;
        assert_eq!("list-request", request["type"]);
        assert_eq!("inbox", request["data"]["folder"]);
        assert_err!(timeout(std::time::Duration::from_millis(10), remote.next()).await);
    }

    #[rstest]
    #[tokio::test(start_paused = true)]
    async fn test_rejected_star_is_reverted(config: Config) {
        let (mut session, mut remote) = connected(&config).await;

        let id = assert_ok!(session.register_action(ActionRequest::star(["t2".into()], true), None));
        assert!(assert_some!(session.read_thread(&"t2".into())).has(ThreadFlag::Starred));
        assert_matches!(turn(&mut session).await, SessionEvent::Action(CoordinatorEvent::CommitStarted(_)));
        receive(&mut remote).await;

        let reply = json!({
            "type": "action-error",
            "data": {"threadIds": ["t2"], "message": "read only"},
            "requestId": id.to_string(),
        });
        assert_ok!(remote.send(reply.to_string()).await);

        loop {
            match turn(&mut session).await {
                SessionEvent::Action(CoordinatorEvent::Failed { action, error }) => {
                    assert_eq!(id, action);
                    assert_eq!(CommandError::Rejected("read only".into()), error);
                    break;
                }
                SessionEvent::Synced(MessageType::ActionError) => {}
                other => panic!("unexpected {other:?}"),
            }
        }
        assert!(!assert_some!(session.read_thread(&"t2".into())).has(ThreadFlag::Starred));
    }

    #[rstest]
    #[tokio::test(start_paused = true)]
    async fn test_undo_sends_nothing(config: Config) {
        let (mut session, mut remote) = connected(&config).await;

        let id = assert_ok!(session.register_action(
            ActionRequest::labels(["t1".into()], vec!["L1".into()], vec![]),
            Some("Labelled"),
        ));
        assert_eq!(Some(id), session.undo_last());
        assert!(!assert_some!(session.read_thread(&"t1".into())).has_label(&"L1".into()));

        assert_err!(timeout(std::time::Duration::from_secs(30), session.turn()).await);
        assert_err!(timeout(std::time::Duration::from_millis(10), remote.next()).await);
    }

    #[rstest]
    #[tokio::test(start_paused = true)]
    async fn test_star_completion_keeps_moved_thread_hidden(config: Config) {
        let (mut session, mut remote) = connected(&config).await;

        let star = assert_ok!(session.register_action(ActionRequest::star(["t1".into()], true), None));
        let moved = assert_ok!(session.register_action(
            ActionRequest::move_to(["t1".into()], Some(Folder::inbox()), Folder::bin()),
            None,
        ));
        assert_eq!(star.to_string(), receive(&mut remote).await["requestId"]);
        assert_eq!(moved.to_string(), receive(&mut remote).await["requestId"]);

        let reply = json!({
            "type": "action-complete",
            "data": {"threadIds": ["t1"]},
            "requestId": star.to_string(),
        });
        assert_ok!(remote.send(reply.to_string()).await);
        loop {
            match turn(&mut session).await {
                SessionEvent::Synced(MessageType::ActionComplete) => break,
                SessionEvent::Action(_) => {}
                other => panic!("unexpected {other:?}"),
            }
        }

        assert!(!session.coordinator().registry().is_awaiting_window(moved));
        assert_eq!(1, session.coordinator().registry().in_flight(ActionKind::Move));
        assert!(session.is_suppressed(&"t1".into()));
        let visible: Vec<_> = session
            .list_view(&Folder::inbox())
            .into_iter()
            .map(|thread| thread.id().clone())
            .collect();
        assert_eq!(vec![ThreadId::from("t2")], visible);
    }

    #[rstest]
    #[tokio::test(start_paused = true)]
    async fn test_disconnect_is_reported(config: Config) {
        let (mut session, remote) = connected(&config).await;
        drop(remote);

        assert_matches!(turn(&mut session).await, SessionEvent::Disconnected);
        assert!(!session.connection_state().is_connected());
        assert_eq!(
            Err(CommandError::ChannelUnavailable),
            session.request_thread("t1".into())
        );
    }
}
