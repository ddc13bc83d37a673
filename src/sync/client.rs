use std::{io, time::Duration};

use log::{debug, info, trace, warn};
use thiserror::Error;
use tokio::{
    io::{AsyncRead, AsyncWrite},
    net::TcpStream,
    sync::watch,
};
use tokio_native_tls::{TlsConnector, native_tls};

use crate::{
    command::CommandError,
    config::ChannelConfig,
    sync::{
        ChannelCommandService, ChannelEvent, Connection, ConnectionStatus, Envelope, Inbound,
        ListRequest, MalformedMessage, MessageType, Outbound, OutboundSender, SyncConnectionState,
        ThreadRequest,
    },
    thread::{ConnectionId, Folder, Thread, ThreadId},
};

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("connecting to {host}:{port} failed")]
    Connect {
        host: String,
        port: u16,
        source: io::Error,
    },
    #[error("tls handshake with {host} failed")]
    Tls {
        host: String,
        source: native_tls::Error,
    },
}

/// Receiver of routed inbound messages.
pub trait InboundSink {
    fn list_snapshot(&mut self, folder: Folder, threads: Vec<Thread>, next_page_token: Option<String>);

    fn thread_snapshot(&mut self, thread: Thread);

    /// `request_id` is set when the completion answers one dispatch.
    fn action_complete(&mut self, request_id: Option<&str>, thread_ids: &[ThreadId]);
}

/// Owns the one channel of the active mailbox connection.
#[derive(Debug)]
pub struct SyncClient {
    max_line_length: usize,
    state: SyncConnectionState,
    connection: Option<Connection>,
    outbound: watch::Sender<Option<OutboundSender>>,
    joined: watch::Sender<Option<ConnectionId>>,
}

impl SyncClient {
    pub fn new(max_line_length: usize) -> Self {
        let (outbound, _) = watch::channel(None);
        let (joined, _) = watch::channel(None);
        Self {
            max_line_length,
            state: SyncConnectionState::default(),
            connection: None,
            outbound,
            joined,
        }
    }

    pub fn state(&self) -> &SyncConnectionState {
        &self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state.is_connected()
    }

    /// Follows the connection whose room the active channel joined.
    pub fn joined(&self) -> watch::Receiver<Option<ConnectionId>> {
        self.joined.subscribe()
    }

    /// Command service sending over whichever connection is active when a
    /// command is executed.
    pub fn command_service(&self, timeout: Duration) -> ChannelCommandService {
        ChannelCommandService::new(self.outbound.subscribe(), timeout)
    }

    /// Tears down the current channel and joins `connection_id` on a fresh
    /// one.
    pub async fn connect(
        &mut self,
        config: &ChannelConfig,
        connection_id: ConnectionId,
    ) -> Result<(), SyncError> {
        self.teardown();
        self.state.connecting(connection_id.clone());
        let host = config.host();
        let port = config.port();
        info!("connecting to {host}:{port} for {connection_id}");

        let stream = match TcpStream::connect((host.as_str(), port)).await {
            Ok(stream) => stream,
            Err(source) => {
                self.state.disconnected();
                return Err(SyncError::Connect {
                    host: host.clone(),
                    port,
                    source,
                });
            }
        };
        if !config.tls() {
            self.attach(stream, connection_id);
            return Ok(());
        }

        let tls = native_tls::TlsConnector::new()
            .map(TlsConnector::from)
            .map_err(|source| SyncError::Tls {
                host: host.clone(),
                source,
            });
        let stream = match tls {
            Ok(tls) => tls.connect(host, stream).await.map_err(|source| SyncError::Tls {
                host: host.clone(),
                source,
            }),
            Err(error) => Err(error),
        };
        match stream {
            Ok(stream) => {
                self.attach(stream, connection_id);
                Ok(())
            }
            Err(error) => {
                self.state.disconnected();
                Err(error)
            }
        }
    }

    /// Takes over an already established transport.
    pub fn attach<T>(&mut self, transport: T, connection_id: ConnectionId)
    where
        T: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        if self.connection.is_some() {
            self.teardown();
        }
        let connection = Connection::start(transport, self.max_line_length);
        let join = Outbound::fire_and_forget(Envelope::join(&connection_id));
        if connection.send(join).is_err() {
            warn!("channel for {connection_id} closed before joining");
        }
        self.outbound.send_replace(Some(connection.sender()));
        self.connection = Some(connection);
        self.state.connecting(connection_id.clone());
        self.state.connected();
        self.joined.send_replace(Some(connection_id.clone()));
        info!("joined {connection_id}");
    }

    pub fn teardown(&mut self) {
        self.outbound.send_replace(None);
        self.joined.send_replace(None);
        if self.connection.take().is_some() {
            debug!("tearing down channel");
        }
        self.state.disconnected();
    }

    pub async fn switch_connection(
        &mut self,
        config: &ChannelConfig,
        connection_id: ConnectionId,
    ) -> Result<(), SyncError> {
        if self.state.connection_id() == Some(&connection_id) && self.is_connected() {
            return Ok(());
        }
        self.connect(config, connection_id).await
    }

    /// Fire-and-forget. Dropped with a warning unless connected.
    pub fn send(&self, envelope: Envelope) -> Result<(), CommandError> {
        let connection = self
            .connection
            .as_ref()
            .filter(|_| self.is_connected());
        let Some(connection) = connection else {
            warn!("dropping {} while {}", envelope.kind, self.state.status());
            return Err(CommandError::ChannelUnavailable);
        };
        connection.send(Outbound::fire_and_forget(envelope))
    }

    pub fn request_list(&self, request: &ListRequest) -> Result<(), CommandError> {
        self.send(Envelope::new(MessageType::ListRequest, request))
    }

    pub fn request_thread(&self, thread_id: ThreadId) -> Result<(), CommandError> {
        self.send(Envelope::new(
            MessageType::ThreadRequest,
            &ThreadRequest { thread_id },
        ))
    }

    /// Next event of the active channel. Never resolves without one. A
    /// `Closed` event leaves the client disconnected.
    pub async fn next_event(&mut self) -> ChannelEvent {
        let Some(connection) = self.connection.as_mut() else {
            return std::future::pending().await;
        };
        let event = connection.next_event().await.unwrap_or(ChannelEvent::Closed);
        if matches!(event, ChannelEvent::Closed) {
            info!("channel closed");
            self.teardown();
        }
        event
    }

    /// Routes one inbound envelope into `sink`.
    pub fn handle(
        &mut self,
        envelope: Envelope,
        sink: &mut impl InboundSink,
    ) -> Result<MessageType, MalformedMessage> {
        let kind = envelope.kind;
        match Inbound::try_from(envelope)? {
            Inbound::ListSnapshot(snapshot) => {
                debug!(
                    "{} threads for {}",
                    snapshot.threads.len(),
                    snapshot.folder
                );
                self.state.synced();
                sink.list_snapshot(snapshot.folder, snapshot.threads, snapshot.next_page_token);
            }
            Inbound::ThreadSnapshot(snapshot) => {
                trace!("detail for {}", snapshot.thread_id);
                self.state.synced();
                sink.thread_snapshot(snapshot.thread);
            }
            Inbound::ActionComplete {
                request_id,
                payload,
            } => sink.action_complete(request_id.as_deref(), &payload.thread_ids),
            Inbound::ActionError {
                request_id,
                payload,
            } => {
                if request_id.is_none() {
                    warn!(
                        "uncorrelated failure for {} thread(s): {}",
                        payload.thread_ids.len(),
                        payload.message
                    );
                }
            }
        }
        Ok(kind)
    }

    pub fn status(&self) -> ConnectionStatus {
        self.state.status()
    }
}
