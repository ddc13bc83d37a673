use std::fmt::Display;

use jiff::Timestamp;

use crate::thread::ConnectionId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionStatus {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

impl Display for ConnectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionStatus::Disconnected => write!(f, "disconnected"),
            ConnectionStatus::Connecting => write!(f, "connecting"),
            ConnectionStatus::Connected => write!(f, "connected"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncConnectionState {
    status: ConnectionStatus,
    connection_id: Option<ConnectionId>,
    last_sync: Option<Timestamp>,
}

impl SyncConnectionState {
    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    pub fn connection_id(&self) -> Option<&ConnectionId> {
        self.connection_id.as_ref()
    }

    /// When the last snapshot arrived on this connection.
    pub fn last_sync(&self) -> Option<Timestamp> {
        self.last_sync
    }

    pub fn is_connected(&self) -> bool {
        self.status == ConnectionStatus::Connected
    }

    pub(crate) fn connecting(&mut self, connection_id: ConnectionId) {
        self.status = ConnectionStatus::Connecting;
        self.connection_id = Some(connection_id);
        self.last_sync = None;
    }

    pub(crate) fn connected(&mut self) {
        self.status = ConnectionStatus::Connected;
    }

    pub(crate) fn disconnected(&mut self) {
        self.status = ConnectionStatus::Disconnected;
    }

    pub(crate) fn synced(&mut self) {
        self.last_sync = Some(Timestamp::now());
    }
}

impl Display for SyncConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.status)?;
        if let Some(connection_id) = &self.connection_id {
            write!(f, " ({connection_id})")?;
        }
        if let Some(last_sync) = self.last_sync {
            write!(f, ", last sync {last_sync}")?;
        }
        Ok(())
    }
}
