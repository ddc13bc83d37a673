mod client;
mod codec;
mod commands;
mod connection;
mod message;
mod state;

pub use client::{InboundSink, SyncClient, SyncError};
pub use codec::{DEFAULT_MAX_LINE_LENGTH, EnvelopeCodec};
pub use commands::{ChannelCommandService, DEFAULT_COMMIT_TIMEOUT};
pub use connection::{ChannelEvent, Connection, Outbound, OutboundSender, Reply};
pub use message::{
    ActionComplete, ActionDispatch, ActionError, DEFAULT_PAGE_SIZE, DispatchAction, Envelope,
    Inbound, Join, ListRequest, ListRequestBuilder, ListSnapshot, MalformedMessage, MessageType,
    ThreadRequest, ThreadSnapshot,
};
pub use state::{ConnectionStatus, SyncConnectionState};
