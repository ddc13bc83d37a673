use std::fmt::Display;

use derive_builder::Builder;
use derive_getters::Getters;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Value, json};
use thiserror::Error;

use crate::{
    action::{ActionParams, ActionRequest},
    thread::{ConnectionId, Folder, LabelId, Thread, ThreadId},
};

pub const DEFAULT_PAGE_SIZE: u32 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MessageType {
    Join,
    ListRequest,
    ListSnapshot,
    ThreadRequest,
    ThreadSnapshot,
    ActionDispatch,
    ActionComplete,
    ActionError,
}

impl Display for MessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            MessageType::Join => "join",
            MessageType::ListRequest => "list-request",
            MessageType::ListSnapshot => "list-snapshot",
            MessageType::ThreadRequest => "thread-request",
            MessageType::ThreadSnapshot => "thread-snapshot",
            MessageType::ActionDispatch => "action-dispatch",
            MessageType::ActionComplete => "action-complete",
            MessageType::ActionError => "action-error",
        };
        write!(f, "{name}")
    }
}

#[derive(Error, Debug)]
pub enum MalformedMessage {
    #[error("line is not a valid envelope: {0}")]
    Envelope(#[from] serde_json::Error),
    #[error("{kind} payload does not match: {source}")]
    Payload {
        kind: MessageType,
        source: serde_json::Error,
    },
    #[error("{0} is not sent by the server")]
    Unexpected(MessageType),
    #[error("line exceeds {0} bytes")]
    TooLong(usize),
    #[error("line is not valid utf-8")]
    Encoding,
    #[error("snapshot for {requested} carries thread {found}")]
    ThreadMismatch { requested: ThreadId, found: ThreadId },
}

/// One line on the wire: `{"type": ..., "data": ..., "requestId": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    #[serde(rename = "type")]
    pub kind: MessageType,
    #[serde(default)]
    pub data: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl Envelope {
    pub fn new(kind: MessageType, payload: &impl Serialize) -> Self {
        Self {
            kind,
            data: serde_json::to_value(payload).expect("outbound payloads should serialize"),
            request_id: None,
        }
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    pub fn join(connection_id: &ConnectionId) -> Self {
        Self::new(
            MessageType::Join,
            &Join {
                connection_id: connection_id.clone(),
            },
        )
    }

    fn payload<T: DeserializeOwned>(self) -> Result<T, MalformedMessage> {
        let kind = self.kind;
        serde_json::from_value(self.data).map_err(|source| MalformedMessage::Payload { kind, source })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Join {
    pub connection_id: ConnectionId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters, Builder)]
#[serde(rename_all = "camelCase")]
#[builder(setter(into))]
pub struct ListRequest {
    folder: Folder,
    #[builder(default, setter(strip_option, into))]
    #[serde(skip_serializing_if = "Option::is_none")]
    query: Option<String>,
    #[builder(default = "DEFAULT_PAGE_SIZE")]
    max_results: u32,
    #[builder(default)]
    label_ids: Vec<LabelId>,
    #[builder(default, setter(strip_option, into))]
    #[serde(skip_serializing_if = "Option::is_none")]
    page_token: Option<String>,
}

impl ListRequest {
    /// First page of `folder` with the default page size.
    pub fn first_page(folder: Folder) -> Self {
        Self {
            folder,
            query: None,
            max_results: DEFAULT_PAGE_SIZE,
            label_ids: Vec::new(),
            page_token: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListSnapshot {
    pub folder: Folder,
    #[serde(default)]
    pub threads: Vec<Thread>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadRequest {
    pub thread_id: ThreadId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadSnapshot {
    pub thread_id: ThreadId,
    pub thread: Thread,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DispatchAction {
    MarkRead,
    MarkUnread,
    ToggleStar,
    ToggleImportant,
    ModifyLabels,
    BulkDelete,
    BulkArchive,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionDispatch {
    pub action: DispatchAction,
    pub thread_ids: Vec<ThreadId>,
    #[serde(default)]
    pub params: Value,
}

impl From<&ActionRequest> for ActionDispatch {
    fn from(request: &ActionRequest) -> Self {
        let (action, params) = match request.params() {
            ActionParams::Move { destination, .. } if destination.is_bin() => {
                (DispatchAction::BulkDelete, json!({}))
            }
            ActionParams::Move { destination, .. } if destination.is_archive() => {
                (DispatchAction::BulkArchive, json!({}))
            }
            ActionParams::Move {
                source,
                destination,
            } => (
                DispatchAction::ModifyLabels,
                json!({
                    "addLabels": [destination.as_label()],
                    "removeLabels": source.iter().map(Folder::as_label).collect::<Vec<_>>(),
                }),
            ),
            ActionParams::Star(starred) => (DispatchAction::ToggleStar, json!({ "starred": starred })),
            ActionParams::Read(true) => (DispatchAction::MarkRead, json!({})),
            ActionParams::Read(false) => (DispatchAction::MarkUnread, json!({})),
            ActionParams::Important(important) => (
                DispatchAction::ToggleImportant,
                json!({ "important": important }),
            ),
            ActionParams::Label { added, removed } => (
                DispatchAction::ModifyLabels,
                json!({ "addLabels": added, "removeLabels": removed }),
            ),
        };
        Self {
            action,
            thread_ids: request.thread_ids().to_vec(),
            params,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionComplete {
    #[serde(default)]
    pub thread_ids: Vec<ThreadId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionError {
    #[serde(default)]
    pub thread_ids: Vec<ThreadId>,
    #[serde(default)]
    pub message: String,
}

/// Typed view of a server-sent envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    ListSnapshot(ListSnapshot),
    ThreadSnapshot(ThreadSnapshot),
    ActionComplete {
        request_id: Option<String>,
        payload: ActionComplete,
    },
    ActionError {
        request_id: Option<String>,
        payload: ActionError,
    },
}

impl TryFrom<Envelope> for Inbound {
    type Error = MalformedMessage;

    fn try_from(envelope: Envelope) -> Result<Self, Self::Error> {
        match envelope.kind {
            MessageType::ListSnapshot => envelope.payload().map(Inbound::ListSnapshot),
            MessageType::ThreadSnapshot => {
                let snapshot: ThreadSnapshot = envelope.payload()?;
                if snapshot.thread_id != *snapshot.thread.id() {
                    return Err(MalformedMessage::ThreadMismatch {
                        requested: snapshot.thread_id,
                        found: snapshot.thread.id().clone(),
                    });
                }
                Ok(Inbound::ThreadSnapshot(snapshot))
            }
            MessageType::ActionComplete => {
                let request_id = envelope.request_id.clone();
                envelope
                    .payload()
                    .map(|payload| Inbound::ActionComplete { request_id, payload })
            }
            MessageType::ActionError => {
                let request_id = envelope.request_id.clone();
                envelope
                    .payload()
                    .map(|payload| Inbound::ActionError { request_id, payload })
            }
            kind => Err(MalformedMessage::Unexpected(kind)),
        }
    }
}
