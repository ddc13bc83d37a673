use std::collections::HashMap;

use futures::{SinkExt as _, StreamExt as _};
use log::{debug, trace, warn};
use tokio::{
    io::{AsyncRead, AsyncWrite},
    sync::{mpsc, oneshot},
    task::JoinHandle,
};
use tokio_util::codec::Framed;

use crate::{
    command::CommandError,
    sync::{ActionError, Envelope, EnvelopeCodec, MalformedMessage, MessageType},
};

pub type Reply = oneshot::Sender<Result<(), CommandError>>;
pub type OutboundSender = mpsc::UnboundedSender<Outbound>;

/// Message handed to the io task. With a `reply` the task resolves it once
/// the server answers the envelope's request id.
#[derive(Debug)]
pub struct Outbound {
    pub envelope: Envelope,
    pub reply: Option<Reply>,
}

impl Outbound {
    pub fn fire_and_forget(envelope: Envelope) -> Self {
        Self {
            envelope,
            reply: None,
        }
    }
}

#[derive(Debug)]
pub enum ChannelEvent {
    Message(Envelope),
    Malformed(MalformedMessage),
    Closed,
}

/// Handle to the io task owning one duplex transport.
#[derive(Debug)]
pub struct Connection {
    outbound_tx: OutboundSender,
    inbound_rx: mpsc::UnboundedReceiver<ChannelEvent>,
    task: JoinHandle<()>,
}

impl Connection {
    pub fn start<T>(transport: T, max_line_length: usize) -> Self
    where
        T: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let mut stream = Framed::new(transport, EnvelopeCodec::new(max_line_length));
        let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Outbound>();
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();

        let task = tokio::spawn(async move {
            let mut pending: HashMap<String, Reply> = HashMap::new();
            loop {
                tokio::select! {
                    outbound = outbound_rx.recv() => {
                        let Some(Outbound { envelope, reply }) = outbound else {
                            debug!("all senders dropped, closing channel");
                            break;
                        };
                        pending.retain(|_, reply| !reply.is_closed());
                        trace!("sending {}", envelope.kind);
                        if let (Some(request_id), Some(reply)) = (envelope.request_id.clone(), reply) {
                            pending.insert(request_id, reply);
                        }
                        if let Err(error) = stream.send(envelope).await {
                            warn!("writing to channel failed: {error}");
                            break;
                        }
                    }
                    inbound = stream.next() => match inbound {
                        Some(Ok(Ok(envelope))) => {
                            trace!("received {}", envelope.kind);
                            resolve(&mut pending, &envelope);
                            if inbound_tx.send(ChannelEvent::Message(envelope)).is_err() {
                                break;
                            }
                        }
                        Some(Ok(Err(malformed))) => {
                            warn!("discarding malformed message: {malformed}");
                            let _ = inbound_tx.send(ChannelEvent::Malformed(malformed));
                        }
                        Some(Err(error)) => {
                            warn!("reading from channel failed: {error}");
                            break;
                        }
                        None => {
                            debug!("channel closed by server");
                            break;
                        }
                    },
                }
            }
            for (_, reply) in pending.drain() {
                let _ = reply.send(Err(CommandError::ChannelUnavailable));
            }
            let _ = inbound_tx.send(ChannelEvent::Closed);
        });

        Self {
            outbound_tx,
            inbound_rx,
            task,
        }
    }

    pub fn sender(&self) -> OutboundSender {
        self.outbound_tx.clone()
    }

    pub fn send(&self, outbound: Outbound) -> Result<(), CommandError> {
        self.outbound_tx
            .send(outbound)
            .map_err(|_| CommandError::ChannelUnavailable)
    }

    /// `None` once the io task is gone and every event was drained.
    pub async fn next_event(&mut self) -> Option<ChannelEvent> {
        self.inbound_rx.recv().await
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.task.abort();
    }
}

fn resolve(pending: &mut HashMap<String, Reply>, envelope: &Envelope) {
    let Some(request_id) = envelope.request_id.as_deref() else {
        return;
    };
    let result = match envelope.kind {
        MessageType::ActionComplete => Ok(()),
        MessageType::ActionError => {
            let message = serde_json::from_value::<ActionError>(envelope.data.clone())
                .map(|error| error.message)
                .unwrap_or_default();
            Err(CommandError::Rejected(message))
        }
        _ => return,
    };
    match pending.remove(request_id) {
        Some(reply) => {
            let _ = reply.send(result);
        }
        None => trace!("no one waits for {request_id} anymore"),
    }
}
