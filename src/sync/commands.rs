use std::time::Duration;

use futures::{FutureExt as _, future::LocalBoxFuture};
use log::{debug, warn};
use tokio::sync::{oneshot, watch};

use crate::{
    action::{ActionId, ActionRequest},
    command::{CommandError, CommandService},
    sync::{ActionDispatch, Envelope, MessageType, Outbound, OutboundSender},
};

pub const DEFAULT_COMMIT_TIMEOUT: Duration = Duration::from_secs(30);

/// Sends every command as a correlated `action-dispatch` over the sync
/// channel and waits for the matching reply.
#[derive(Debug, Clone)]
pub struct ChannelCommandService {
    outbound: watch::Receiver<Option<OutboundSender>>,
    timeout: Duration,
}

impl ChannelCommandService {
    pub fn new(outbound: watch::Receiver<Option<OutboundSender>>, timeout: Duration) -> Self {
        Self { outbound, timeout }
    }
}

impl CommandService for ChannelCommandService {
    fn execute(
        &self,
        action: ActionId,
        request: &ActionRequest,
    ) -> LocalBoxFuture<'static, Result<(), CommandError>> {
        let dispatch = ActionDispatch::from(request);
        let envelope = Envelope::new(MessageType::ActionDispatch, &dispatch)
            .with_request_id(action.to_string());
        let (reply, reply_rx) = oneshot::channel();
        let sent = self
            .outbound
            .borrow()
            .as_ref()
            .ok_or(CommandError::ChannelUnavailable)
            .and_then(|sender| {
                sender
                    .send(Outbound {
                        envelope,
                        reply: Some(reply),
                    })
                    .map_err(|_| CommandError::ChannelUnavailable)
            });
        if let Err(error) = sent {
            warn!("cannot dispatch {action}: {error}");
            return futures::future::ready(Err(error)).boxed_local();
        }
        debug!("dispatched {action} as {:?}", dispatch.action);

        let timeout = self.timeout;
        async move {
            match tokio::time::timeout(timeout, reply_rx).await {
                Ok(Ok(result)) => result,
                Ok(Err(_)) => Err(CommandError::ChannelUnavailable),
                Err(_) => Err(CommandError::TimedOut(timeout)),
            }
        }
        .boxed_local()
    }
}

#[cfg(test)]
mod tests {
    use assertables::*;
    use futures::{SinkExt, StreamExt};
    use rstest::*;
    use serde_json::Value;
    use tokio::io::duplex;
    use tokio_util::codec::{Framed, LinesCodec};

    use super::*;
    use crate::sync::SyncClient;

    #[rstest]
    #[tokio::test]
    async fn test_unavailable_without_connection() {
        let client = SyncClient::new(1024);
        let service = client.command_service(DEFAULT_COMMIT_TIMEOUT);

        let result = service
            .execute(ActionId::next(), &ActionRequest::star(["t1".into()], true))
            .await;
        assert_eq!(Err(CommandError::ChannelUnavailable), result);
    }

    #[rstest]
    #[tokio::test]
    async fn test_completes_on_correlated_reply() {
        let (local, remote) = duplex(4096);
        let mut remote = Framed::new(remote, LinesCodec::new());
        let mut client = SyncClient::new(1024);
        let service = client.command_service(DEFAULT_COMMIT_TIMEOUT);
        client.attach(local, "conn-1".into());

        let action = ActionId::next();
        let pending = service.execute(action, &ActionRequest::read(["t1".into()], true));

        let _join = assert_ok!(assert_some!(remote.next().await));
        let line = assert_ok!(assert_some!(remote.next().await));
        let dispatch: Value = assert_ok!(serde_json::from_str(&line));
        assert_eq!("MARK_READ", dispatch["data"]["action"]);
        assert_eq!(action.to_string(), dispatch["requestId"]);

        let reply = format!(
            r#"{{"type":"action-complete","data":{{"threadIds":["t1"]}},"requestId":"{action}"}}"#
        );
        assert_ok!(remote.send(reply).await);
        assert_eq!(Ok(()), pending.await);
    }

    #[rstest]
    #[tokio::test(start_paused = true)]
    async fn test_times_out_without_reply() {
        let (local, _remote) = duplex(4096);
        let mut client = SyncClient::new(1024);
        let service = client.command_service(Duration::from_secs(3));
        client.attach(local, "conn-1".into());

        let result = service
            .execute(ActionId::next(), &ActionRequest::important(["t1".into()], true))
            .await;
        assert_eq!(Err(CommandError::TimedOut(Duration::from_secs(3))), result);
    }
}
