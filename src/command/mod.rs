use std::time::Duration;

use futures::future::LocalBoxFuture;
use thiserror::Error;

use crate::action::{ActionId, ActionRequest};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("command rejected: {0}")]
    Rejected(String),
    #[error("channel unavailable")]
    ChannelUnavailable,
    #[error("no reply within {0:?}")]
    TimedOut(Duration),
}

/// Issues mutations against the mailbox service. A batch succeeds or fails
/// as a whole.
pub trait CommandService {
    /// The returned future must not borrow `self`: it is polled alongside
    /// further registrations.
    fn execute(
        &self,
        action: ActionId,
        request: &ActionRequest,
    ) -> LocalBoxFuture<'static, Result<(), CommandError>>;
}
