use std::{collections::HashMap, time::Duration};

use futures::StreamExt as _;
use log::trace;
use tokio_util::time::{DelayQueue, delay_queue::Key};

use crate::action::ActionId;

/// Decision windows with expiry and explicit cancel, independent of how
/// they are presented to the user.
#[derive(Debug, Default)]
pub struct UndoWindows {
    queue: DelayQueue<ActionId>,
    keys: HashMap<ActionId, Key>,
}

impl UndoWindows {
    pub fn open(&mut self, action: ActionId, duration: Duration) {
        trace!("opening {duration:?} undo window for {action}");
        let key = self.queue.insert(action, duration);
        if let Some(previous) = self.keys.insert(action, key) {
            self.queue.remove(&previous);
        }
    }

    /// Returns `false` if the window already expired or was never opened.
    pub fn cancel(&mut self, action: ActionId) -> bool {
        if let Some(key) = self.keys.remove(&action) {
            trace!("cancelling undo window for {action}");
            self.queue.remove(&key);
            true
        } else {
            false
        }
    }

    pub fn is_open(&self, action: ActionId) -> bool {
        self.keys.contains_key(&action)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Resolves with the next action whose window elapsed, or `None` right
    /// away when no window is open. Cancel safe.
    pub async fn next_expired(&mut self) -> Option<ActionId> {
        let expired = self.queue.next().await?;
        let action = expired.into_inner();
        self.keys.remove(&action);
        trace!("undo window for {action} elapsed");
        Some(action)
    }
}
