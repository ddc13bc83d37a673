use std::time::Duration;

use log::{error, info};

use crate::{
    action::{ActionId, PendingAction},
    command::CommandError,
};

/// Presentation side of the action lifecycle: the undo toast and the
/// failure notice.
pub trait Notifier {
    fn undo_offered(&mut self, action: ActionId, message: &str, window: Duration);

    /// The undo offer is gone, either because it was used, dismissed or
    /// because the window elapsed.
    fn undo_withdrawn(&mut self, action: ActionId);

    fn action_failed(&mut self, action: &PendingAction, error: &CommandError);
}

/// Reports through the log. Used when nothing renders notifications.
#[derive(Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn undo_offered(&mut self, action: ActionId, message: &str, window: Duration) {
        info!("{message} (undo {action} within {}s)", window.as_secs());
    }

    fn undo_withdrawn(&mut self, _action: ActionId) {}

    fn action_failed(&mut self, action: &PendingAction, error: &CommandError) {
        error!(
            "{} on {} thread(s) failed and was reverted: {error}",
            action.kind(),
            action.request().thread_ids().len()
        );
    }
}
