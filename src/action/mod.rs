mod coordinator;
mod id;
mod notifier;
mod pending;
mod request;
mod window;

pub use coordinator::{
    Coordinator, CoordinatorError, CoordinatorEvent, DEFAULT_UNDO_WINDOW, Refresh,
};
pub use id::ActionId;
pub use notifier::{LogNotifier, Notifier};
pub use pending::{ActionRegistry, PendingAction, Phase};
pub use request::{ActionKind, ActionParams, ActionRequest};
pub use window::UndoWindows;
