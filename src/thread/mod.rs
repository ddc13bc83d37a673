mod flag;
mod id;
#[expect(clippy::module_inception)]
mod thread;

pub use flag::ThreadFlag;
pub use id::ConnectionId;
pub use id::Folder;
pub use id::LabelId;
pub use id::ThreadId;
pub use thread::Thread;
pub use thread::ThreadBuilder;
