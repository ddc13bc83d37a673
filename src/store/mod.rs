mod diff;
mod list_cache;
#[expect(clippy::module_inception)]
mod store;

pub use diff::OptimisticDiff;
pub use diff::OptimisticId;
pub use list_cache::ThreadListCache;
pub use store::OptimisticStore;
pub use store::StoreChange;
