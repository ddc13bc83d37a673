//! Optimistic actions and live sync for a webmail client.
//!
//! User actions change the local view at once through [`store`], hide moved
//! threads through [`suppression`] and reach the server through the
//! [`action::Coordinator`] once their undo window passed. The [`sync`]
//! channel keeps the authoritative snapshots current.

pub mod action;
pub mod command;
pub mod config;
pub mod session;
pub mod store;
pub mod suppression;
pub mod sync;
pub mod thread;

pub use session::{Session, SessionEvent};
