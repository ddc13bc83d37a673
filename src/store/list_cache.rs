use derive_getters::Getters;
use jiff::Timestamp;

use crate::thread::Thread;

/// Cached page of one folder's thread list.
#[derive(Debug, Clone, Default, Getters)]
pub struct ThreadListCache {
    threads: Vec<Thread>,
    next_page_token: Option<String>,
    is_loading: bool,
    last_updated: Option<Timestamp>,
}

impl ThreadListCache {
    pub(super) fn loading() -> Self {
        Self {
            is_loading: true,
            ..Self::default()
        }
    }

    pub(super) fn snapshot(threads: Vec<Thread>, next_page_token: Option<String>) -> Self {
        Self {
            threads,
            next_page_token,
            is_loading: false,
            last_updated: Some(Timestamp::now()),
        }
    }

    pub(super) fn set_loading(&mut self) {
        self.is_loading = true;
    }

    pub fn find(&self, thread_id: &str) -> Option<&Thread> {
        self.threads
            .iter()
            .find(|thread| thread.id().as_str() == thread_id)
    }
}
