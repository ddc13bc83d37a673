use std::{
    fmt::Display,
    num::ParseIntError,
    str::FromStr,
    sync::atomic::{AtomicU64, Ordering},
};

static LAST_ACTION_ID: AtomicU64 = AtomicU64::new(0);

/// Process-unique handle of a registered action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct ActionId(u64);

impl ActionId {
    pub(crate) fn next() -> Self {
        Self(LAST_ACTION_ID.fetch_add(1, Ordering::Relaxed) + 1)
    }
}

impl Display for ActionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "action-{}", self.0)
    }
}

impl FromStr for ActionId {
    type Err = ParseIntError;

    /// Accepts both the display form `action-7` and the bare number.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.strip_prefix("action-").unwrap_or(s).parse().map(Self)
    }
}
