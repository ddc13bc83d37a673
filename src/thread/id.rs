use std::{borrow::Borrow, fmt::Display};

use serde::{Deserialize, Serialize};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        #[repr(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                self.0.fmt(f)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }
    };
}

string_id!(
    /// Identifier of a conversation thread as assigned by the mailbox service.
    ThreadId
);
string_id!(LabelId);
string_id!(
    /// Identifier of one connected mailbox. Each one gets its own channel room.
    ConnectionId
);
string_id!(
    /// Name of a folder view such as `inbox` or `bin`.
    Folder
);

impl Folder {
    pub const INBOX: &'static str = "inbox";
    pub const ARCHIVE: &'static str = "archive";
    pub const BIN: &'static str = "bin";
    pub const SPAM: &'static str = "spam";

    pub fn inbox() -> Self {
        Self::from(Self::INBOX)
    }

    pub fn archive() -> Self {
        Self::from(Self::ARCHIVE)
    }

    pub fn bin() -> Self {
        Self::from(Self::BIN)
    }

    pub fn is_bin(&self) -> bool {
        self.0 == Self::BIN
    }

    pub fn is_archive(&self) -> bool {
        self.0 == Self::ARCHIVE
    }

    /// Label that represents membership in this folder on the mailbox service.
    pub fn as_label(&self) -> LabelId {
        LabelId::new(self.0.to_uppercase())
    }
}
