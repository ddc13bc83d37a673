use std::collections::BTreeSet;

use derive_builder::Builder;
use derive_getters::Getters;
use enumflags2::BitFlags;
use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use crate::thread::{Folder, LabelId, ThreadFlag, ThreadId};

/// Summary of a conversation thread as delivered by list and thread snapshots.
///
/// The same shape doubles as the merged view handed out by the store, where
/// active optimistic diffs have already been applied on top of the snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters, Builder)]
#[serde(rename_all = "camelCase")]
#[builder(setter(into))]
pub struct Thread {
    id: ThreadId,
    folder: Folder,
    #[serde(default)]
    #[builder(default)]
    subject: String,
    #[serde(default)]
    #[builder(default)]
    snippet: String,
    #[serde(
        default,
        serialize_with = "ThreadFlag::serialize_set",
        deserialize_with = "ThreadFlag::deserialize_set"
    )]
    #[builder(default)]
    flags: BitFlags<ThreadFlag>,
    #[serde(default)]
    #[builder(default)]
    labels: BTreeSet<LabelId>,
    #[serde(default)]
    #[builder(default)]
    message_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(strip_option))]
    latest_at: Option<Timestamp>,
}

impl Thread {
    pub fn has(&self, flag: ThreadFlag) -> bool {
        self.flags.contains(flag)
    }

    pub fn has_label(&self, label: &LabelId) -> bool {
        self.labels.contains(label)
    }

    pub(crate) fn set_flag(&mut self, flag: ThreadFlag, value: bool) {
        self.flags.set(flag, value);
    }

    pub(crate) fn add_label(&mut self, label: LabelId) {
        self.labels.insert(label);
    }

    pub(crate) fn remove_label(&mut self, label: &LabelId) {
        self.labels.remove(label);
    }

    pub(crate) fn set_folder(&mut self, folder: Folder) {
        self.folder = folder;
    }
}

#[cfg(test)]
mod tests {
    use assertables::*;
    use rstest::*;

    use super::*;

    #[rstest]
    fn test_thread_deserializes_from_snapshot_payload() {
        let json = r#"{
            "id": "t1",
            "folder": "inbox",
            "subject": "Quarterly numbers",
            "flags": ["starred", "snoozed"],
            "labels": ["L1"],
            "messageCount": 3,
            "latestAt": "2025-01-02T03:04:05Z"
        }"#;
        let thread: Thread = assert_ok!(serde_json::from_str(json));

        assert_eq!(&ThreadId::from("t1"), thread.id());
        assert!(thread.has(ThreadFlag::Starred));
        assert!(!thread.has(ThreadFlag::Read));
        assert!(thread.has_label(&LabelId::from("L1")));
        assert_eq!(3, thread.message_count());
        assert_some!(thread.latest_at());
    }

    #[rstest]
    fn test_thread_serializes_flags_as_names() {
        let mut thread = assert_ok!(
            ThreadBuilder::default()
                .id("t1")
                .folder(Folder::inbox())
                .build()
        );
        thread.set_flag(ThreadFlag::Read, true);

        let value = assert_ok!(serde_json::to_value(&thread));
        assert_eq!(serde_json::json!(["read"]), value["flags"]);
        assert_none!(value.get("latestAt"));
    }

    #[rstest]
    fn test_builder_requires_folder() {
        assert_err!(ThreadBuilder::default().id("t1").build());
    }
}
