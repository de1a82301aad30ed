//! Persistence of memo records and settings.
//!
//! Records are keyed by memo id. `put` always replaces the whole record; any
//! merging has to happen before the call. Audio payloads are converted to a
//! storage-safe form on write and restored on read (see [`codec`]).

mod codec;
mod file;
mod memory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use voxmemo_bridge::{ErrorKind, Failure, VoiceMemo};

pub use crate::store::file::FileStore;
pub use crate::store::memory::InMemoryStore;

/// Errors that can occur while reading or writing the store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The storage location could not be opened, read or written.
    #[error("failed to access memo storage: {0}")]
    Io(#[from] std::io::Error),
    /// A stored record is not valid JSON or does not match the record layout.
    #[error("failed to decode stored record: {0}")]
    Corrupt(#[from] serde_json::Error),
    /// The audio payload of a record could not be restored.
    #[error("audio of memo {id} could not be restored: {reason}")]
    Serialization { id: String, reason: String },
    /// The id cannot be used as a storage key.
    #[error("invalid memo id {0:?}")]
    InvalidId(String),
}

impl StoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::Io(_) | StoreError::Corrupt(_) => ErrorKind::Storage,
            StoreError::Serialization { .. } => ErrorKind::Serialization,
            StoreError::InvalidId(_) => ErrorKind::InputValidation,
        }
    }
}

impl From<StoreError> for Failure {
    fn from(error: StoreError) -> Self {
        Failure::new(error.kind(), error.to_string())
    }
}

/// Key-value store of memo records.
#[async_trait]
pub trait MemoStore: Send + Sync {
    /// Inserts or fully replaces a record, returning its id.
    async fn put(&self, memo: &VoiceMemo) -> Result<String, StoreError>;

    /// Fetches a record; a missing id is `Ok(None)`.
    async fn get(&self, id: &str) -> Result<Option<VoiceMemo>, StoreError>;

    /// Every record, newest first.
    async fn get_all(&self) -> Result<Vec<VoiceMemo>, StoreError>;

    /// Removes a record; removing a missing id succeeds.
    async fn delete(&self, id: &str) -> Result<(), StoreError>;

    /// Removes every record.
    async fn clear(&self) -> Result<(), StoreError>;
}

/// Persistent user settings, stored next to the records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Whether a recording was in progress when last written.
    pub is_recording: bool,
    /// Language picked for translations, if the user ever chose one.
    pub preferred_target_language: Option<String>,
}

/// Store for [`Settings`].
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Reads the settings, returning defaults when none were saved yet.
    async fn load_settings(&self) -> Result<Settings, StoreError>;

    async fn save_settings(&self, settings: &Settings) -> Result<(), StoreError>;
}

/// Everything the router needs from persistence.
pub trait Store: MemoStore + SettingsStore {}

impl<T: MemoStore + SettingsStore> Store for T {}

/// Ids double as file names, so only a conservative alphabet is accepted.
pub(crate) fn validate_id(id: &str) -> Result<(), StoreError> {
    let valid = !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidId(id.to_string()))
    }
}

/// Orders records newest first. Ties keep id order, so the result does not
/// depend on the order records were read in.
pub(crate) fn sort_newest_first(memos: &mut [VoiceMemo]) {
    memos.sort_by(|a, b| a.id.cmp(&b.id));
    memos.sort_by(|a, b| b.date.cmp(&a.date));
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;
    use voxmemo_bridge::{AudioPayload, Translation};

    async fn both_stores(dir: &std::path::Path) -> Vec<Box<dyn MemoStore>> {
        vec![
            Box::new(InMemoryStore::new()),
            Box::new(FileStore::open(dir).await.unwrap()),
        ]
    }

    #[tokio::test]
    async fn put_replaces_the_whole_record() {
        let temp = tempdir().expect("tempdir");
        for store in both_stores(temp.path()).await {
            let full = VoiceMemo {
                id: "memo_1".into(),
                name: "First".into(),
                date: Utc::now(),
                duration: 5,
                transcription: Some("hello".into()),
                translation: Some(Translation {
                    language: "Spanish".into(),
                    text: "hola".into(),
                }),
                summary: Some("a greeting".into()),
                audio: Some(AudioPayload::new(vec![1, 2, 3], "audio/wav")),
                revision: 2,
            };
            store.put(&full).await.unwrap();

            let bare = VoiceMemo {
                name: "Second".into(),
                translation: None,
                summary: None,
                audio: None,
                revision: 3,
                ..full
            };
            store.put(&bare).await.unwrap();
            assert_eq!(store.get("memo_1").await.unwrap(), Some(bare));
        }
    }

    #[tokio::test]
    async fn invalid_ids_are_rejected_by_every_store() {
        let temp = tempdir().expect("tempdir");
        for store in both_stores(temp.path()).await {
            assert!(matches!(
                store.get("../memo").await,
                Err(StoreError::InvalidId(_))
            ));
            assert!(matches!(
                store.delete("memo 1").await,
                Err(StoreError::InvalidId(_))
            ));
        }
    }

    #[test]
    fn rejects_ids_unusable_as_file_names() {
        assert!(validate_id("memo_1700000000000").is_ok());
        assert!(validate_id("a-b_C9").is_ok());
        for id in ["", "../etc", "memo 1", "memo/1", "memo.json"] {
            assert!(matches!(validate_id(id), Err(StoreError::InvalidId(_))), "{id}");
        }
    }

    #[test]
    fn error_kinds() {
        let error = StoreError::Serialization {
            id: "memo_1".into(),
            reason: "bad".into(),
        };
        assert_eq!(error.kind(), ErrorKind::Serialization);
        assert_eq!(
            StoreError::InvalidId("x/y".into()).kind(),
            ErrorKind::InputValidation
        );
        let failure: Failure = StoreError::Io(std::io::Error::other("denied")).into();
        assert_eq!(failure.kind, ErrorKind::Storage);
    }
}
