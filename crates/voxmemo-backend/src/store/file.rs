use std::io::ErrorKind as IoErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::{
    fs::{self, OpenOptions},
    io::AsyncWriteExt,
};
use voxmemo_bridge::VoiceMemo;

use super::codec::{StoredMemo, decode_readable};
use super::{MemoStore, Settings, SettingsStore, StoreError, sort_newest_first, validate_id};

const MEMOS_DIR: &str = "memos";
const SETTINGS_FILE: &str = "settings.json";

/// File-backed store: one JSON document per memo under `<root>/memos`, and
/// the settings in `<root>/settings.json`.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Opens (creating if needed) a store rooted at the given directory.
    pub async fn open(root: impl AsRef<Path>) -> Result<Self, StoreError> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(root.join(MEMOS_DIR)).await?;
        log::info!("Opened memo store at {root:?}");
        Ok(Self { root })
    }

    fn memos_dir(&self) -> PathBuf {
        self.root.join(MEMOS_DIR)
    }

    fn memo_path(&self, id: &str) -> PathBuf {
        self.memos_dir().join(format!("{id}.json"))
    }

    fn settings_path(&self) -> PathBuf {
        self.root.join(SETTINGS_FILE)
    }

    async fn read_stored(path: &Path) -> Result<Option<StoredMemo>, StoreError> {
        match fs::read(path).await {
            Ok(contents) => Ok(Some(serde_json::from_slice(&contents)?)),
            Err(err) if err.kind() == IoErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }
}

/// Writes to a sibling temp file and renames it over the target, so readers
/// see either the old or the new document.
async fn write_atomically(path: &Path, contents: &[u8]) -> Result<(), StoreError> {
    let temp_path = path.with_extension("json.tmp");
    {
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&temp_path)
            .await?;
        file.write_all(contents).await?;
        file.sync_all().await?;
    }
    fs::rename(&temp_path, path).await?;
    Ok(())
}

#[async_trait]
impl MemoStore for FileStore {
    async fn put(&self, memo: &VoiceMemo) -> Result<String, StoreError> {
        validate_id(&memo.id)?;
        let contents = serde_json::to_vec(&StoredMemo::encode(memo))?;
        write_atomically(&self.memo_path(&memo.id), &contents).await?;
        log::debug!("Saved memo {} (revision {})", memo.id, memo.revision);
        Ok(memo.id.clone())
    }

    async fn get(&self, id: &str) -> Result<Option<VoiceMemo>, StoreError> {
        validate_id(id)?;
        match Self::read_stored(&self.memo_path(id)).await? {
            Some(stored) => Ok(Some(stored.decode()?)),
            None => Ok(None),
        }
    }

    async fn get_all(&self) -> Result<Vec<VoiceMemo>, StoreError> {
        let mut entries = fs::read_dir(self.memos_dir()).await?;
        let mut stored = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            match Self::read_stored(&path).await {
                Ok(Some(record)) => stored.push(record),
                Ok(None) => {}
                Err(err) => log::warn!("Skipping unreadable memo file {path:?}: {err}"),
            }
        }

        let mut memos = decode_readable(stored);
        sort_newest_first(&mut memos);
        log::debug!("Loaded {} memos", memos.len());
        Ok(memos)
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        validate_id(id)?;
        match fs::remove_file(self.memo_path(id)).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == IoErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    async fn clear(&self) -> Result<(), StoreError> {
        match fs::remove_dir_all(self.memos_dir()).await {
            Ok(()) => {}
            Err(err) if err.kind() == IoErrorKind::NotFound => {}
            Err(err) => return Err(err.into()),
        }
        fs::create_dir_all(self.memos_dir()).await?;
        Ok(())
    }
}

#[async_trait]
impl SettingsStore for FileStore {
    async fn load_settings(&self) -> Result<Settings, StoreError> {
        match fs::read(self.settings_path()).await {
            Ok(contents) => Ok(serde_json::from_slice(&contents)?),
            Err(err) if err.kind() == IoErrorKind::NotFound => Ok(Settings::default()),
            Err(err) => Err(err.into()),
        }
    }

    async fn save_settings(&self, settings: &Settings) -> Result<(), StoreError> {
        let contents = serde_json::to_vec_pretty(settings)?;
        write_atomically(&self.settings_path(), &contents).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;
    use voxmemo_bridge::AudioPayload;

    fn memo(id: &str) -> VoiceMemo {
        VoiceMemo {
            id: id.to_string(),
            name: "Test".to_string(),
            date: Utc::now(),
            duration: 4,
            transcription: Some("hello".to_string()),
            translation: None,
            summary: None,
            audio: Some(AudioPayload::new(vec![9, 8, 7], "audio/ogg")),
            revision: 1,
        }
    }

    #[tokio::test]
    async fn records_survive_reopening() {
        let temp = tempdir().expect("tempdir");
        let store = FileStore::open(temp.path()).await.unwrap();
        let original = memo("memo_1");
        store.put(&original).await.unwrap();
        store
            .save_settings(&Settings {
                is_recording: true,
                preferred_target_language: Some("fr".into()),
            })
            .await
            .unwrap();

        let reopened = FileStore::open(temp.path()).await.unwrap();
        assert_eq!(reopened.get("memo_1").await.unwrap(), Some(original));
        assert!(reopened.load_settings().await.unwrap().is_recording);
    }

    #[tokio::test]
    async fn leaves_no_temp_files_behind() {
        let temp = tempdir().expect("tempdir");
        let store = FileStore::open(temp.path()).await.unwrap();
        store.put(&memo("memo_1")).await.unwrap();
        store.put(&memo("memo_1")).await.unwrap();

        let names: Vec<String> = std::fs::read_dir(temp.path().join(MEMOS_DIR))
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["memo_1.json"]);
    }

    #[tokio::test]
    async fn corrupt_file_fails_get_but_not_get_all() {
        let temp = tempdir().expect("tempdir");
        let store = FileStore::open(temp.path()).await.unwrap();
        store.put(&memo("memo_1")).await.unwrap();
        std::fs::write(temp.path().join(MEMOS_DIR).join("memo_2.json"), b"{oops").unwrap();

        assert!(matches!(
            store.get("memo_2").await,
            Err(StoreError::Corrupt(_))
        ));
        assert_eq!(store.get_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn clear_and_delete_tolerate_missing_records() {
        let temp = tempdir().expect("tempdir");
        let store = FileStore::open(temp.path()).await.unwrap();
        store.delete("memo_missing").await.unwrap();
        store.put(&memo("memo_1")).await.unwrap();
        store.clear().await.unwrap();
        assert!(store.get_all().await.unwrap().is_empty());
        store.put(&memo("memo_2")).await.unwrap();
        assert_eq!(store.get_all().await.unwrap().len(), 1);
    }
}
