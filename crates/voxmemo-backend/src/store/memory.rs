use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use voxmemo_bridge::VoiceMemo;

use super::codec::{StoredMemo, decode_readable};
use super::{MemoStore, Settings, SettingsStore, StoreError, sort_newest_first, validate_id};

/// Store that keeps records in process memory. Records still go through the
/// storage encoding so audio behaves exactly as with [`super::FileStore`].
#[derive(Debug, Default)]
pub struct InMemoryStore {
    memos: RwLock<BTreeMap<String, StoredMemo>>,
    settings: RwLock<Settings>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MemoStore for InMemoryStore {
    async fn put(&self, memo: &VoiceMemo) -> Result<String, StoreError> {
        validate_id(&memo.id)?;
        self.memos
            .write()
            .await
            .insert(memo.id.clone(), StoredMemo::encode(memo));
        Ok(memo.id.clone())
    }

    async fn get(&self, id: &str) -> Result<Option<VoiceMemo>, StoreError> {
        validate_id(id)?;
        let stored = self.memos.read().await.get(id).cloned();
        stored.map(StoredMemo::decode).transpose()
    }

    async fn get_all(&self) -> Result<Vec<VoiceMemo>, StoreError> {
        let stored: Vec<StoredMemo> = self.memos.read().await.values().cloned().collect();
        let mut memos = decode_readable(stored);
        sort_newest_first(&mut memos);
        Ok(memos)
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        validate_id(id)?;
        self.memos.write().await.remove(id);
        Ok(())
    }

    async fn clear(&self) -> Result<(), StoreError> {
        self.memos.write().await.clear();
        Ok(())
    }
}

#[async_trait]
impl SettingsStore for InMemoryStore {
    async fn load_settings(&self) -> Result<Settings, StoreError> {
        Ok(self.settings.read().await.clone())
    }

    async fn save_settings(&self, settings: &Settings) -> Result<(), StoreError> {
        *self.settings.write().await = settings.clone();
        Ok(())
    }
}
