//! Storage layout of memo records.
//!
//! Audio is kept as base64 text together with its MIME type and byte size;
//! the size is checked when the payload is restored.

use base64::{Engine as _, engine::general_purpose::STANDARD};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use voxmemo_bridge::{AudioPayload, Translation, VoiceMemo};

use super::StoreError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct StoredAudio {
    pub data: String,
    pub mime_type: String,
    pub size: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct StoredMemo {
    pub id: String,
    pub name: String,
    pub date: DateTime<Utc>,
    pub duration: u64,
    #[serde(default)]
    pub transcription: Option<String>,
    #[serde(default)]
    pub translation: Option<Translation>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub audio: Option<StoredAudio>,
    #[serde(default)]
    pub revision: u64,
}

impl StoredAudio {
    fn encode(audio: &AudioPayload) -> Self {
        Self {
            data: STANDARD.encode(&audio.bytes),
            mime_type: audio.mime_type.clone(),
            size: audio.bytes.len(),
        }
    }

    fn decode(&self, id: &str) -> Result<AudioPayload, StoreError> {
        let bytes = STANDARD
            .decode(self.data.as_bytes())
            .map_err(|err| StoreError::Serialization {
                id: id.to_string(),
                reason: err.to_string(),
            })?;
        if bytes.len() != self.size {
            return Err(StoreError::Serialization {
                id: id.to_string(),
                reason: format!("expected {} bytes, found {}", self.size, bytes.len()),
            });
        }
        Ok(AudioPayload::new(bytes, self.mime_type.clone()))
    }
}

impl StoredMemo {
    pub fn encode(memo: &VoiceMemo) -> Self {
        Self {
            id: memo.id.clone(),
            name: memo.name.clone(),
            date: memo.date,
            duration: memo.duration,
            transcription: memo.transcription.clone(),
            translation: memo.translation.clone(),
            summary: memo.summary.clone(),
            audio: memo.audio.as_ref().map(StoredAudio::encode),
            revision: memo.revision,
        }
    }

    pub fn decode(self) -> Result<VoiceMemo, StoreError> {
        let audio = match &self.audio {
            Some(stored) => Some(stored.decode(&self.id)?),
            None => None,
        };
        Ok(VoiceMemo {
            id: self.id,
            name: self.name,
            date: self.date,
            duration: self.duration,
            transcription: self.transcription,
            translation: self.translation,
            summary: self.summary,
            audio,
            revision: self.revision,
        })
    }
}

/// Restores every readable record. Records whose audio cannot be restored
/// are left out rather than returned half-decoded.
pub(crate) fn decode_readable(stored: impl IntoIterator<Item = StoredMemo>) -> Vec<VoiceMemo> {
    stored
        .into_iter()
        .filter_map(|record| match record.decode() {
            Ok(memo) => Some(memo),
            Err(err) => {
                log::warn!("Skipping unreadable memo: {err}");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn memo_with_audio(bytes: Vec<u8>) -> VoiceMemo {
        VoiceMemo {
            id: "memo_1".into(),
            name: "Test".into(),
            date: Utc::now(),
            duration: 3,
            transcription: Some("hello".into()),
            translation: None,
            summary: None,
            audio: Some(AudioPayload::new(bytes, "audio/webm;codecs=opus")),
            revision: 1,
        }
    }

    #[test]
    fn audio_survives_encoding() {
        let memo = memo_with_audio((0..=255).collect());
        let stored = StoredMemo::encode(&memo);
        assert_eq!(stored.audio.as_ref().unwrap().size, 256);
        assert_eq!(stored.decode().unwrap(), memo);
    }

    #[test]
    fn size_mismatch_is_a_serialization_error() {
        let mut stored = StoredMemo::encode(&memo_with_audio(vec![1, 2, 3]));
        stored.audio.as_mut().unwrap().size = 4;
        assert!(matches!(
            stored.decode(),
            Err(StoreError::Serialization { .. })
        ));
    }

    #[test]
    fn invalid_base64_is_a_serialization_error() {
        let mut stored = StoredMemo::encode(&memo_with_audio(vec![1, 2, 3]));
        stored.audio.as_mut().unwrap().data = "not base64!".into();
        assert!(matches!(
            stored.decode(),
            Err(StoreError::Serialization { .. })
        ));
    }
}
