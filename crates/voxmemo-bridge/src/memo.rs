//! The memo record and its audio payload.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Name used when a transcription yields nothing usable as a title.
pub const DEFAULT_MEMO_NAME: &str = "New Memo";

/// Number of characters of the transcription used for a default name.
const NAME_PREFIX_CHARS: usize = 20;

/// A translation of the memo's transcription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Translation {
    /// Target language, as a code (`es`) or display name (`Spanish`).
    pub language: String,
    pub text: String,
}

/// Recorded audio with its MIME type.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioPayload {
    /// Raw encoded audio, base64 in serialized form.
    #[serde(with = "base64_bytes")]
    pub bytes: Vec<u8>,
    /// MIME type reported by the recorder, e.g. `audio/webm;codecs=opus`.
    pub mime_type: String,
}

impl AudioPayload {
    pub fn new(bytes: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            bytes,
            mime_type: mime_type.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// MIME type without parameters such as `;codecs=opus`.
    pub fn essence(&self) -> &str {
        self.mime_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
    }
}

impl fmt::Debug for AudioPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AudioPayload")
            .field("len", &self.bytes.len())
            .field("mime_type", &self.mime_type)
            .finish()
    }
}

/// A persisted voice memo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceMemo {
    /// Unique, immutable identifier.
    pub id: String,
    /// Short title, editable by the user.
    pub name: String,
    /// Creation time.
    pub date: DateTime<Utc>,
    /// Length of the recording in seconds.
    pub duration: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcription: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translation: Option<Translation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio: Option<AudioPayload>,
    /// Incremented by the backend on every write.
    #[serde(default)]
    pub revision: u64,
}

impl VoiceMemo {
    /// Identifier derived from the creation time.
    pub fn id_for(date: DateTime<Utc>) -> String {
        format!("memo_{}", date.timestamp_millis())
    }

    /// Default title: the start of the transcription.
    pub fn default_name(transcription: &str) -> String {
        let name: String = transcription
            .trim()
            .chars()
            .take(NAME_PREFIX_CHARS)
            .collect();
        let name = name.trim_end();
        if name.is_empty() {
            DEFAULT_MEMO_NAME.to_string()
        } else {
            name.to_string()
        }
    }

    /// Size of the stored audio in bytes, if any.
    pub fn audio_size(&self) -> Option<usize> {
        self.audio.as_ref().map(AudioPayload::len)
    }
}

mod base64_bytes {
    use base64::{Engine as _, engine::general_purpose::STANDARD};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    #[test]
    fn default_name_takes_the_first_twenty_characters() {
        assert_eq!(
            VoiceMemo::default_name("  remember to buy oat milk tomorrow"),
            "remember to buy oat"
        );
        assert_eq!(VoiceMemo::default_name("   "), DEFAULT_MEMO_NAME);
        assert_eq!(VoiceMemo::default_name("héllo"), "héllo");
    }

    #[test]
    fn id_is_derived_from_creation_millis() {
        let date = Utc.timestamp_millis_opt(1_700_000_000_123).unwrap();
        assert_eq!(VoiceMemo::id_for(date), "memo_1700000000123");
    }

    #[test]
    fn essence_strips_mime_parameters() {
        let audio = AudioPayload::new(vec![1, 2], "audio/webm;codecs=opus");
        assert_eq!(audio.essence(), "audio/webm");
    }

    #[test]
    fn audio_is_base64_in_json() {
        let audio = AudioPayload::new(vec![0, 1, 2, 255], "audio/wav");
        let json = serde_json::to_value(&audio).unwrap();
        assert_eq!(json["bytes"], "AAEC/w==");
        let back: AudioPayload = serde_json::from_value(json).unwrap();
        assert_eq!(back, audio);
    }
}
