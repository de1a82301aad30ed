//! Typed requests understood by the backend.

use serde::{Deserialize, Serialize};

use crate::memo::{AudioPayload, VoiceMemo};

/// Commands issued by the frontend to control or query the backend.
///
/// In serialized form every request is an object with a `type`
/// discriminator, e.g. `{"type": "DELETE_MEMO", "id": "memo_1"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Request {
    /// Transcribe recorded audio into text.
    TranscribeAudio { audio: AudioPayload },
    /// Translate text into the target language.
    TranslateText {
        text: String,
        target_language: String,
    },
    /// Summarize a transcript.
    SummarizeText { transcript: String },
    /// Create a memo from a freshly transcribed recording.
    StoreTranscript {
        audio: AudioPayload,
        transcription: String,
        duration_seconds: u64,
    },
    /// Replace a memo after the user renamed it.
    UpdateMemoName { memo: VoiceMemo },
    /// Replace a memo after its translation changed.
    UpdateTranslation { memo: VoiceMemo },
    /// Replace a memo after its summary changed.
    UpdateSummary { memo: VoiceMemo },
    /// List every memo, newest first.
    GetAllMemos,
    /// Remove one memo.
    DeleteMemo { id: String },
    /// Remove every memo.
    ClearAllMemos,
    /// Publish whether a recording is in progress. Never answered.
    SetRecordingState { is_recording: bool },
    /// Ask whether a recording is in progress.
    GetRecordingState,
    /// Read the preferred translation language.
    GetPreferredLanguage,
    /// Change the preferred translation language.
    SetPreferredLanguage { language: String },
    /// Translate a text selection into the preferred language.
    TranslateSelection { text: String },
}

impl Request {
    /// Every `type` tag the backend understands.
    pub const TYPES: &'static [&'static str] = &[
        "TRANSCRIBE_AUDIO",
        "TRANSLATE_TEXT",
        "SUMMARIZE_TEXT",
        "STORE_TRANSCRIPT",
        "UPDATE_MEMO_NAME",
        "UPDATE_TRANSLATION",
        "UPDATE_SUMMARY",
        "GET_ALL_MEMOS",
        "DELETE_MEMO",
        "CLEAR_ALL_MEMOS",
        "SET_RECORDING_STATE",
        "GET_RECORDING_STATE",
        "GET_PREFERRED_LANGUAGE",
        "SET_PREFERRED_LANGUAGE",
        "TRANSLATE_SELECTION",
    ];

    /// The `type` tag of this request.
    pub fn kind(&self) -> &'static str {
        match self {
            Request::TranscribeAudio { .. } => "TRANSCRIBE_AUDIO",
            Request::TranslateText { .. } => "TRANSLATE_TEXT",
            Request::SummarizeText { .. } => "SUMMARIZE_TEXT",
            Request::StoreTranscript { .. } => "STORE_TRANSCRIPT",
            Request::UpdateMemoName { .. } => "UPDATE_MEMO_NAME",
            Request::UpdateTranslation { .. } => "UPDATE_TRANSLATION",
            Request::UpdateSummary { .. } => "UPDATE_SUMMARY",
            Request::GetAllMemos => "GET_ALL_MEMOS",
            Request::DeleteMemo { .. } => "DELETE_MEMO",
            Request::ClearAllMemos => "CLEAR_ALL_MEMOS",
            Request::SetRecordingState { .. } => "SET_RECORDING_STATE",
            Request::GetRecordingState => "GET_RECORDING_STATE",
            Request::GetPreferredLanguage => "GET_PREFERRED_LANGUAGE",
            Request::SetPreferredLanguage { .. } => "SET_PREFERRED_LANGUAGE",
            Request::TranslateSelection { .. } => "TRANSLATE_SELECTION",
        }
    }

    /// Whether the backend answers this request.
    pub fn expects_reply(&self) -> bool {
        !matches!(self, Request::SetRecordingState { .. })
    }

    /// Decodes a request from its JSON form.
    ///
    /// Returns `Ok(None)` when the `type` tag is missing or unknown, so the
    /// caller can ignore the message; a known tag with malformed fields is an
    /// error.
    pub fn from_json(value: serde_json::Value) -> Result<Option<Request>, serde_json::Error> {
        let known = value
            .get("type")
            .and_then(serde_json::Value::as_str)
            .is_some_and(|tag| Self::TYPES.contains(&tag));
        if !known {
            return Ok(None);
        }
        serde_json::from_value(value).map(Some)
    }
}
