use std::sync::Arc;

use tokio::sync::mpsc;
use voxmemo_bridge::{
    AudioPayload, BridgeRequest, ErrorKind, Failure, MessageFromBackend, Request, Response,
    VoiceMemo,
    config::MessagingConfig,
    notification::NotificationType,
};

use crate::messaging::{BridgeChannel, Channel, SafeMessenger};

pub mod commands;
pub mod formatting;
pub mod messaging;
pub mod recording;
pub mod requests;

/// Typed access to the backend through a [`SafeMessenger`].
pub struct BackendBridge<C = BridgeChannel> {
    messenger: Arc<SafeMessenger<C>>,
}

impl<C> Clone for BackendBridge<C> {
    fn clone(&self) -> Self {
        Self {
            messenger: self.messenger.clone(),
        }
    }
}

impl BackendBridge<BridgeChannel> {
    /// Connects to the in-process backend.
    pub fn connect(to_backend: mpsc::Sender<BridgeRequest>, config: &MessagingConfig) -> Self {
        Self::new(SafeMessenger::new(BridgeChannel::new(to_backend), config))
    }
}

fn missing(field: &str) -> Failure {
    Failure::new(
        ErrorKind::Internal,
        format!("backend response is missing the {field}"),
    )
}

impl<C: Channel> BackendBridge<C> {
    pub fn new(messenger: SafeMessenger<C>) -> Self {
        Self {
            messenger: Arc::new(messenger),
        }
    }

    pub async fn send(&self, request: Request) -> Result<Response, Failure> {
        self.messenger.send(request).await
    }

    async fn text(&self, request: Request) -> Result<String, Failure> {
        self.send(request).await?.text.ok_or_else(|| missing("text"))
    }

    async fn memo(&self, request: Request) -> Result<VoiceMemo, Failure> {
        self.send(request).await?.memo.ok_or_else(|| missing("memo"))
    }

    pub async fn transcribe(&self, audio: AudioPayload) -> Result<String, Failure> {
        self.text(Request::TranscribeAudio { audio }).await
    }

    pub async fn translate(
        &self,
        text: impl Into<String>,
        target_language: impl Into<String>,
    ) -> Result<String, Failure> {
        self.text(Request::TranslateText {
            text: text.into(),
            target_language: target_language.into(),
        })
        .await
    }

    pub async fn summarize(&self, transcript: impl Into<String>) -> Result<String, Failure> {
        self.text(Request::SummarizeText {
            transcript: transcript.into(),
        })
        .await
    }

    /// Translates a selection into the preferred language, returning the
    /// translation and the language used.
    pub async fn translate_selection(
        &self,
        text: impl Into<String>,
    ) -> Result<(String, String), Failure> {
        let response = self
            .send(Request::TranslateSelection { text: text.into() })
            .await?;
        let language = response.language.ok_or_else(|| missing("language"))?;
        let text = response.text.ok_or_else(|| missing("text"))?;
        Ok((text, language))
    }

    pub async fn store_transcript(
        &self,
        audio: AudioPayload,
        transcription: impl Into<String>,
        duration_seconds: u64,
    ) -> Result<VoiceMemo, Failure> {
        self.memo(Request::StoreTranscript {
            audio,
            transcription: transcription.into(),
            duration_seconds,
        })
        .await
    }

    pub async fn update_name(&self, memo: VoiceMemo) -> Result<VoiceMemo, Failure> {
        self.memo(Request::UpdateMemoName { memo }).await
    }

    pub async fn update_translation(&self, memo: VoiceMemo) -> Result<VoiceMemo, Failure> {
        self.memo(Request::UpdateTranslation { memo }).await
    }

    pub async fn update_summary(&self, memo: VoiceMemo) -> Result<VoiceMemo, Failure> {
        self.memo(Request::UpdateSummary { memo }).await
    }

    pub async fn list_memos(&self) -> Result<Vec<VoiceMemo>, Failure> {
        self.send(Request::GetAllMemos)
            .await?
            .memos
            .ok_or_else(|| missing("memo list"))
    }

    /// Looks a memo up by id in the full listing.
    pub async fn find_memo(&self, id: &str) -> Result<Option<VoiceMemo>, Failure> {
        Ok(self
            .list_memos()
            .await?
            .into_iter()
            .find(|memo| memo.id == id))
    }

    pub async fn delete_memo(&self, id: impl Into<String>) -> Result<(), Failure> {
        self.send(Request::DeleteMemo { id: id.into() }).await?;
        Ok(())
    }

    pub async fn clear_memos(&self) -> Result<(), Failure> {
        self.send(Request::ClearAllMemos).await?;
        Ok(())
    }

    pub async fn set_recording_state(&self, is_recording: bool) -> Result<(), Failure> {
        self.send(Request::SetRecordingState { is_recording })
            .await?;
        Ok(())
    }

    pub async fn recording_state(&self) -> Result<bool, Failure> {
        self.send(Request::GetRecordingState)
            .await?
            .is_recording
            .ok_or_else(|| missing("recording state"))
    }

    pub async fn preferred_language(&self) -> Result<String, Failure> {
        self.send(Request::GetPreferredLanguage)
            .await?
            .language
            .ok_or_else(|| missing("language"))
    }

    pub async fn set_preferred_language(
        &self,
        language: impl Into<String>,
    ) -> Result<String, Failure> {
        self.send(Request::SetPreferredLanguage {
            language: language.into(),
        })
        .await?
        .language
        .ok_or_else(|| missing("language"))
    }
}

/// Drains backend events so the backend never blocks on a full channel, and
/// logs them.
pub fn spawn_event_listener(
    mut rx: mpsc::Receiver<MessageFromBackend>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            match message {
                MessageFromBackend::NotificationMessage(notification) => {
                    match notification.notification_type {
                        NotificationType::Error => log::error!("{}", notification.message),
                        NotificationType::Warning => log::warn!("{}", notification.message),
                        NotificationType::Info | NotificationType::Success => {
                            log::info!("{}", notification.message)
                        }
                    }
                }
                MessageFromBackend::MemoUpdate { kind, memo_id } => {
                    log::debug!("Memo update: {kind:?} {memo_id:?}");
                }
                MessageFromBackend::RecordingStateChanged(is_recording) => {
                    log::debug!("Recording state changed: {is_recording}");
                }
            }
        }
    })
}
