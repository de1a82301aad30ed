//! The recording and editing flow.
//!
//! [`Orchestrator`] drives one memo at a time through
//! `Idle -> Recording -> AudioReady -> Transcribing -> HasTranscript`, or
//! straight into `HasTranscript` when an existing memo is opened for editing.
//! A new recording is saved exactly once, after its first successful
//! transcription; every later change updates that memo in place.

use voxmemo_bridge::{AudioPayload, ErrorKind, Failure, Translation, VoiceMemo};

use crate::BackendBridge;
use crate::messaging::Channel;
use crate::requests::{Fingerprint, Operation, RequestTracker, Ticket};

/// Where the current session stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordingState {
    Idle,
    Recording,
    AudioReady,
    Transcribing,
    HasTranscript,
}

/// Progress of the latest write, for display only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveStatus {
    Idle,
    Saving,
    Saved,
    Updating,
    Updated,
    Error,
}

/// Errors surfaced by the flow.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FlowError {
    /// The input was rejected; the previous state is kept.
    #[error("{0}")]
    Validation(String),
    /// The backend is permanently unreachable; only a reload helps.
    #[error("connection to the backend was lost, reload required: {0}")]
    ReloadRequired(String),
    /// A request failed; trying again may help.
    #[error("{0}")]
    Request(Failure),
    /// The action is not available in the current state.
    #[error("cannot {action} while {state:?}")]
    InvalidTransition {
        action: &'static str,
        state: RecordingState,
    },
}

impl FlowError {
    pub fn requires_reload(&self) -> bool {
        matches!(self, FlowError::ReloadRequired(_))
    }
}

impl From<Failure> for FlowError {
    fn from(failure: Failure) -> Self {
        if failure.kind.requires_reload() {
            return FlowError::ReloadRequired(failure.message);
        }
        match failure.kind {
            ErrorKind::InputValidation => FlowError::Validation(failure.message),
            _ => FlowError::Request(failure),
        }
    }
}

/// Which field an in-place update rewrites.
#[derive(Debug, Clone)]
enum Update {
    Name(String),
    Translation,
    Summary,
}

/// State of the recording and editing flow.
pub struct Orchestrator<C> {
    bridge: BackendBridge<C>,
    tracker: RequestTracker,
    state: RecordingState,
    save_status: SaveStatus,
    editing: bool,
    /// Set once the create path ran for the current recording.
    save_started: bool,
    audio: Option<AudioPayload>,
    duration_seconds: u64,
    transcript: Option<String>,
    translation: Option<Translation>,
    summary: Option<String>,
    translation_shown: bool,
    summary_shown: bool,
    target_language: String,
    memo: Option<VoiceMemo>,
    last_error: Option<FlowError>,
}

impl<C: Channel> Orchestrator<C> {
    pub fn new(bridge: BackendBridge<C>, target_language: impl Into<String>) -> Self {
        Self {
            bridge,
            tracker: RequestTracker::new(),
            state: RecordingState::Idle,
            save_status: SaveStatus::Idle,
            editing: false,
            save_started: false,
            audio: None,
            duration_seconds: 0,
            transcript: None,
            translation: None,
            summary: None,
            translation_shown: false,
            summary_shown: false,
            target_language: target_language.into(),
            memo: None,
            last_error: None,
        }
    }

    pub fn state(&self) -> RecordingState {
        self.state
    }

    pub fn save_status(&self) -> SaveStatus {
        self.save_status
    }

    pub fn is_editing(&self) -> bool {
        self.editing
    }

    pub fn transcript(&self) -> Option<&str> {
        self.transcript.as_deref()
    }

    /// The translation, while it is shown.
    pub fn translation(&self) -> Option<&Translation> {
        self.translation.as_ref().filter(|_| self.translation_shown)
    }

    /// The summary, while it is shown.
    pub fn summary(&self) -> Option<&str> {
        self.summary.as_deref().filter(|_| self.summary_shown)
    }

    pub fn target_language(&self) -> &str {
        &self.target_language
    }

    /// The saved memo behind the session, once there is one.
    pub fn memo(&self) -> Option<&VoiceMemo> {
        self.memo.as_ref()
    }

    pub fn last_error(&self) -> Option<&FlowError> {
        self.last_error.as_ref()
    }

    /// Whether the last error asks for a reload.
    pub fn needs_reload(&self) -> bool {
        self.last_error
            .as_ref()
            .is_some_and(FlowError::requires_reload)
    }

    fn require(&self, action: &'static str, expected: RecordingState) -> Result<(), FlowError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(FlowError::InvalidTransition {
                action,
                state: self.state,
            })
        }
    }

    fn record_error(&mut self, error: FlowError) {
        log::warn!("{error}");
        self.last_error = Some(error);
    }

    fn fail<T>(&mut self, error: FlowError) -> Result<T, FlowError> {
        self.record_error(error.clone());
        Err(error)
    }

    /// Publishes the recording flag. Nobody waits on it, so failures are
    /// only logged.
    async fn publish_recording_state(&self, is_recording: bool) {
        if let Err(err) = self.bridge.set_recording_state(is_recording).await {
            log::warn!("Failed to publish recording state: {err}");
        }
    }

    fn clear_session(&mut self) {
        self.tracker.reset();
        self.save_status = SaveStatus::Idle;
        self.editing = false;
        self.save_started = false;
        self.audio = None;
        self.duration_seconds = 0;
        self.transcript = None;
        self.translation = None;
        self.summary = None;
        self.translation_shown = false;
        self.summary_shown = false;
        self.memo = None;
        self.last_error = None;
    }

    pub async fn start_recording(&mut self) -> Result<(), FlowError> {
        self.require("start recording", RecordingState::Idle)?;
        self.clear_session();
        self.state = RecordingState::Recording;
        self.publish_recording_state(true).await;
        Ok(())
    }

    /// Ends the recording with what was captured. An empty capture returns
    /// to `Idle` with a validation error.
    pub async fn stop_recording(
        &mut self,
        audio: AudioPayload,
        duration_seconds: u64,
    ) -> Result<(), FlowError> {
        self.require("stop recording", RecordingState::Recording)?;
        self.publish_recording_state(false).await;

        if audio.is_empty() {
            self.state = RecordingState::Idle;
            return self.fail(FlowError::Validation(
                "no audio was captured".to_string(),
            ));
        }
        self.audio = Some(audio);
        self.duration_seconds = duration_seconds;
        self.state = RecordingState::AudioReady;
        Ok(())
    }

    /// Transcribes the captured audio. On success a new recording is saved;
    /// on failure the flow returns to `AudioReady` so it can be retried.
    pub async fn transcribe(&mut self) -> Result<Option<String>, FlowError> {
        self.require("transcribe", RecordingState::AudioReady)?;
        let Some(audio) = self.audio.clone() else {
            return self.fail(FlowError::Validation("no audio to transcribe".to_string()));
        };

        self.state = RecordingState::Transcribing;
        let ticket = self
            .tracker
            .begin(Operation::Transcribe, Fingerprint::of(&audio.bytes));
        let result = ticket.run(self.bridge.transcribe(audio)).await;
        self.complete_transcription(&ticket, result).await
    }

    /// Applies the answer of a transcription request. Answers whose ticket
    /// was superseded or cancelled are discarded.
    pub async fn complete_transcription(
        &mut self,
        ticket: &Ticket,
        result: Option<Result<String, Failure>>,
    ) -> Result<Option<String>, FlowError> {
        let Some(result) = result else {
            return Ok(None);
        };
        if !self.tracker.finish(ticket) {
            return Ok(None);
        }

        let text = match result {
            Ok(text) => text,
            Err(failure) => {
                if self.state == RecordingState::Transcribing {
                    self.state = RecordingState::AudioReady;
                }
                return self.fail(failure.into());
            }
        };

        if self.transcript.is_some() {
            log::debug!("Transcript already set, ignoring another transcription result");
            return Ok(self.transcript.clone());
        }
        self.transcript = Some(text.clone());
        self.state = RecordingState::HasTranscript;
        self.last_error = None;
        self.save_new_memo().await;
        Ok(Some(text))
    }

    /// Stores the memo for a new recording, at most once per recording.
    async fn save_new_memo(&mut self) {
        if self.editing || self.save_started {
            return;
        }
        let (Some(audio), Some(transcript)) = (self.audio.clone(), self.transcript.clone()) else {
            return;
        };

        self.save_started = true;
        self.save_status = SaveStatus::Saving;
        match self
            .bridge
            .store_transcript(audio, transcript, self.duration_seconds)
            .await
        {
            Ok(memo) => {
                log::info!("Saved new memo {}", memo.id);
                self.memo = Some(memo);
                self.save_status = SaveStatus::Saved;
            }
            Err(failure) => {
                self.save_status = SaveStatus::Error;
                self.record_error(failure.into());
            }
        }
    }

    /// Tries again to store a new recording whose save failed. Translation
    /// and summary produced in the meantime are written once the memo exists.
    pub async fn retry_save(&mut self) -> Result<(), FlowError> {
        self.require("retry saving", RecordingState::HasTranscript)?;
        if self.editing || self.memo.is_some() || self.save_status != SaveStatus::Error {
            return Err(FlowError::InvalidTransition {
                action: "retry saving",
                state: self.state,
            });
        }

        self.save_started = false;
        self.save_new_memo().await;
        if self.memo.is_none() {
            return Err(self
                .last_error
                .clone()
                .unwrap_or_else(|| FlowError::Validation("memo could not be saved".to_string())));
        }
        self.last_error = None;

        if self.translation.is_some() {
            self.update_in_place(Update::Translation).await;
        }
        if self.summary.is_some() {
            self.update_in_place(Update::Summary).await;
        }
        Ok(())
    }

    /// Writes one field of the session to the saved memo. A revision
    /// conflict re-fetches the memo and tries once more.
    async fn update_in_place(&mut self, update: Update) {
        let Some(base) = self.memo.clone() else {
            return;
        };
        self.save_status = SaveStatus::Updating;

        let mut result = self.send_update(base.clone(), &update).await;
        let conflicted = matches!(&result, Err(failure) if failure.kind == ErrorKind::Conflict);
        if conflicted {
            log::info!("Memo {} changed elsewhere, retrying on the latest revision", base.id);
            result = match self.bridge.find_memo(&base.id).await {
                Ok(Some(latest)) => self.send_update(latest, &update).await,
                Ok(None) => Err(Failure::new(
                    ErrorKind::InputValidation,
                    format!("memo {} no longer exists", base.id),
                )),
                Err(err) => Err(err),
            };
        }

        match result {
            Ok(memo) => {
                self.memo = Some(memo);
                self.save_status = SaveStatus::Updated;
            }
            Err(failure) => {
                self.save_status = SaveStatus::Error;
                self.record_error(failure.into());
            }
        }
    }

    async fn send_update(&self, mut memo: VoiceMemo, update: &Update) -> Result<VoiceMemo, Failure> {
        // Audio is never changed by an update; leave it out of the request.
        memo.audio = None;
        match update {
            Update::Name(name) => {
                memo.name = name.clone();
                self.bridge.update_name(memo).await
            }
            Update::Translation => {
                memo.translation = self.translation.clone();
                self.bridge.update_translation(memo).await
            }
            Update::Summary => {
                memo.summary = self.summary.clone();
                self.bridge.update_summary(memo).await
            }
        }
    }

    /// Translates the transcript into `language`, or the selected target
    /// language, and shows the result.
    pub async fn translate(&mut self, language: Option<&str>) -> Result<Option<Translation>, FlowError> {
        self.require("translate", RecordingState::HasTranscript)?;
        let Some(transcript) = self.transcript.clone() else {
            return self.fail(FlowError::Validation("nothing to translate".to_string()));
        };
        let language = language.map_or_else(|| self.target_language.clone(), str::to_string);

        let fingerprint = Fingerprint::of(&(&transcript, &language));
        if self.tracker.was_processed(Operation::Translate, fingerprint) {
            if let Some(translation) = self.translation.clone() {
                self.translation_shown = true;
                return Ok(Some(translation));
            }
        }

        let ticket = self.tracker.begin(Operation::Translate, fingerprint);
        let result = ticket
            .run(self.bridge.translate(transcript, language.clone()))
            .await;
        let Some(result) = result else {
            return Ok(None);
        };
        if !self.tracker.finish(&ticket) {
            return Ok(None);
        }

        let text = match result {
            Ok(text) => text,
            Err(failure) => return self.fail(failure.into()),
        };
        let translation = Translation { language, text };
        self.translation = Some(translation.clone());
        self.translation_shown = true;
        self.update_in_place(Update::Translation).await;
        Ok(Some(translation))
    }

    /// Summarizes the transcript and shows the result.
    pub async fn summarize(&mut self) -> Result<Option<String>, FlowError> {
        self.require("summarize", RecordingState::HasTranscript)?;
        let Some(transcript) = self.transcript.clone() else {
            return self.fail(FlowError::Validation("nothing to summarize".to_string()));
        };

        let fingerprint = Fingerprint::of(&transcript);
        if self.tracker.was_processed(Operation::Summarize, fingerprint) {
            if let Some(summary) = self.summary.clone() {
                self.summary_shown = true;
                return Ok(Some(summary));
            }
        }

        let ticket = self.tracker.begin(Operation::Summarize, fingerprint);
        let Some(result) = ticket.run(self.bridge.summarize(transcript)).await else {
            return Ok(None);
        };
        if !self.tracker.finish(&ticket) {
            return Ok(None);
        }

        let summary = match result {
            Ok(summary) => summary,
            Err(failure) => return self.fail(failure.into()),
        };
        self.summary = Some(summary.clone());
        self.summary_shown = true;
        self.update_in_place(Update::Summary).await;
        Ok(Some(summary))
    }

    pub fn hide_translation(&mut self) {
        self.translation_shown = false;
    }

    pub fn hide_summary(&mut self) {
        self.summary_shown = false;
    }

    /// Picks the language for the next translation. The current translation
    /// is hidden since it no longer matches.
    pub fn select_language(&mut self, language: impl Into<String>) {
        let language = language.into();
        if language != self.target_language {
            self.target_language = language;
            self.translation_shown = false;
            self.tracker.forget(Operation::Translate);
        }
    }

    /// Renames the saved memo.
    pub async fn rename(&mut self, name: &str) -> Result<(), FlowError> {
        let name = name.trim();
        if name.is_empty() {
            return self.fail(FlowError::Validation("memo name cannot be empty".to_string()));
        }
        if self.memo.is_none() {
            return self.fail(FlowError::Validation("there is no saved memo to rename".to_string()));
        }
        self.update_in_place(Update::Name(name.to_string())).await;
        match self.save_status {
            SaveStatus::Error => Err(self.last_error.clone().unwrap_or_else(|| {
                FlowError::Validation("rename failed".to_string())
            })),
            _ => Ok(()),
        }
    }

    /// Opens an existing memo for editing. Edits update it in place; no new
    /// memo is ever created from an edit session.
    pub fn enter_edit(&mut self, memo: VoiceMemo) {
        self.clear_session();
        self.editing = true;
        self.duration_seconds = memo.duration;
        self.transcript = memo.transcription.clone();
        self.translation_shown = memo.translation.is_some();
        self.summary_shown = memo.summary.is_some();
        if let Some(translation) = &memo.translation {
            self.target_language = translation.language.clone();
        }
        self.translation = memo.translation.clone();
        self.summary = memo.summary.clone();
        self.memo = Some(memo);
        self.state = RecordingState::HasTranscript;
    }

    /// Returns to `Idle`, dropping the session. Anything in flight is
    /// cancelled.
    pub fn reset(&mut self) {
        self.clear_session();
        self.state = RecordingState::Idle;
    }

    pub fn exit_edit(&mut self) {
        self.reset();
    }
}
