use voxmemo_bridge::{ErrorKind, Failure, MessageFromBackend, Response, language};

use crate::store::{Settings, StoreError};

/// Lock key for settings writes. The colon keeps it out of the memo id space.
const SETTINGS_LOCK: &str = ":settings";

/// Writes the current flags from the shared state to the settings store.
async fn persist_settings(context: &crate::AppContext) -> Result<(), StoreError> {
    let _guard = context.locks.lock(SETTINGS_LOCK).await;
    let settings = {
        let state = context.state.read().await;
        Settings {
            is_recording: state.is_recording,
            preferred_target_language: state.preferred_language.clone(),
        }
    };
    context.store.save_settings(&settings).await
}

/// Handles [`voxmemo_bridge::Request::SetRecordingState`]. Nobody waits for
/// the answer, so persistence failures are only logged.
pub async fn handle_set_recording_state(
    context: super::AppContextHandle,
    is_recording: bool,
) -> Result<Response, Failure> {
    context.state.write().await.is_recording = is_recording;
    log::debug!("Recording state set to {is_recording}");

    if let Err(err) = persist_settings(&context).await {
        log::error!("Failed to persist the recording state: {err}");
    }
    context
        .send(MessageFromBackend::RecordingStateChanged(is_recording))
        .await;
    Ok(Response::ok())
}

/// Handles [`voxmemo_bridge::Request::GetRecordingState`].
pub async fn handle_get_recording_state(
    context: super::AppContextHandle,
) -> Result<Response, Failure> {
    let is_recording = context.state.read().await.is_recording;
    Ok(Response::with_recording_state(is_recording))
}

/// Handles [`voxmemo_bridge::Request::GetPreferredLanguage`].
pub async fn handle_get_preferred_language(
    context: super::AppContextHandle,
) -> Result<Response, Failure> {
    let language = context.state.read().await.target_language();
    Ok(Response::with_language(language))
}

/// Handles [`voxmemo_bridge::Request::SetPreferredLanguage`]. Known codes
/// and names are stored under their display name; anything else is kept as
/// typed.
pub async fn handle_set_preferred_language(
    context: super::AppContextHandle,
    language: String,
) -> Result<Response, Failure> {
    let language = language.trim();
    if language.is_empty() {
        return Err(Failure::new(
            ErrorKind::InputValidation,
            "language cannot be empty",
        ));
    }
    let language = language::display_name(language).to_string();

    context.state.write().await.preferred_language = Some(language.clone());
    persist_settings(&context).await?;
    log::info!("Preferred translation language set to {language}");
    Ok(Response::with_language(language))
}
