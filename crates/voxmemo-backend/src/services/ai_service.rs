use voxmemo_bridge::{AudioPayload, ErrorKind, Failure, Response};

/// Longest selection the context-menu translation accepts, in characters.
pub const MAX_SELECTION_CHARS: usize = 5000;

/// Handles [`voxmemo_bridge::Request::TranscribeAudio`].
pub async fn handle_transcribe(
    context: super::AppContextHandle,
    audio: AudioPayload,
) -> Result<Response, Failure> {
    let text = context.gateway.transcribe(&audio).await?;
    log::info!("Transcribed {} bytes into {} characters", audio.len(), text.len());
    Ok(Response::with_text(text))
}

/// Handles [`voxmemo_bridge::Request::TranslateText`].
pub async fn handle_translate(
    context: super::AppContextHandle,
    text: String,
    target_language: String,
) -> Result<Response, Failure> {
    let translated = context.gateway.translate(&text, &target_language).await?;
    Ok(Response::with_text(translated))
}

/// Handles [`voxmemo_bridge::Request::SummarizeText`].
pub async fn handle_summarize(
    context: super::AppContextHandle,
    transcript: String,
) -> Result<Response, Failure> {
    let summary = context.gateway.summarize(&transcript).await?;
    Ok(Response::with_text(summary))
}

/// Handles [`voxmemo_bridge::Request::TranslateSelection`]: translates a text
/// selection into the user's preferred language and reports which language
/// was used.
pub async fn handle_translate_selection(
    context: super::AppContextHandle,
    text: String,
) -> Result<Response, Failure> {
    let text = text.trim();
    if text.is_empty() {
        return Err(Failure::new(ErrorKind::InputValidation, "no text selected"));
    }
    if text.chars().count() > MAX_SELECTION_CHARS {
        return Err(Failure::new(
            ErrorKind::InputValidation,
            format!("selected text is too long (max {MAX_SELECTION_CHARS} characters)"),
        ));
    }

    let language = context.state.read().await.target_language();
    let translated = context.gateway.translate(text, &language).await?;
    Ok(Response {
        language: Some(language),
        ..Response::with_text(translated)
    })
}
