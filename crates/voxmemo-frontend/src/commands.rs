//! Command-line front end: one function per command, each driving the
//! backend through a [`BackendBridge`].

use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow, bail};
use voxmemo_bridge::{AudioPayload, VoiceMemo};

use crate::BackendBridge;
use crate::formatting::{format_bytes, format_date, format_duration};
use crate::messaging::Channel;
use crate::recording::{Orchestrator, SaveStatus};

/// Inputs of the `record` command.
#[derive(Debug, Clone)]
pub struct RecordOptions {
    /// Audio file standing in for the captured recording.
    pub path: PathBuf,
    /// MIME type; guessed from the extension when missing.
    pub mime_type: Option<String>,
    pub duration_seconds: u64,
    /// Translate right after transcribing.
    pub translate: Option<String>,
    /// Summarize right after transcribing.
    pub summarize: bool,
}

/// MIME type for a file extension the AI service accepts.
pub fn guess_mime_type(path: &Path) -> Option<&'static str> {
    let extension = path.extension()?.to_str()?.to_ascii_lowercase();
    Some(match extension.as_str() {
        "mp3" | "mpeg" => "audio/mpeg",
        "wav" => "audio/wav",
        "webm" => "audio/webm",
        "ogg" | "oga" | "opus" => "audio/ogg",
        "aac" => "audio/aac",
        "m4a" | "mp4" => "audio/mp4",
        _ => return None,
    })
}

fn print_memo(memo: &VoiceMemo) {
    println!("{} | {}", memo.id, memo.name);
    println!(
        "  {} | {} | audio {}",
        format_date(&memo.date),
        format_duration(memo.duration),
        memo.audio_size()
            .map(|size| format_bytes(size as u64))
            .unwrap_or_else(|| "none".to_string())
    );
    if let Some(transcription) = &memo.transcription {
        println!("  transcription: {transcription}");
    }
    if let Some(translation) = &memo.translation {
        println!("  translation ({}): {}", translation.language, translation.text);
    }
    if let Some(summary) = &memo.summary {
        println!("  summary: {summary}");
    }
}

fn report<C: Channel>(flow: &Orchestrator<C>) -> anyhow::Result<()> {
    if flow.save_status() == SaveStatus::Error {
        let error = flow
            .last_error()
            .map(ToString::to_string)
            .unwrap_or_else(|| "unknown error".to_string());
        bail!("memo could not be saved: {error}");
    }
    match flow.memo() {
        Some(memo) => print_memo(memo),
        None => log::warn!("Nothing was saved"),
    }
    Ok(())
}

async fn open_for_edit<C: Channel>(
    bridge: &BackendBridge<C>,
    id: &str,
) -> anyhow::Result<Orchestrator<C>> {
    let memo = bridge
        .find_memo(id)
        .await?
        .ok_or_else(|| anyhow!("no memo with id {id}"))?;
    let language = bridge.preferred_language().await?;
    let mut flow = Orchestrator::new(bridge.clone(), language);
    flow.enter_edit(memo);
    Ok(flow)
}

/// Runs a whole recording session with audio read from a file.
pub async fn record<C: Channel>(
    bridge: &BackendBridge<C>,
    options: RecordOptions,
) -> anyhow::Result<()> {
    let bytes = tokio::fs::read(&options.path)
        .await
        .with_context(|| format!("failed to read {:?}", options.path))?;
    let mime_type = match options.mime_type {
        Some(mime_type) => mime_type,
        None => guess_mime_type(&options.path)
            .ok_or_else(|| anyhow!("cannot tell the audio format of {:?}, pass --mime", options.path))?
            .to_string(),
    };

    let language = bridge.preferred_language().await?;
    let mut flow = Orchestrator::new(bridge.clone(), language);
    flow.start_recording().await?;
    flow.stop_recording(AudioPayload::new(bytes, mime_type), options.duration_seconds)
        .await?;
    flow.transcribe().await?;
    if flow.save_status() == SaveStatus::Error && !flow.needs_reload() {
        log::warn!("Saving the memo failed, trying once more");
        if let Err(err) = flow.retry_save().await {
            log::warn!("Retrying the save failed: {err}");
        }
    }

    if let Some(language) = options.translate {
        flow.translate(Some(&language)).await?;
    }
    if options.summarize {
        flow.summarize().await?;
    }
    report(&flow)
}

pub async fn list<C: Channel>(bridge: &BackendBridge<C>) -> anyhow::Result<()> {
    let memos = bridge.list_memos().await?;
    if memos.is_empty() {
        println!("No memos yet.");
        return Ok(());
    }
    for memo in &memos {
        println!(
            "{:<20} {}  {:>8}  {}{}  {}",
            memo.id,
            format_date(&memo.date),
            format_duration(memo.duration),
            if memo.translation.is_some() { "T" } else { "-" },
            if memo.summary.is_some() { "S" } else { "-" },
            memo.name
        );
    }
    Ok(())
}

pub async fn rename<C: Channel>(
    bridge: &BackendBridge<C>,
    id: &str,
    name: &str,
) -> anyhow::Result<()> {
    let mut flow = open_for_edit(bridge, id).await?;
    flow.rename(name).await?;
    report(&flow)
}

pub async fn translate<C: Channel>(
    bridge: &BackendBridge<C>,
    id: &str,
    language: Option<String>,
) -> anyhow::Result<()> {
    let mut flow = open_for_edit(bridge, id).await?;
    if let Some(language) = language {
        flow.select_language(language);
    }
    flow.translate(None).await?;
    report(&flow)
}

pub async fn summarize<C: Channel>(bridge: &BackendBridge<C>, id: &str) -> anyhow::Result<()> {
    let mut flow = open_for_edit(bridge, id).await?;
    flow.summarize().await?;
    report(&flow)
}

pub async fn delete<C: Channel>(bridge: &BackendBridge<C>, id: &str) -> anyhow::Result<()> {
    bridge.delete_memo(id).await?;
    println!("Deleted {id}");
    Ok(())
}

pub async fn clear<C: Channel>(bridge: &BackendBridge<C>) -> anyhow::Result<()> {
    bridge.clear_memos().await?;
    println!("All memos deleted");
    Ok(())
}

/// Shows the preferred translation language, or changes it.
pub async fn language<C: Channel>(
    bridge: &BackendBridge<C>,
    language: Option<String>,
) -> anyhow::Result<()> {
    let language = match language {
        Some(language) => bridge.set_preferred_language(language).await?,
        None => bridge.preferred_language().await?,
    };
    println!("{language}");
    Ok(())
}

/// Translates arbitrary text into the preferred language.
pub async fn translate_text<C: Channel>(
    bridge: &BackendBridge<C>,
    text: &str,
) -> anyhow::Result<()> {
    let (translation, language) = bridge.translate_selection(text).await?;
    println!("[{language}] {translation}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn guesses_supported_formats() {
        assert_eq!(guess_mime_type(Path::new("memo.WAV")), Some("audio/wav"));
        assert_eq!(guess_mime_type(Path::new("a/b/memo.m4a")), Some("audio/mp4"));
        assert_eq!(guess_mime_type(Path::new("memo.opus")), Some("audio/ogg"));
        assert_eq!(guess_mime_type(Path::new("memo.flac")), None);
        assert_eq!(guess_mime_type(Path::new("memo")), None);
    }
}
