//! Memo persistence handlers.
//!
//! Writes to a memo id are serialized through the context's keyed locks and
//! every write is read back before success is reported.

use chrono::{TimeDelta, Utc};
use voxmemo_bridge::{
    AudioPayload, ErrorKind, Failure, Response, VoiceMemo,
    notification::{MemoUpdateKind, NotificationType},
};

use super::{AppContextHandle, Change};

/// Re-reads a record after writing it, so a write the store silently lost is
/// reported as a failure.
async fn verify_written(context: &crate::AppContext, id: &str) -> Result<VoiceMemo, Failure> {
    match context.store.get(id).await {
        Ok(Some(memo)) => Ok(memo),
        Ok(None) => Err(Failure::new(
            ErrorKind::Verification,
            format!("memo {id} was not found after saving"),
        )),
        Err(err) => Err(Failure::new(
            ErrorKind::Verification,
            format!("memo {id} could not be read back after saving: {err}"),
        )),
    }
}

async fn choose_name(context: &crate::AppContext, transcription: &str) -> String {
    let generate_names = context.state.read().await.config.generate_names;
    if !generate_names {
        return VoiceMemo::default_name(transcription);
    }

    match context.gateway.generate_name(transcription).await {
        Ok(name) if !name.trim().is_empty() => name,
        Ok(_) => VoiceMemo::default_name(transcription),
        Err(err) => {
            log::warn!("Failed to generate a memo name, using the default: {err}");
            context
                .send_notification(
                    NotificationType::Warning,
                    "Could not generate a name, the memo is named after its transcription",
                )
                .await;
            VoiceMemo::default_name(transcription)
        }
    }
}

/// Handles [`voxmemo_bridge::Request::StoreTranscript`]: creates a new memo
/// from a freshly transcribed recording.
pub async fn handle_store_transcript(
    context: AppContextHandle,
    audio: AudioPayload,
    transcription: String,
    duration_seconds: u64,
) -> Result<Response, Failure> {
    if audio.is_empty() {
        return Err(Failure::new(
            ErrorKind::InputValidation,
            "no audio data provided",
        ));
    }
    if transcription.trim().is_empty() {
        return Err(Failure::new(
            ErrorKind::InputValidation,
            "no transcription provided",
        ));
    }

    let name = choose_name(&context, &transcription).await;

    // Ids come from the creation time; two saves in the same millisecond get
    // consecutive ids.
    let date = Utc::now();
    let mut candidate = date;
    let (id, _guard) = loop {
        let id = VoiceMemo::id_for(candidate);
        let guard = context.locks.lock(&id).await;
        if context.store.get(&id).await?.is_none() {
            break (id, guard);
        }
        candidate += TimeDelta::milliseconds(1);
    };

    let memo = VoiceMemo {
        id: id.clone(),
        name,
        date,
        duration: duration_seconds,
        transcription: Some(transcription),
        translation: None,
        summary: None,
        audio: Some(audio),
        revision: 1,
    };
    context.store.put(&memo).await?;
    let saved = verify_written(&context, &id).await?;
    log::info!("Saved memo {id} ({:?})", saved.name);

    context
        .send_memo_update(MemoUpdateKind::Saved, Some(id))
        .await;
    Ok(Response::with_memo(saved))
}

/// Applies one change from `incoming` on top of the stored record.
fn merge(existing: VoiceMemo, incoming: VoiceMemo, change: Change) -> VoiceMemo {
    let mut updated = existing;
    match change {
        Change::Name => updated.name = incoming.name.trim().to_string(),
        Change::Translation => updated.translation = incoming.translation,
        Change::Summary => updated.summary = incoming.summary,
    }
    updated.revision += 1;
    updated
}

/// Handles the `UPDATE_*` requests: rewrites one field of an existing memo.
///
/// The incoming memo carries the revision it was based on. A non-zero
/// revision that no longer matches the stored one is rejected with
/// [`ErrorKind::Conflict`]; the caller should re-fetch and retry.
pub async fn handle_update(
    context: AppContextHandle,
    incoming: VoiceMemo,
    change: Change,
) -> Result<Response, Failure> {
    if change == Change::Name && incoming.name.trim().is_empty() {
        return Err(Failure::new(
            ErrorKind::InputValidation,
            "memo name cannot be empty",
        ));
    }

    let id = incoming.id.clone();
    let guard = context.locks.lock(&id).await;
    let Some(existing) = context.store.get(&id).await? else {
        return Err(Failure::new(
            ErrorKind::InputValidation,
            format!("memo {id} does not exist"),
        ));
    };
    if incoming.revision != 0 && incoming.revision != existing.revision {
        return Err(Failure::new(
            ErrorKind::Conflict,
            format!(
                "memo {id} was changed elsewhere (stored revision {}, update based on {})",
                existing.revision, incoming.revision
            ),
        ));
    }

    let memo = merge(existing, incoming, change);
    context.store.put(&memo).await?;
    let saved = verify_written(&context, &id).await?;
    drop(guard);
    log::info!("Updated {change:?} of memo {id}, now at revision {}", saved.revision);

    context
        .send_memo_update(MemoUpdateKind::Updated, Some(id))
        .await;
    Ok(Response::with_memo(saved))
}

/// Handles [`voxmemo_bridge::Request::GetAllMemos`].
pub async fn handle_get_all(context: AppContextHandle) -> Result<Response, Failure> {
    let memos = context.store.get_all().await?;
    Ok(Response::with_memos(memos))
}

/// Handles [`voxmemo_bridge::Request::DeleteMemo`]. Deleting an id that does
/// not exist succeeds.
pub async fn handle_delete(context: AppContextHandle, id: String) -> Result<Response, Failure> {
    {
        let _guard = context.locks.lock(&id).await;
        context.store.delete(&id).await?;
    }
    log::info!("Deleted memo {id}");
    context
        .send_memo_update(MemoUpdateKind::Deleted, Some(id))
        .await;
    Ok(Response::ok())
}

/// Handles [`voxmemo_bridge::Request::ClearAllMemos`].
pub async fn handle_clear(context: AppContextHandle) -> Result<Response, Failure> {
    context.store.clear().await?;
    log::info!("Cleared all memos");
    context.send_memo_update(MemoUpdateKind::Cleared, None).await;
    Ok(Response::ok())
}
