//! Application context and request routing.
//!
//! The context owns the shared state, the record store and the AI gateway,
//! maps every [`Request`] to exactly one service handler, and pushes events
//! back to the frontend bridge.

use std::sync::Arc;

use tokio::sync::{
    RwLock,
    mpsc::{Receiver, Sender},
};
use tokio::task::JoinSet;
use voxmemo_bridge::{
    BridgeRequest, ErrorKind, Failure, MessageFromBackend, Request, Response,
    config::Config,
    notification::{MemoUpdateKind, NotificationMessage, NotificationType},
};

use crate::gateway::AiGateway;
use crate::locks::KeyedLocks;
use crate::services;
use crate::state::{SharedState, State};
use crate::store::{Settings, Store};

/// Shared application context passed to services and message handlers.
pub struct AppContext {
    /// Mutable runtime application state shared across services.
    pub state: SharedState,
    /// Persistence for memos and settings.
    pub store: Arc<dyn Store>,
    /// The generative-AI service.
    pub gateway: Arc<dyn AiGateway>,
    /// Outbound channel to the frontend bridge.
    pub tx: Sender<MessageFromBackend>,
    /// Serializes writes to the same memo id.
    pub(crate) locks: KeyedLocks,
}

impl AppContext {
    /// Builds a context, recovering the persisted settings from the store.
    pub async fn new(
        config: Config,
        store: Arc<dyn Store>,
        gateway: Arc<dyn AiGateway>,
        tx: Sender<MessageFromBackend>,
    ) -> Self {
        let settings = store.load_settings().await.unwrap_or_else(|err| {
            log::warn!("Failed to load settings, using defaults: {err}");
            Settings::default()
        });
        log::debug!("Recovered settings: {settings:?}");

        let state = State {
            is_recording: settings.is_recording,
            preferred_language: settings.preferred_target_language,
            ..State::new(config)
        };

        Self {
            state: Arc::new(RwLock::new(state)),
            store,
            gateway,
            tx,
            locks: KeyedLocks::new(),
        }
    }

    /// Read and dispatch requests from the frontend bridge until it closes.
    ///
    /// Each request runs in its own task, so a slow AI call never holds up
    /// a listing or a delete. Requests still running when the bridge closes
    /// are awaited before returning.
    pub async fn consume_bridge_messages(self: &Arc<Self>, mut rx: Receiver<BridgeRequest>) {
        let mut tasks = JoinSet::new();
        loop {
            tokio::select! {
                message = rx.recv() => {
                    let Some(BridgeRequest { request, reply }) = message else {
                        break;
                    };
                    log::debug!("Got a frontend request: {}", request.kind());
                    // Nobody waits for these, so they are applied in arrival
                    // order before anything sent after them.
                    if reply.is_none() {
                        self.handle(request).await;
                        continue;
                    }
                    let context = self.clone();
                    tasks.spawn(async move {
                        let response = context.handle(request).await;
                        let (Some(reply), Some(response)) = (reply, response) else {
                            return;
                        };
                        if reply.send(response).is_err() {
                            log::debug!("Requester went away before the reply was sent");
                        }
                    });
                }
                Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
            }
        }

        log::info!("Frontend bridge closed, finishing {} pending requests", tasks.len());
        while tasks.join_next().await.is_some() {}
    }

    /// Handles one request, returning the reply for requests that expect one.
    ///
    /// The handler runs on a separate task so that a panic inside it is
    /// turned into an internal failure instead of leaving the caller waiting.
    pub async fn handle(self: &Arc<Self>, request: Request) -> Option<Response> {
        let expects_reply = request.expects_reply();
        let kind = request.kind();
        let context = self.clone();
        let response = match tokio::spawn(async move { context.dispatch(request).await }).await {
            Ok(response) => response,
            Err(err) => {
                log::error!("Handler for {kind} did not complete: {err}");
                Response::failure(ErrorKind::Internal, format!("{kind} failed unexpectedly"))
            }
        };
        expects_reply.then_some(response)
    }

    /// Handles a request in its JSON form.
    ///
    /// Messages with a missing or unknown `type` are logged and ignored.
    pub async fn handle_json(self: &Arc<Self>, value: serde_json::Value) -> Option<Response> {
        match Request::from_json(value) {
            Ok(Some(request)) => self.handle(request).await,
            Ok(None) => {
                log::warn!("Ignoring message with unknown type");
                None
            }
            Err(err) => Some(Response::failure(
                ErrorKind::InputValidation,
                format!("malformed request: {err}"),
            )),
        }
    }

    /// Dispatches the request down to individual service handlers.
    async fn dispatch(self: &Arc<Self>, request: Request) -> Response {
        let kind = request.kind();
        let result: Result<Response, Failure> = match request {
            Request::TranscribeAudio { audio } => {
                services::ai_service::handle_transcribe(self.clone(), audio).await
            }
            Request::TranslateText {
                text,
                target_language,
            } => services::ai_service::handle_translate(self.clone(), text, target_language).await,
            Request::SummarizeText { transcript } => {
                services::ai_service::handle_summarize(self.clone(), transcript).await
            }
            Request::TranslateSelection { text } => {
                services::ai_service::handle_translate_selection(self.clone(), text).await
            }
            Request::StoreTranscript {
                audio,
                transcription,
                duration_seconds,
            } => {
                services::memo_service::handle_store_transcript(
                    self.clone(),
                    audio,
                    transcription,
                    duration_seconds,
                )
                .await
            }
            Request::UpdateMemoName { memo } => {
                services::memo_service::handle_update(self.clone(), memo, services::Change::Name)
                    .await
            }
            Request::UpdateTranslation { memo } => {
                services::memo_service::handle_update(
                    self.clone(),
                    memo,
                    services::Change::Translation,
                )
                .await
            }
            Request::UpdateSummary { memo } => {
                services::memo_service::handle_update(self.clone(), memo, services::Change::Summary)
                    .await
            }
            Request::GetAllMemos => services::memo_service::handle_get_all(self.clone()).await,
            Request::DeleteMemo { id } => {
                services::memo_service::handle_delete(self.clone(), id).await
            }
            Request::ClearAllMemos => services::memo_service::handle_clear(self.clone()).await,
            Request::SetRecordingState { is_recording } => {
                services::settings_service::handle_set_recording_state(self.clone(), is_recording)
                    .await
            }
            Request::GetRecordingState => {
                services::settings_service::handle_get_recording_state(self.clone()).await
            }
            Request::GetPreferredLanguage => {
                services::settings_service::handle_get_preferred_language(self.clone()).await
            }
            Request::SetPreferredLanguage { language } => {
                services::settings_service::handle_set_preferred_language(self.clone(), language)
                    .await
            }
        };

        result.unwrap_or_else(|failure| {
            log::warn!("{kind} failed ({:?}): {}", failure.kind, failure.message);
            failure.into()
        })
    }

    /// Send a message to the frontend bridge. A closed channel only means no
    /// frontend is listening anymore.
    pub async fn send(&self, message: MessageFromBackend) {
        if self.tx.send(message).await.is_err() {
            log::debug!("Frontend event channel closed, dropping event");
        }
    }

    /// Tell the frontend that a memo record changed.
    pub async fn send_memo_update(&self, kind: MemoUpdateKind, memo_id: Option<String>) {
        self.send(MessageFromBackend::MemoUpdate { kind, memo_id })
            .await;
    }

    /// Send a notification message to the frontend bridge.
    pub async fn send_notification(
        &self,
        notification_type: NotificationType,
        content: impl Into<String>,
    ) {
        self.send(MessageFromBackend::NotificationMessage(
            NotificationMessage {
                notification_type,
                message: content.into(),
            },
        ))
        .await;
    }
}
