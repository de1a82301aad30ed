//! Communication bridge between frontend and backend.
//!
//! This crate defines the types and protocols used to connect the recording
//! frontend with the asynchronous backend responsible for memo storage and
//! calls to the generative-AI service.
//!
//! The design is request/response with a side channel for pushed events:
//! - The frontend sends typed [`Request`]s, each paired with a oneshot reply
//!   slot (e.g., transcribe audio, store a transcript, list memos).
//! - The backend answers every request that expects a reply with a uniform
//!   [`Response`] envelope, and pushes [`MessageFromBackend`] events (memo
//!   updates, notifications) on a separate channel.
//!
//! Communication happens over bounded [`tokio::sync::mpsc`] channels wrapped
//! in [`BridgeChannels`], providing back-pressure, async compatibility, and
//! clean separation of concerns.

pub mod config;
pub mod error;
pub mod language;
pub mod memo;
pub mod notification;
pub mod request;
pub mod response;

use tokio::sync::{
    mpsc::{self, Receiver, Sender},
    oneshot,
};

pub use crate::error::{ChannelError, ChannelErrorKind, ErrorKind, Failure};
pub use crate::memo::{AudioPayload, Translation, VoiceMemo};
pub use crate::request::Request;
pub use crate::response::Response;

/// Messages emitted by the backend without a matching request.
///
/// These are pushed so that every open surface (popup list, recording panel)
/// can refresh after another surface changed shared state.
#[derive(Debug, Clone, PartialEq)]
pub enum MessageFromBackend {
    /// Generic message for all notifications in the application.
    NotificationMessage(notification::NotificationMessage),
    /// A memo record was created, changed or removed.
    MemoUpdate {
        kind: notification::MemoUpdateKind,
        /// Identifier of the affected memo, `None` for a full clear.
        memo_id: Option<String>,
    },
    /// The shared recording flag changed.
    RecordingStateChanged(bool),
}

/// A request travelling from the frontend to the backend.
///
/// Fire-and-forget requests (see [`Request::expects_reply`]) carry no reply
/// slot; the backend drops the reply for them.
#[derive(Debug)]
pub struct BridgeRequest {
    /// The typed request.
    pub request: Request,
    /// Slot the backend answers into.
    pub reply: Option<oneshot::Sender<Response>>,
}

impl BridgeRequest {
    /// Wraps a request together with a fresh reply slot, returning the
    /// receiving half when the request expects an answer.
    pub fn new(request: Request) -> (Self, Option<oneshot::Receiver<Response>>) {
        if request.expects_reply() {
            let (tx, rx) = oneshot::channel();
            (
                Self {
                    request,
                    reply: Some(tx),
                },
                Some(rx),
            )
        } else {
            (
                Self {
                    request,
                    reply: None,
                },
                None,
            )
        }
    }
}

/// Paired `tokio::mpsc` channels for bidirectional communication between
/// frontend and backend.
pub struct BridgeChannels {
    /// Receiver used by the frontend to get events from the backend.
    pub frontend_rx: Receiver<MessageFromBackend>,
    /// Sender used by the frontend to send requests to the backend.
    pub frontend_tx: Sender<BridgeRequest>,

    /// Receiver used by the backend to get requests from the frontend.
    pub backend_rx: Receiver<BridgeRequest>,
    /// Sender used by the backend to push events to the frontend.
    pub backend_tx: Sender<MessageFromBackend>,
}

impl BridgeChannels {
    /// Creates a new pair of bridged channels with the given buffer capacity.
    pub fn new(buffer: usize) -> Self {
        let (to_backend_tx, to_backend_rx) = mpsc::channel(buffer);
        let (to_frontend_tx, to_frontend_rx) = mpsc::channel(buffer);
        Self {
            frontend_tx: to_backend_tx,
            frontend_rx: to_frontend_rx,
            backend_rx: to_backend_rx,
            backend_tx: to_frontend_tx,
        }
    }
}

impl Default for BridgeChannels {
    fn default() -> Self {
        Self::new(64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fire_and_forget_requests_have_no_reply_slot() {
        let (message, rx) = BridgeRequest::new(Request::SetRecordingState { is_recording: true });
        assert!(message.reply.is_none());
        assert!(rx.is_none());

        let (message, rx) = BridgeRequest::new(Request::GetRecordingState);
        assert!(message.reply.is_some());
        assert!(rx.is_some());
    }
}
