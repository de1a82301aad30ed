//! Error taxonomy shared by both sides of the bridge.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Category of a failed request, carried in every failure envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Missing, oversized or unsupported input.
    InputValidation,
    /// The AI service failed or returned an empty or invalid result.
    Provider,
    /// The record store could not be opened, read or written.
    Storage,
    /// An audio payload could not round-trip through storage.
    Serialization,
    /// The messaging channel is permanently gone and the page must reload.
    ChannelInvalid,
    /// The messaging channel failed transiently and retries ran out.
    Transport,
    /// A record could not be re-read after it was written.
    Verification,
    /// The AI service did not answer in time.
    Timeout,
    /// An update was based on an outdated revision of the record.
    Conflict,
    /// A handler failed unexpectedly.
    Internal,
}

impl ErrorKind {
    /// Whether the failure calls for a page reload rather than a retry.
    pub fn requires_reload(self) -> bool {
        matches!(self, ErrorKind::ChannelInvalid)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::InputValidation => "input validation error",
            ErrorKind::Provider => "provider error",
            ErrorKind::Storage => "storage error",
            ErrorKind::Serialization => "serialization error",
            ErrorKind::ChannelInvalid => "channel invalid",
            ErrorKind::Transport => "transport error",
            ErrorKind::Verification => "verification error",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Conflict => "revision conflict",
            ErrorKind::Internal => "internal error",
        };
        f.write_str(name)
    }
}

/// A failed request as seen by the caller.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct Failure {
    pub kind: ErrorKind,
    pub message: String,
}

impl Failure {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Structured classification of transport errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelErrorKind {
    /// The counterpart was reloaded and its context is gone.
    ContextInvalidated,
    /// Nothing is listening on the other end anymore.
    ReceivingEndMissing,
    /// A connection to the counterpart could not be established.
    ConnectionNotEstablished,
    /// Anything else; worth retrying.
    Transient,
}

impl ChannelErrorKind {
    /// Whether retrying can never succeed for this error.
    pub fn is_permanent(self) -> bool {
        !matches!(self, ChannelErrorKind::Transient)
    }

    /// Classifies an error message produced by a foreign transport that only
    /// reports strings.
    pub fn classify(message: &str) -> Self {
        if message.contains("Extension context invalidated") {
            ChannelErrorKind::ContextInvalidated
        } else if message.contains("Receiving end does not exist") {
            ChannelErrorKind::ReceivingEndMissing
        } else if message.contains("Could not establish connection") {
            ChannelErrorKind::ConnectionNotEstablished
        } else {
            ChannelErrorKind::Transient
        }
    }
}

/// Error returned by a single attempt to reach the backend.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ChannelError {
    pub kind: ChannelErrorKind,
    pub message: String,
}

impl ChannelError {
    pub fn new(kind: ChannelErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Builds an error from a bare message, classifying it on the way.
    pub fn from_message(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            kind: ChannelErrorKind::classify(&message),
            message,
        }
    }
}
