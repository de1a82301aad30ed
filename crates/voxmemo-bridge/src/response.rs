//! The uniform response envelope.

use serde::{Deserialize, Serialize};

use crate::error::{ErrorKind, Failure};
use crate::memo::VoiceMemo;

/// Answer to a [`crate::Request`].
///
/// `success` is always present; the payload fields that apply to the request
/// are filled on success, `error` and `kind` on failure.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Response {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memo: Option<VoiceMemo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memos: Option<Vec<VoiceMemo>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_recording: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ErrorKind>,
}

impl Response {
    /// Successful response without payload.
    pub fn ok() -> Self {
        Self {
            success: true,
            ..Self::default()
        }
    }

    pub fn with_text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::ok()
        }
    }

    pub fn with_memo(memo: VoiceMemo) -> Self {
        Self {
            memo: Some(memo),
            ..Self::ok()
        }
    }

    pub fn with_memos(memos: Vec<VoiceMemo>) -> Self {
        Self {
            memos: Some(memos),
            ..Self::ok()
        }
    }

    pub fn with_recording_state(is_recording: bool) -> Self {
        Self {
            is_recording: Some(is_recording),
            ..Self::ok()
        }
    }

    pub fn with_language(language: impl Into<String>) -> Self {
        Self {
            language: Some(language.into()),
            ..Self::ok()
        }
    }

    /// Failed response.
    pub fn failure(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(message.into()),
            kind: Some(kind),
            ..Self::default()
        }
    }

    /// Splits the envelope into a Rust result.
    pub fn into_result(self) -> Result<Response, Failure> {
        if self.success {
            return Ok(self);
        }
        Err(Failure {
            kind: self.kind.unwrap_or(ErrorKind::Internal),
            message: self.error.unwrap_or_else(|| "request failed".to_string()),
        })
    }
}

impl From<Failure> for Response {
    fn from(failure: Failure) -> Self {
        Response::failure(failure.kind, failure.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn envelope_shape() {
        let value = serde_json::to_value(Response::with_text("hola")).unwrap();
        assert_eq!(value, json!({"success": true, "text": "hola"}));

        let value = serde_json::to_value(Response::failure(ErrorKind::Storage, "disk full")).unwrap();
        assert_eq!(
            value,
            json!({"success": false, "error": "disk full", "kind": "storage"})
        );
    }

    #[test]
    fn into_result_splits_on_success_flag() {
        assert!(Response::ok().into_result().is_ok());
        let failure = Response::failure(ErrorKind::Timeout, "slow")
            .into_result()
            .unwrap_err();
        assert_eq!(failure, Failure::new(ErrorKind::Timeout, "slow"));
    }
}
