//! Backend service handlers for frontend-driven requests.
//!
//! This module groups async request handlers that operate on the shared
//! `AppContext`, perform side effects (network, filesystem), and emit
//! events back to the frontend. Every handler returns a `Result` that the
//! router turns into a response envelope.

pub mod ai_service;
pub mod memo_service;
pub mod settings_service;

/// Represents a type that is used in all handlers as an application context.
pub(crate) type AppContextHandle = std::sync::Arc<crate::AppContext>;

/// The part of a memo an update request is allowed to change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Change {
    Name,
    Translation,
    Summary,
}
