//! Backend runtime entry point and public API surface.
//!
//! This crate owns the backend lifecycle, routes bridge requests to services,
//! persists memos and settings, and talks to the generative-AI service.

mod app;
pub mod config;
pub mod gateway;
mod locks;
mod runtime;
mod services;
pub mod state;
pub mod store;

pub use crate::app::AppContext;
pub use crate::runtime::{RuntimeError, StorageLocation, run};
pub use crate::services::ai_service::MAX_SELECTION_CHARS;
