/// The core application state that holds configuration and the few flags the
/// router shares between requests.
///
/// It is designed to be wrapped in thread-safe, async-friendly concurrency
/// primitives (see [`SharedState`]) to allow safe concurrent reads and
/// occasional writes from multiple tasks.
#[derive(Debug, Clone)]
pub struct State {
    /// The loaded application configuration.
    pub config: voxmemo_bridge::config::Config,
    /// Whether a recording is in progress in any frontend.
    pub is_recording: bool,
    /// Language chosen by the user for translations.
    pub preferred_language: Option<String>,
}

impl State {
    pub fn new(config: voxmemo_bridge::config::Config) -> Self {
        Self {
            config,
            is_recording: false,
            preferred_language: None,
        }
    }

    /// The preferred translation language, falling back to the configured
    /// default.
    pub fn target_language(&self) -> String {
        self.preferred_language
            .clone()
            .unwrap_or_else(|| self.config.default_target_language.clone())
    }
}

/// Thread-safe, async-friendly shared reference to the application [`State`].
pub type SharedState = std::sync::Arc<tokio::sync::RwLock<State>>;
