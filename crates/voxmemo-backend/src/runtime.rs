//! Backend runtime setup and orchestration.
//!
//! This module wires together configuration, storage, the AI gateway and the
//! request loop that listens to frontend bridge requests.

use std::{path::PathBuf, sync::Arc, thread};

use tokio::sync::mpsc::{Receiver, Sender};
use voxmemo_bridge::{BridgeRequest, MessageFromBackend, config::Config};

use crate::app::AppContext;
use crate::gateway::{AiGateway, GeminiClient, ModelGateway};
use crate::store::{FileStore, InMemoryStore, Store, StoreError};

/// Where the backend keeps memos and settings.
#[derive(Debug, Clone)]
pub enum StorageLocation {
    /// A directory on disk, created if missing.
    Directory(PathBuf),
    /// Process memory; everything is lost on exit.
    Memory,
}

/// Errors that stop the backend before it can serve requests.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("failed to build the async runtime: {0}")]
    Runtime(#[from] std::io::Error),
    #[error("failed to open the memo store: {0}")]
    Store(#[from] StoreError),
}

/// Builds the production gateway from the configuration.
fn build_gateway(config: &Config) -> Arc<dyn AiGateway> {
    let client = GeminiClient::new(
        reqwest::Client::new(),
        config.gemini.base_url.clone(),
        config.api_key.clone(),
    );
    if config.api_key.is_none() {
        log::warn!("No API key configured, AI requests will fail until one is set");
    }
    Arc::new(ModelGateway::new(client, config))
}

async fn open_store(location: StorageLocation) -> Result<Arc<dyn Store>, StoreError> {
    Ok(match location {
        StorageLocation::Directory(path) => Arc::new(FileStore::open(path).await?),
        StorageLocation::Memory => {
            log::info!("Using an in-memory store, memos will not be kept");
            Arc::new(InMemoryStore::new())
        }
    })
}

/// Initialize backend state and start processing frontend requests.
async fn setup_backend(
    config: Config,
    location: StorageLocation,
    rx: Receiver<BridgeRequest>,
    tx: Sender<MessageFromBackend>,
) -> Result<(), RuntimeError> {
    let store = open_store(location).await?;
    let gateway = build_gateway(&config);
    let context = Arc::new(AppContext::new(config, store, gateway, tx).await);
    context.consume_bridge_messages(rx).await;
    Ok(())
}

/// Spawn the backend runtime on its own thread and begin processing bridge
/// requests. The thread ends when the frontend drops its request sender.
pub fn run(
    config: Config,
    location: StorageLocation,
    rx: Receiver<BridgeRequest>,
    tx: Sender<MessageFromBackend>,
) -> thread::JoinHandle<Result<(), RuntimeError>> {
    thread::spawn(move || {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()?;
        let result = runtime.block_on(setup_backend(config, location, rx, tx));
        if let Err(err) = &result {
            log::error!("Backend stopped: {err}");
        }
        result
    })
}
