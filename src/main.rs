use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use voxmemo_backend::StorageLocation;
use voxmemo_frontend::{BackendBridge, commands};

/// Voice memos, transcribed, translated and summarized by Gemini.
#[derive(Parser)]
#[command(name = "voxmemo", version)]
struct Cli {
    /// Log debug output
    #[arg(short, long)]
    verbose: bool,
    /// Keep memos in memory only
    #[arg(long)]
    ephemeral: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Transcribe an audio file and save it as a new memo
    Record {
        file: PathBuf,
        /// MIME type of the file, guessed from its extension by default
        #[arg(long)]
        mime: Option<String>,
        /// Length of the recording in seconds
        #[arg(long, default_value_t = 0)]
        duration: u64,
        /// Also translate into this language
        #[arg(long)]
        translate: Option<String>,
        /// Also summarize
        #[arg(long)]
        summarize: bool,
    },
    /// List all memos, newest first
    List,
    /// Rename a memo
    Rename { id: String, name: String },
    /// Translate a memo, into the preferred language by default
    Translate { id: String, language: Option<String> },
    /// Summarize a memo
    Summarize { id: String },
    /// Delete a memo
    Delete { id: String },
    /// Delete all memos
    Clear,
    /// Show or set the preferred translation language
    Language { language: Option<String> },
    /// Translate text into the preferred language
    TranslateText { text: String },
}

async fn execute(command: Command, bridge: &BackendBridge) -> anyhow::Result<()> {
    match command {
        Command::Record {
            file,
            mime,
            duration,
            translate,
            summarize,
        } => {
            commands::record(
                bridge,
                commands::RecordOptions {
                    path: file,
                    mime_type: mime,
                    duration_seconds: duration,
                    translate,
                    summarize,
                },
            )
            .await
        }
        Command::List => commands::list(bridge).await,
        Command::Rename { id, name } => commands::rename(bridge, &id, &name).await,
        Command::Translate { id, language } => commands::translate(bridge, &id, language).await,
        Command::Summarize { id } => commands::summarize(bridge, &id).await,
        Command::Delete { id } => commands::delete(bridge, &id).await,
        Command::Clear => commands::clear(bridge).await,
        Command::Language { language } => commands::language(bridge, language).await,
        Command::TranslateText { text } => commands::translate_text(bridge, &text).await,
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    simple_logger::SimpleLogger::new()
        .with_colors(true)
        .with_threads(true)
        .with_local_timestamps()
        .with_level(if cli.verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Warn
        })
        .init()
        .context("failed to build logger instance")?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to build tokio runtime")?;

    let (config, data_dir) = runtime
        .block_on(voxmemo_backend::config::load_config())
        .context("failed to load config")?;
    let location = if cli.ephemeral {
        StorageLocation::Memory
    } else {
        StorageLocation::Directory(data_dir)
    };

    let channels = voxmemo_bridge::BridgeChannels::default();
    let backend = voxmemo_backend::run(
        config.clone(),
        location,
        channels.backend_rx,
        channels.backend_tx,
    );

    let result = runtime.block_on(async move {
        let events = voxmemo_frontend::spawn_event_listener(channels.frontend_rx);
        let bridge = BackendBridge::connect(channels.frontend_tx, &config.messaging);
        let result = execute(cli.command, &bridge).await;

        // Closing the request channel lets the backend finish and hang up.
        drop(bridge);
        let _ = events.await;
        result
    });

    if backend.join().is_err() {
        log::error!("Backend thread panicked");
    }
    result
}
