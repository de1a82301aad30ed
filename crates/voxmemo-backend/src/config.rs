use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use tokio::{
    fs::{OpenOptions, create_dir_all, read_to_string},
    io::AsyncWriteExt,
};
use voxmemo_bridge::config::Config;

/// Environment variable that overrides the configured API key.
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Errors that can occur while loading or resolving application configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to determine the user's configuration or data directories. This
    /// usually occurs when required environment variables are missing (e.g.,
    /// `$HOME` on Unix or `%APPDATA%` on Windows).
    #[error("failed to obtain user's directories")]
    DirectoriesNotFound,
    /// An I/O error occurred while reading or writing the configuration file.
    #[error("failed to read config: {0}")]
    IoError(#[from] std::io::Error),
    /// The configuration file contains invalid TOML or does not match the expected structure.
    #[error("failed to deserialize config: {0}")]
    DeserializeError(#[from] toml::de::Error),
    /// Failed to serialize the configuration to TOML (e.g., when saving changes).
    #[error("failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),
}

/// Resolved locations of the configuration file and the memo data.
#[derive(Debug, Clone)]
pub struct ConfigPaths {
    pub config_file: PathBuf,
    pub data_dir: PathBuf,
}

fn build_project_dirs() -> Result<ConfigPaths, ConfigError> {
    match ProjectDirs::from("dev", "voxmemo", "voxmemo") {
        Some(path) => Ok(ConfigPaths {
            config_file: path.config_dir().join("config.toml"),
            data_dir: path.data_dir().to_path_buf(),
        }),
        None => Err(ConfigError::DirectoriesNotFound),
    }
}

/// Applies environment overrides on top of the file contents.
fn apply_env(mut config: Config, api_key: Option<String>) -> Config {
    if let Some(key) = api_key.filter(|key| !key.trim().is_empty()) {
        config.api_key = Some(key);
    }
    config
}

/// Loads the configuration from the given file, writing the defaults there
/// first if it does not exist yet.
pub async fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    log::info!("Loading configuration from {path:?}");
    if path.exists() {
        let contents = read_to_string(path).await?;
        let config: Config = toml::from_str(&contents)?;
        return Ok(apply_env(config, std::env::var(API_KEY_ENV).ok()));
    }

    let config = Config::default();
    if let Some(parent) = path.parent() {
        create_dir_all(parent).await?;
    }

    let contents = toml::to_string_pretty(&config)?;
    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await?;
    file.write_all(contents.as_bytes()).await?;
    file.sync_all().await?;

    Ok(apply_env(config, std::env::var(API_KEY_ENV).ok()))
}

/// Loads the application configuration from the user's config directory.
/// Returns the loaded config, as well as the directory memos are stored in.
pub async fn load_config() -> Result<(Config, PathBuf), ConfigError> {
    let paths = build_project_dirs()?;
    let config = load_config_from(&paths.config_file).await?;
    let data_dir = config.data_dir.clone().unwrap_or(paths.data_dir);
    Ok((config, data_dir))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    #[tokio::test]
    async fn first_load_writes_defaults() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("nested").join("config.toml");
        let config = load_config_from(&path).await.unwrap();
        assert!(path.exists());
        assert_eq!(config.max_audio_bytes, Config::default().max_audio_bytes);
    }

    #[tokio::test]
    async fn existing_file_is_not_overwritten() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("config.toml");
        let mut config = Config::default();
        config.request_timeout_secs = 12;
        config.generate_names = true;
        tokio::fs::write(&path, toml::to_string_pretty(&config).unwrap())
            .await
            .unwrap();

        let loaded = load_config_from(&path).await.unwrap();
        assert_eq!(loaded.request_timeout_secs, 12);
        assert!(loaded.generate_names);
    }

    #[test]
    fn environment_key_wins_over_file_key() {
        let config = Config {
            api_key: Some("from-file".into()),
            ..Config::default()
        };
        assert_eq!(
            apply_env(config.clone(), Some("from-env".into())).api_key,
            Some("from-env".into())
        );
        assert_eq!(
            apply_env(config, Some("  ".into())).api_key,
            Some("from-file".into())
        );
    }
}
