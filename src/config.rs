//! Configuration file loading

use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::models::config::ServerConfig;

/// `$XDG_CONFIG_HOME/schemals/config.toml`, falling back to `~/.config`
pub fn default_config_path() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .ok()
        .or_else(dirs::config_dir)
        .or_else(|| dirs::home_dir().map(|h| h.join(".config")))
        .unwrap_or_else(|| PathBuf::from("."))
        .join("schemals")
        .join("config.toml")
}

/// Load the configuration
///
/// An explicit `path` must exist. Without one the default location is read
/// if present, otherwise built-in defaults apply.
pub async fn load(path: Option<&Path>) -> Result<ServerConfig, ConfigError> {
    match path {
        Some(path) => {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            load_from_path(path).await
        }
        None => {
            let path = default_config_path();
            if !path.exists() {
                tracing::debug!("No config at {}, using defaults", path.display());
                return Ok(ServerConfig::default());
            }
            load_from_path(&path).await
        }
    }
}

async fn load_from_path(path: &Path) -> Result<ServerConfig, ConfigError> {
    let content = tokio::fs::read_to_string(path).await?;
    let config = toml::from_str(&content)
        .map_err(|e| ConfigError::Parse(format!("{}: {}", path.display(), e)))?;
    tracing::debug!("Loaded config from {}", path.display());
    Ok(config)
}

pub fn to_toml(config: &ServerConfig) -> Result<String, ConfigError> {
    toml::to_string_pretty(config).map_err(|e| ConfigError::Serialize(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn test_explicit_file_is_loaded() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[server]\naddress = \"127.0.0.1:4389\"\n\n[readiness]\nmax_attempts = 5"
        )
        .unwrap();

        let config = load(Some(file.path())).await.unwrap();
        assert_eq!(config.server.address.as_deref(), Some("127.0.0.1:4389"));
        assert_eq!(config.readiness.max_attempts, 5);
        assert_eq!(config.readiness.interval_ms, 100);
    }

    #[tokio::test]
    async fn test_explicit_missing_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(matches!(
            load(Some(&missing)).await,
            Err(ConfigError::NotFound(p)) if p == missing
        ));
    }

    #[tokio::test]
    async fn test_invalid_toml_names_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[readiness\nmax_attempts = ").unwrap();

        let err = load(Some(file.path())).await.unwrap_err();
        assert!(matches!(err, ConfigError::Parse(ref m) if m.contains(&file.path().display().to_string())));
    }

    #[test]
    fn test_toml_output_round_trips() {
        let mut config = ServerConfig::default();
        config.schema.path = Some(PathBuf::from("/etc/schemals/core.toml"));

        let text = to_toml(&config).unwrap();
        assert!(text.contains("[readiness]"));
        let parsed: ServerConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed.schema.path, config.schema.path);
    }

    #[test]
    fn test_default_path_file_name() {
        let path = default_config_path();
        assert!(path.ends_with("schemals/config.toml"));
    }
}
