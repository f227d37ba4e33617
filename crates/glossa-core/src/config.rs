use serde::{Deserialize, Serialize};

use std::future::Future;
use std::path::Path;
use std::path::PathBuf;

use crate::error::ConfigError;
use crate::trigger::{Keymap, TriggerMode};
use crate::types::MatchMode;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// How resolved technical terms are matched in mark mode.
    pub technical_match: MatchMode,
    /// How the selected span is matched in translate mode.
    pub translate_match: MatchMode,
    /// Refuse to mark terms until the reader has entered a topic.
    pub require_topic: bool,
    /// Trigger chords.
    pub keymap: Keymap,
}

impl EngineConfig {
    /// Loads the configuration from the provided loader.
    pub async fn load(loader: &impl Loader) -> Result<Self, ConfigError> {
        loader.load().await
    }

    /// Saves the configuration using the provided saver.
    pub async fn save(&self, saver: &impl Saver) -> Result<(), ConfigError> {
        saver.save(self).await
    }

    /// Match mode used by a trigger mode.
    pub fn match_mode(&self, mode: TriggerMode) -> MatchMode {
        match mode {
            TriggerMode::Mark => self.technical_match,
            TriggerMode::Translate => self.translate_match,
        }
    }
}

impl Default for EngineConfig {
    /// Technical terms match on word boundaries; free spans match anywhere.
    fn default() -> Self {
        Self {
            technical_match: MatchMode::WordBounded,
            translate_match: MatchMode::Substring,
            require_topic: false,
            keymap: Keymap::default(),
        }
    }
}

/// The trait for loading configuration data.
pub trait Loader {
    /// Loads the configuration data.
    fn load(&self) -> impl Future<Output = Result<EngineConfig, ConfigError>> + Send;
}

/// The trait for saving configuration data.
pub trait Saver {
    /// Saves the configuration data.
    fn save(&self, config: &EngineConfig) -> impl Future<Output = Result<(), ConfigError>> + Send;
}

/// An implementation of [`Loader`] and [`Saver`] that reads and writes a configuration file.
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    /// Create a new [`FileStore`] with the given path.
    ///
    /// The format follows the file extension: `.json` or `.toml`.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    fn extension(&self) -> Option<&str> {
        self.path.extension().and_then(|ext| ext.to_str())
    }
}

impl Loader for FileStore {
    async fn load(&self) -> Result<EngineConfig, ConfigError> {
        let config: EngineConfig = match self.extension() {
            Some("json") => serde_json::from_str(&std::fs::read_to_string(&self.path)?)?,
            Some("toml") => toml::from_str(&std::fs::read_to_string(&self.path)?)?,
            other => return Err(ConfigError::UnsupportedFormat(other.unwrap_or("").to_string())),
        };
        tracing::debug!(path = %self.path.display(), "loaded config");
        Ok(config)
    }
}

impl Saver for FileStore {
    async fn save(&self, config: &EngineConfig) -> Result<(), ConfigError> {
        match self.extension() {
            Some("json") => std::fs::write(&self.path, serde_json::to_string_pretty(config)?)?,
            Some("toml") => std::fs::write(&self.path, toml::to_string_pretty(config)?)?,
            other => return Err(ConfigError::UnsupportedFormat(other.unwrap_or("").to_string())),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trigger::{Key, KeyCombo, Modifiers};

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("glossa-{}-{name}", std::process::id()))
    }

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.match_mode(TriggerMode::Mark), MatchMode::WordBounded);
        assert_eq!(config.match_mode(TriggerMode::Translate), MatchMode::Substring);
        assert!(!config.require_topic);
    }

    #[test]
    fn test_partial_toml() {
        let config: EngineConfig = toml::from_str(
            r#"
            require_topic = true
            translate_match = "word-bounded"

            [keymap]
            mark = "Alt+M"
            "#,
        )
        .unwrap();
        assert!(config.require_topic);
        assert_eq!(config.translate_match, MatchMode::WordBounded);
        assert_eq!(
            config.keymap.mark,
            KeyCombo::with_modifiers(Key::character("m"), Modifiers::ALT)
        );
        assert_eq!(config.keymap.translate, Keymap::default().translate);
    }

    #[tokio::test]
    async fn test_file_store_round_trip() {
        for ext in ["json", "toml"] {
            let path = temp_path(&format!("config.{ext}"));
            let store = FileStore::new(&path);
            let config = EngineConfig {
                require_topic: true,
                ..Default::default()
            };
            config.save(&store).await.unwrap();
            let loaded = EngineConfig::load(&store).await.unwrap();
            assert_eq!(loaded, config);
            let _ = std::fs::remove_file(&path);
        }
    }

    #[tokio::test]
    async fn test_unsupported_format() {
        let store = FileStore::new(temp_path("config.yaml"));
        let err = EngineConfig::load(&store).await.unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedFormat(ext) if ext == "yaml"));
    }
}
