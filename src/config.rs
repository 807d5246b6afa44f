use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_theme")]
    pub theme: String,
    /// Marker drawn in checked rows, e.g. `[*]`.
    #[serde(default = "default_checked_char")]
    pub checked_char: char,
    /// App to preselect at startup, if present in the dataset.
    #[serde(default)]
    pub start_app: Option<String>,
}

fn default_theme() -> String {
    "terminal-dark".to_string()
}
fn default_checked_char() -> char {
    '*'
}

impl Default for Config {
    fn default() -> Self {
        Self {
            theme: default_theme(),
            checked_char: default_checked_char(),
            start_app: None,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = fs::read_to_string(path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path())
    }

    fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("recdeck")
            .join("config.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_from_empty_file() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.theme, "terminal-dark");
        assert_eq!(config.checked_char, '*');
        assert_eq!(config.start_app, None);
    }

    #[test]
    fn partial_file_keeps_defaults_for_the_rest() {
        let config: Config = toml::from_str("theme = \"gruvbox\"").unwrap();
        assert_eq!(config.theme, "gruvbox");
        assert_eq!(config.checked_char, '*');
    }

    #[test]
    fn save_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.theme = "gruvbox".to_string();
        config.start_app = Some("crm".to_string());
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.theme, "gruvbox");
        assert_eq!(loaded.start_app.as_deref(), Some("crm"));
    }

    #[test]
    fn missing_file_loads_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = Config::load_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(loaded.theme, "terminal-dark");
    }
}
