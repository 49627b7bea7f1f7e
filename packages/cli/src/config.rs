use livepage_editor::EditorConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_NAME: &str = "livepage.config.json";

/// Livepage configuration file format
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Editor behavior
    #[serde(default)]
    pub editor: EditorConfig,

    /// Port `livepage serve` listens on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Directory the record store writes into
    #[serde(default = "default_store_dir")]
    pub store_dir: String,
}

fn default_port() -> u16 {
    3030
}

fn default_store_dir() -> String {
    ".livepage".to_string()
}

impl Config {
    /// Load config from a directory
    pub fn load(cwd: &str) -> anyhow::Result<Self> {
        let config_path = PathBuf::from(cwd).join(DEFAULT_CONFIG_NAME);

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = serde_json::from_str(&content)?;
            Ok(config)
        } else {
            // Return default config if none exists
            Ok(Config::default())
        }
    }

    /// Store directory, resolved against the directory holding the page
    pub fn get_store_dir(&self, page_dir: &Path) -> PathBuf {
        page_dir.join(&self.store_dir)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            editor: EditorConfig::default(),
            port: default_port(),
            store_dir: default_store_dir(),
        }
    }
}
