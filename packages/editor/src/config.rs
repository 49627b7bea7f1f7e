//! Editor tuning knobs

use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EditorConfig {
    /// Quiet period before a burst of changes is persisted
    pub debounce_ms: u64,

    /// Maximum undo levels (0 = unlimited)
    pub history_depth: usize,

    /// Record store key the document is saved under
    pub store_key: String,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 1500,
            history_depth: 100,
            store_key: "page".to_string(),
        }
    }
}

impl EditorConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EditorConfig::default();
        assert_eq!(config.debounce(), Duration::from_millis(1500));
        assert_eq!(config.history_depth, 100);
        assert_eq!(config.store_key, "page");
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: EditorConfig = serde_json::from_str(r#"{"debounceMs": 250}"#).unwrap();
        assert_eq!(config.debounce_ms, 250);
        assert_eq!(config.store_key, "page");
    }
}
