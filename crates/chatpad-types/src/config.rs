use serde::{Deserialize, Serialize};

/// Storage key of the persisted conversation log
pub const CONVERSATION_LOG_KEY: &str = "conversation-log";
/// Storage key of the persisted generation settings
pub const SETTINGS_KEY: &str = "conversation-settings";
/// Storage key of the notebook document body
pub const NOTEBOOK_KEY: &str = "notebook-content";
/// Storage key of an optional `AppConfig` override, read at startup
pub const APP_CONFIG_KEY: &str = "chatpad-config";

/// Top-level application configuration. Missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub completion: CompletionConfig,
    pub storage: StorageConfig,
    /// Number of most recent messages replayed as context
    pub context_window: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            completion: CompletionConfig::default(),
            storage: StorageConfig::default(),
            context_window: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompletionConfig {
    pub base_url: String,
    pub timeout_ms: u32,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            base_url: "https://text.pollinations.ai".to_string(),
            timeout_ms: 60_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackendType,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackendType::Auto,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StorageBackendType {
    /// localStorage when available, memory otherwise
    Auto,
    LocalStorage,
    Memory,
}
