use serde::{Deserialize, Serialize};

/// Configuration from .padd/config.toml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaddConfig {
    pub profile: ProfileConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub autosave: AutoSaveConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileConfig {
    /// Owner id every fetched and inserted row is scoped to
    pub owner: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Store file, relative to the .padd directory
    #[serde(default = "default_store_file")]
    pub file: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            file: default_store_file(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutoSaveConfig {
    /// Quiet period before a task's queued edits are written
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

impl Default for AutoSaveConfig {
    fn default() -> Self {
        AutoSaveConfig {
            debounce_ms: default_debounce_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// tracing filter directive used when PADD_LOG is unset
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig {
            level: default_log_level(),
        }
    }
}

fn default_store_file() -> String {
    "tasks.json".to_string()
}

fn default_debounce_ms() -> u64 {
    800
}

fn default_log_level() -> String {
    "warn".to_string()
}
