//! Configuration file and store factory.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use pathwise_core::progression::UnlockPolicy;
use pathwise_core::scoring::ScoringConfig;
use pathwise_core::traits::ProgressStore;

use crate::json_store::JsonFileStore;
use crate::memory::MemoryStore;

/// Where learner progress is persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StoreConfig {
    /// One JSON file per learner in `dir`.
    Json {
        #[serde(default = "default_state_dir")]
        dir: PathBuf,
    },
    /// Nothing survives the process.
    Memory,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig::Json {
            dir: default_state_dir(),
        }
    }
}

fn default_state_dir() -> PathBuf {
    PathBuf::from(".pathwise/progress")
}

fn default_content() -> PathBuf {
    PathBuf::from("content")
}

/// Top-level pathwise configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathwiseConfig {
    /// Content file or directory.
    #[serde(default = "default_content")]
    pub content: PathBuf,
    /// How lessons unlock.
    #[serde(default)]
    pub unlock_policy: UnlockPolicy,
    #[serde(default)]
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub store: StoreConfig,
}

impl Default for PathwiseConfig {
    fn default() -> Self {
        Self {
            content: default_content(),
            unlock_policy: UnlockPolicy::default(),
            scoring: ScoringConfig::default(),
            store: StoreConfig::default(),
        }
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
///
/// Unset variables resolve to the empty string.
pub fn resolve_env_vars(s: &str) -> String {
    let mut result = s.to_string();
    let mut from = 0;
    while let Some(offset) = result[from..].find("${") {
        let start = from + offset;
        let Some(end) = result[start..].find('}') else {
            break;
        };
        let var_name = &result[start + 2..start + end];
        let value = std::env::var(var_name).unwrap_or_default();
        result = format!("{}{}{}", &result[..start], value, &result[start + end + 1..]);
        from = start + value.len();
    }
    result
}

fn resolve_path(path: &Path) -> PathBuf {
    PathBuf::from(resolve_env_vars(&path.to_string_lossy()))
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `pathwise.toml` in the current directory
/// 2. `~/.config/pathwise/config.toml`
///
/// Environment variable overrides: `PATHWISE_CONTENT`, `PATHWISE_STATE_DIR`.
pub fn load_config() -> Result<PathwiseConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<PathwiseConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from("pathwise.toml");
        if local.exists() {
            Some(local)
        } else {
            dirs_path()
                .map(|home| home.join("config.toml"))
                .filter(|global| global.exists())
        }
    };

    let mut config = match config_path {
        Some(path) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            let config = toml::from_str::<PathwiseConfig>(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?;
            tracing::debug!("loaded config from {}", path.display());
            config
        }
        None => PathwiseConfig::default(),
    };

    // Apply env var overrides
    if let Ok(content) = std::env::var("PATHWISE_CONTENT") {
        config.content = PathBuf::from(content);
    }
    if let Ok(dir) = std::env::var("PATHWISE_STATE_DIR") {
        config.store = StoreConfig::Json {
            dir: PathBuf::from(dir),
        };
    }

    // Resolve env vars in paths
    config.content = resolve_path(&config.content);
    if let StoreConfig::Json { dir } = &mut config.store {
        *dir = resolve_path(dir);
    }

    Ok(config)
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("pathwise"))
}

/// Create a progress store from its configuration.
pub fn create_store(config: &StoreConfig) -> Arc<dyn ProgressStore> {
    match config {
        StoreConfig::Json { dir } => Arc::new(JsonFileStore::new(dir.clone())),
        StoreConfig::Memory => Arc::new(MemoryStore::new()),
    }
}

/// Starter config written by `pathwise init`.
pub const STARTER_CONFIG: &str = r#"# pathwise configuration

# Lesson content: a .json/.toml/.md file or a directory of them.
content = "content"

# "linear": one lesson at a time, one Path at a time. "open": free navigation.
unlock_policy = "linear"

[scoring]
case_insensitive = false
pass_threshold = 70

[store]
type = "json"
dir = ".pathwise/progress"
"#;
