//! Configuration types for tfv.
//!
//! [`Config::load`] reads `~/.config/tfv/config.toml`, creating it with
//! hardcoded defaults if it does not yet exist, then applies `TFV__*`
//! environment overrides (`TFV__STORE__PATH=/tmp/logs.db`).
//! [`Config::defaults`] returns the same defaults without touching the
//! filesystem (useful in tests).

use serde::Deserialize;
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Embedded defaults
// ---------------------------------------------------------------------------

const DEFAULT_CONFIG: &str = r#"
[store]
path            = "data/terraform_logs.db"
busy_timeout_ms = 5000

[search]
full_text     = true
default_limit = 100
max_limit     = 1000

[ingest]
delete_source = true
"#;

// ---------------------------------------------------------------------------
// Public config types
// ---------------------------------------------------------------------------

/// Top-level application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
}

/// `[store]` section of `config.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// SQLite database file; `:memory:` opens a private in-memory store.
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

fn default_store_path() -> PathBuf { PathBuf::from("data/terraform_logs.db") }
fn default_busy_timeout_ms() -> u64 { 5_000 }

impl StoreConfig {
    pub fn in_memory() -> Self {
        Self {
            path: PathBuf::from(":memory:"),
            ..Self::default()
        }
    }

    pub fn is_in_memory(&self) -> bool {
        self.path == Path::new(":memory:")
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }
}

/// `[search]` section of `config.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchConfig {
    /// Build the FTS5 index. When false the search layer starts degraded.
    #[serde(default = "default_full_text")]
    pub full_text: bool,
    #[serde(default = "default_limit")]
    pub default_limit: usize,
    #[serde(default = "default_max_limit")]
    pub max_limit: usize,
}

fn default_full_text() -> bool { true }
fn default_limit() -> usize { 100 }
fn default_max_limit() -> usize { 1_000 }

impl SearchConfig {
    /// Clamp a caller-supplied limit into `1..=max_limit`.
    pub fn clamp_limit(&self, limit: usize) -> usize {
        limit.clamp(1, self.max_limit.max(1))
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            full_text: default_full_text(),
            default_limit: default_limit(),
            max_limit: default_max_limit(),
        }
    }
}

/// `[ingest]` section of `config.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct IngestConfig {
    /// Remove uploaded files once processed, on success and on failure.
    #[serde(default = "default_delete_source")]
    pub delete_source: bool,
}

fn default_delete_source() -> bool { true }

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            delete_source: default_delete_source(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::defaults()
    }
}

impl Config {
    /// Load from `~/.config/tfv/config.toml`, layered on top of the built-in
    /// defaults. Creates the file with defaults if it does not exist.
    pub fn load() -> crate::Result<Self> {
        let path = config_path();

        if !path.exists() {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&path, DEFAULT_CONFIG.trim_start())?;
        }

        Self::load_from(&path)
    }

    /// Load an explicit file on top of the built-in defaults. A missing file
    /// is not an error.
    pub fn load_from(path: &Path) -> crate::Result<Self> {
        config::Config::builder()
            .add_source(config::File::from_str(DEFAULT_CONFIG, config::FileFormat::Toml))
            .add_source(config::File::from(path).required(false))
            .add_source(config::Environment::with_prefix("TFV").separator("__"))
            .build()?
            .try_deserialize()
            .map_err(Into::into)
    }

    /// Return the built-in defaults without touching the filesystem.
    pub fn defaults() -> Self {
        config::Config::builder()
            .add_source(config::File::from_str(DEFAULT_CONFIG, config::FileFormat::Toml))
            .build()
            .expect("built-in default config must be valid TOML")
            .try_deserialize()
            .expect("built-in default config must deserialize correctly")
    }
}

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

fn config_path() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".to_string()))
                .join(".config")
        })
        .join("tfv")
        .join("config.toml")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
