//! Configuration types for rowmark.
//!
//! [`Config::load`] reads `~/.config/rowmark/config.toml`, creating it with
//! hardcoded defaults if it does not yet exist. [`Config::defaults`] returns
//! the same defaults without touching the filesystem (useful in tests).

use anyhow::Context;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::markers::{is_valid_replacement, DEFAULT_REPLACEMENT};
use crate::session::SessionSettings;
use crate::throttle::ThrottlePolicy;
use crate::transform::RestPolicy;

// ---------------------------------------------------------------------------
// Embedded defaults
// ---------------------------------------------------------------------------

const DEFAULT_CONFIG: &str = r#"
[stream]
notification_delay_ms        = 500
max_postponed_notifications  = 500
rest_on_close                = "discard"
marker_collision_replacement = "�"

[progress]
notification_delay_ms       = 500
max_postponed_notifications = 500
"#;

// ---------------------------------------------------------------------------
// Public config types
// ---------------------------------------------------------------------------

/// Top-level configuration, loaded from `~/.config/rowmark/config.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub stream: StreamConfig,
    #[serde(default)]
    pub progress: ProgressConfig,
}

/// `[stream]` section of `config.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct StreamConfig {
    #[serde(default = "default_delay_ms")]
    pub notification_delay_ms: u64,
    #[serde(default = "default_max_postponed")]
    pub max_postponed_notifications: u32,
    #[serde(default)]
    pub rest_on_close: RestPolicy,
    #[serde(default = "default_replacement")]
    pub marker_collision_replacement: char,
}

/// `[progress]` section of `config.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct ProgressConfig {
    #[serde(default = "default_delay_ms")]
    pub notification_delay_ms: u64,
    #[serde(default = "default_max_postponed")]
    pub max_postponed_notifications: u32,
}

fn default_delay_ms() -> u64 { 500 }
fn default_max_postponed() -> u32 { 500 }
fn default_replacement() -> char { DEFAULT_REPLACEMENT }

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            notification_delay_ms: default_delay_ms(),
            max_postponed_notifications: default_max_postponed(),
            rest_on_close: RestPolicy::default(),
            marker_collision_replacement: default_replacement(),
        }
    }
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            notification_delay_ms: default_delay_ms(),
            max_postponed_notifications: default_max_postponed(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::defaults()
    }
}

impl Config {
    /// Load from `~/.config/rowmark/config.toml`, layered on top of the
    /// built-in defaults. Creates the file with defaults if it does not exist.
    pub fn load() -> anyhow::Result<Self> {
        let path = config_path();

        if !path.exists() {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&path, DEFAULT_CONFIG.trim_start())?;
        }

        Self::load_from(&path)
    }

    /// Load an explicit file on top of the built-in defaults. The file must
    /// exist and its values must pass [`Config::validate`].
    pub fn load_from(path: &std::path::Path) -> anyhow::Result<Self> {
        let cfg: Self = config::Config::builder()
            .add_source(config::File::from_str(DEFAULT_CONFIG, config::FileFormat::Toml))
            .add_source(config::File::from(path).required(true))
            .build()?
            .try_deserialize()?;
        cfg.validate()
            .with_context(|| format!("invalid config {}", path.display()))?;
        Ok(cfg)
    }

    /// Reject values that would corrupt marked output.
    pub fn validate(&self) -> anyhow::Result<()> {
        let replacement = self.stream.marker_collision_replacement;
        if !is_valid_replacement(replacement) {
            anyhow::bail!(
                "stream.marker_collision_replacement {replacement:?} is a marker or line break character"
            );
        }
        Ok(())
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

    /// Settings for new stream sessions.
    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            stream: ThrottlePolicy {
                delay: Duration::from_millis(self.stream.notification_delay_ms),
                max_postponed: self.stream.max_postponed_notifications,
            },
            progress: ThrottlePolicy {
                delay: Duration::from_millis(self.progress.notification_delay_ms),
                max_postponed: self.progress.max_postponed_notifications,
            },
            rest_policy: self.stream.rest_on_close,
            marker_replacement: self.stream.marker_collision_replacement,
        }
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
        .join("rowmark")
        .join("config.toml")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
