//! Editor configuration.
//!
//! Settings a host application can serialize, tweak, and hand back to
//! the session. Defaults match the built-in constants.

use serde::{Deserialize, Serialize};

use crate::constants::{detect, history, media};

/// Log level setting for the editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Show only errors
    Error,
    /// Show errors and warnings
    Warn,
    /// Show errors, warnings, and info messages
    #[default]
    Info,
    /// Show debug-level logging
    Debug,
    /// Show all log messages including trace
    Trace,
}

impl LogLevel {
    /// Get the display name for this log level.
    pub fn name(&self) -> &'static str {
        match self {
            LogLevel::Error => "Error",
            LogLevel::Warn => "Warn",
            LogLevel::Info => "Info",
            LogLevel::Debug => "Debug",
            LogLevel::Trace => "Trace",
        }
    }

    /// Convert to log crate's LevelFilter.
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Session configuration that can be exported and imported.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditorConfig {
    /// Maximum snapshots kept per image history
    #[serde(default = "default_max_history")]
    pub max_history: usize,

    /// Maximum images sent in one batch detection request
    #[serde(default = "default_max_batch_images")]
    pub max_batch_images: usize,

    /// Default detection model identifier
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Default detection confidence threshold
    #[serde(default = "default_confidence")]
    pub default_confidence: f32,

    /// Log verbosity level
    #[serde(default)]
    pub log_level: LogLevel,
}

fn default_max_history() -> usize {
    history::MAX_SNAPSHOTS
}

fn default_max_batch_images() -> usize {
    media::MAX_BATCH_IMAGES
}

fn default_model() -> String {
    detect::DEFAULT_MODEL.to_string()
}

fn default_confidence() -> f32 {
    detect::DEFAULT_CONFIDENCE
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            max_history: default_max_history(),
            max_batch_images: default_max_batch_images(),
            default_model: default_model(),
            default_confidence: default_confidence(),
            log_level: LogLevel::default(),
        }
    }
}

impl EditorConfig {
    /// Serialize to pretty JSON for a settings file.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Parse from a settings file body.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
