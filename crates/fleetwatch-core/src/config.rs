//! Configuration loading and typed config structures for the viewer.
//!
//! The canonical configuration lives in `fleetwatch-config.yaml` at the
//! project root. This module defines strongly-typed structs that mirror the
//! YAML structure, and provides a loader that reads and validates the file.
//! Every field has a default, so an empty file is a valid configuration.

use std::path::Path;

use fleetwatch_types::DateContext;
use serde::Deserialize;

use crate::selection::SelectionPolicy;

/// Environment variable that replaces `source.endpoint_url`.
pub const ENV_SOURCE_URL: &str = "FLEETWATCH_SOURCE_URL";

/// Environment variable that replaces `view.port`.
pub const ENV_VIEW_PORT: &str = "FLEETWATCH_VIEW_PORT";

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// A value parsed but is unusable.
    #[error("invalid config value for {field}: {reason}")]
    Invalid {
        /// Dotted path of the offending field.
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level viewer configuration.
///
/// Mirrors the structure of `fleetwatch-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ViewerConfig {
    /// Position backend settings.
    #[serde(default)]
    pub source: SourceConfig,

    /// Frame pacing.
    #[serde(default)]
    pub animation: AnimationConfig,

    /// Click behaviour.
    #[serde(default)]
    pub selection: SelectionConfig,

    /// HTTP view surface.
    #[serde(default)]
    pub view: ViewConfig,
}

impl ViewerConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// Environment variables override YAML values:
    /// - `FLEETWATCH_SOURCE_URL` overrides `source.endpoint_url`
    /// - `FLEETWATCH_VIEW_PORT` overrides `view.port`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if the content is not valid YAML, or
    /// [`ConfigError::Invalid`] if a value fails validation.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML, or
    /// [`ConfigError::Invalid`] if a value fails validation.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Self = serde_yml::from_str(yaml)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Override fields with environment variables when set.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary key lookup.
    ///
    /// An unparseable port is ignored and the configured one kept.
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_SOURCE_URL) {
            self.source.endpoint_url = url;
        }
        if let Some(port) = lookup(ENV_VIEW_PORT) {
            match port.parse::<u16>() {
                Ok(port) => self.view.port = port,
                Err(e) => {
                    tracing::warn!(value = %port, error = %e, "ignoring unparseable {ENV_VIEW_PORT}");
                }
            }
        }
    }

    /// Check cross-field constraints.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for an empty endpoint URL, a zero
    /// poll or frame interval, or a frame interval longer than the poll
    /// interval.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.source.endpoint_url.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "source.endpoint_url",
                reason: "must not be empty".to_owned(),
            });
        }
        if self.source.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "source.poll_interval_ms",
                reason: "must be positive".to_owned(),
            });
        }
        if self.animation.frame_interval_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "animation.frame_interval_ms",
                reason: "must be positive".to_owned(),
            });
        }
        if self.animation.frame_interval_ms > self.source.poll_interval_ms {
            return Err(ConfigError::Invalid {
                field: "animation.frame_interval_ms",
                reason: format!(
                    "{} ms exceeds the poll interval of {} ms",
                    self.animation.frame_interval_ms, self.source.poll_interval_ms
                ),
            });
        }
        Ok(())
    }
}

/// Position backend configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SourceConfig {
    /// URL returning the fleet as a JSON array.
    #[serde(default = "default_endpoint_url")]
    pub endpoint_url: String,

    /// Milliseconds between polls.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Per-request timeout in milliseconds.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Replay this JSON script instead of polling `endpoint_url`.
    #[serde(default)]
    pub script_path: Option<String>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            endpoint_url: default_endpoint_url(),
            poll_interval_ms: default_poll_interval_ms(),
            request_timeout_ms: default_request_timeout_ms(),
            script_path: None,
        }
    }
}

/// Frame pacing configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AnimationConfig {
    /// Milliseconds between rendered frames.
    #[serde(default = "default_frame_interval_ms")]
    pub frame_interval_ms: u64,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            frame_interval_ms: default_frame_interval_ms(),
        }
    }
}

/// Click behaviour configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SelectionConfig {
    /// Whether clicks also toggle pause.
    #[serde(default)]
    pub policy: SelectionPolicy,
}

/// HTTP view surface configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ViewConfig {
    /// Interface to bind.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Whether frames carry a camera centre.
    #[serde(default = "default_true")]
    pub camera_follow: bool,

    /// Date context at session start.
    #[serde(default)]
    pub initial_date: DateContext,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            camera_follow: default_true(),
            initial_date: DateContext::default(),
        }
    }
}

fn default_endpoint_url() -> String {
    "https://vehicle-movement-backend-xzuu.onrender.com/api/positions".to_owned()
}

const fn default_poll_interval_ms() -> u64 {
    2000
}

const fn default_request_timeout_ms() -> u64 {
    5000
}

const fn default_frame_interval_ms() -> u64 {
    16
}

fn default_host() -> String {
    "0.0.0.0".to_owned()
}

const fn default_port() -> u16 {
    8080
}

const fn default_true() -> bool {
    true
}
