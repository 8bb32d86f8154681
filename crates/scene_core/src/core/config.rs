//! # Unified Configuration System
//!
//! Configuration types for the object model: logging, serializer output and
//! event dispatch. Every type is serde-serializable and defaults to sensible
//! values, so a partial config file only needs the keys it changes.
//!
//! ## Configuration Categories
//!
//! - **Serialization Config**: JSON output formatting
//! - **Event Config**: audio graph notifications and dispatch tracing
//! - **Scene Config**: top-level container, also holds the log level

use serde::{Deserialize, Serialize};

pub use crate::config::{Config, ConfigError};

/// # Serialization Configuration
///
/// Controls how documents are rendered to text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerializationConfig {
    /// Pretty-print JSON with indentation
    pub pretty: bool,
}

impl SerializationConfig {
    /// Create the default serialization configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Set pretty printing
    #[must_use]
    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }
}

impl Default for SerializationConfig {
    fn default() -> Self {
        Self { pretty: true }
    }
}

/// # Event Configuration
///
/// Controls optional notifications emitted by the node graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventConfig {
    /// Broadcast audio child append/remove events for the listened graph
    pub audio_graph_events: bool,
    /// Trace-log every event delivery
    pub trace_dispatch: bool,
}

impl EventConfig {
    /// Create the default event configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable audio graph events
    #[must_use]
    pub fn with_audio_graph_events(mut self, enabled: bool) -> Self {
        self.audio_graph_events = enabled;
        self
    }

    /// Enable or disable dispatch tracing
    #[must_use]
    pub fn with_trace_dispatch(mut self, enabled: bool) -> Self {
        self.trace_dispatch = enabled;
        self
    }
}

impl Default for EventConfig {
    fn default() -> Self {
        Self {
            audio_graph_events: true,
            trace_dispatch: false,
        }
    }
}

/// # Scene Configuration
///
/// Top-level configuration loaded by tools and applications.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    /// Log filter, e.g. `"info"` or `"scene_core=debug"`
    pub log_level: String,
    /// Serializer output settings
    pub serialization: SerializationConfig,
    /// Node graph event settings
    pub events: EventConfig,
}

impl SceneConfig {
    /// Create the default scene configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the log filter
    #[must_use]
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Set the serializer settings
    #[must_use]
    pub fn with_serialization(mut self, serialization: SerializationConfig) -> Self {
        self.serialization = serialization;
        self
    }

    /// Set the event settings
    #[must_use]
    pub fn with_events(mut self, events: EventConfig) -> Self {
        self.events = events;
        self
    }

    /// Validate configuration
    ///
    /// Only the leading directive of the log filter is checked, module
    /// directives such as `scene_core=debug` are accepted as is.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let level = self.log_level.split(',').next().unwrap_or_default();
        if level.contains('=') || crate::foundation::logging::parse_level(level).is_some() {
            Ok(())
        } else {
            Err(ConfigError::Invalid(format!("unknown log level `{}`", self.log_level)))
        }
    }
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            serialization: SerializationConfig::default(),
            events: EventConfig::default(),
        }
    }
}

impl Config for SceneConfig {}
