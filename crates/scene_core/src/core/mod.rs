//! # Core Module
//!
//! Shared configuration types used by the graph, serializer and tools.

pub mod config;

pub use config::{Config, ConfigError, EventConfig, SceneConfig, SerializationConfig};
