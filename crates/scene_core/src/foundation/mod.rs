//! Foundation module - Core utilities and types
//!
//! This module provides fundamental utilities used throughout the crate:
//! - Math types and their mutator/serialization glue
//! - Arena handles for nodes and components
//! - Logging utilities

pub mod math;
pub mod collections;
pub mod logging;
