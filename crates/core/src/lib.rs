//! Core types and shared functionality for the feedback board.
//!
//! This crate provides:
//! - Unified error taxonomy
//! - Layered client configuration
//! - Canonical review records

pub mod config;
pub mod error;
pub mod model;

pub use config::{ClientConfig, ConfigError};
pub use error::{Error, ErrorKind};
pub use model::{MetaSummary, NormalizedItem, ReviewPage};
