//! # hpcat Common Library
//!
//! Shared code for the historical photo cataloger:
//! - Error types
//! - Configuration loading (TOML + environment + CLI overrides)
//! - Legacy text encoding used by the archive's data files
//! - Timestamp formatting for log records

pub mod config;
pub mod encoding;
pub mod error;
pub mod time;

pub use error::{Error, Result};
