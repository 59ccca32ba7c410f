//! Core types and shared functionality for rebrowse.
//!
//! This crate provides:
//! - Unified error types
//! - Configuration structures
//! - Domain types (resource locators, result records)
//! - Observable state values

pub mod config;
pub mod error;
pub mod hash;
pub mod locator;
pub mod published;
pub mod record;

pub use config::{AppConfig, ConfigError};
pub use error::Error;
pub use locator::ResourceLocator;
pub use published::Published;
pub use record::ResultRecord;
