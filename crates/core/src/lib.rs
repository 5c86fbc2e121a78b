//! Conjure Core Library
//!
//! This crate provides the foundational utilities for the conjure CLI:
//! - Error handling (`AppError`, `AppResult`)
//! - Logging infrastructure
//! - Configuration management

pub mod config;
pub mod error;
pub mod logging;

// Re-export commonly used types
pub use config::{
    AppConfig, AssistantConfig, AssistantProvider, ConfigOverrides, MissingContextPolicy,
};
pub use error::{AppError, AppResult};
