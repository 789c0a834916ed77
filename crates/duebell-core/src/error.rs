//! Core error types for duebell-core.
//!
//! This module defines the error hierarchy using thiserror. Only
//! [`ValidationError`] is surfaced synchronously to callers of task
//! create/edit; [`AlertError`] is reported by effect ports and absorbed by the
//! alert driver so that no tick ever fails.

use std::path::PathBuf;

use chrono::NaiveDateTime;
use thiserror::Error;

/// Core error type for duebell-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Task file could not be read or written
    #[error("Storage error at {path}: {message}")]
    Storage { path: PathBuf, message: String },

    /// Referenced task does not exist in the collection
    #[error("Task not found: {id}")]
    TaskNotFound { id: String },

    /// The engine loop has already shut down
    #[error("Countdown engine is no longer running")]
    EngineStopped,

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Validation errors raised before a task is stored.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// End instant earlier than start instant
    #[error("Invalid time range: end ({end}) is earlier than start ({start})")]
    EndBeforeStart {
        start: NaiveDateTime,
        end: NaiveDateTime,
    },

    /// Title is empty or whitespace
    #[error("Task title must not be empty")]
    EmptyTitle,
}

/// Failures reported by the audio and notification effect ports.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertError {
    /// Playback blocked until the user performs an unlocking gesture
    #[error("Audio playback is locked until the user interacts")]
    AudioLocked,

    /// Host has no notification capability
    #[error("System notifications are unavailable")]
    NotificationUnavailable,
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Unknown configuration key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
