//! Error types for the bot.
//!
//! `AppError` is the top-level error type aggregating infrastructure failures
//! (database, Discord API, scheduler, voice). Domain-specific errors such as
//! track resolution failures live next to their subsystem and convert into
//! `AppError` at the boundary.

use thiserror::Error;

use crate::music::MusicError;

/// Configuration error during startup or config file handling.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A required environment variable is not set.
    #[error("missing environment variable: {0}")]
    MissingEnvVar(String),

    /// An environment variable is set but could not be parsed.
    #[error("invalid value for environment variable {name}: {value}")]
    InvalidEnvVar { name: String, value: String },

    /// Failed to read or write the leveling config file.
    #[error("failed to access config file: {0}")]
    Io(#[from] std::io::Error),

    /// The leveling config file contains malformed JSON.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Top-level application error type.
///
/// Aggregates all error types that can occur in the application. Most variants
/// use `#[from]` for automatic conversion.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration error during startup or config mutation.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Database operation error from SeaORM.
    #[error(transparent)]
    Db(#[from] sea_orm::DbErr),

    /// Discord API error from Serenity.
    ///
    /// Boxed because `serenity::Error` is large and would inflate every
    /// `AppError` variant otherwise.
    #[error(transparent)]
    Discord(#[from] Box<serenity::Error>),

    /// Cron scheduler error.
    #[error(transparent)]
    Scheduler(#[from] tokio_cron_scheduler::JobSchedulerError),

    /// Music subsystem error (resolution, voice join, playback).
    #[error(transparent)]
    Music(#[from] MusicError),
}

impl From<serenity::Error> for AppError {
    fn from(err: serenity::Error) -> Self {
        AppError::Discord(Box::new(err))
    }
}
