//! Unified application error type.
//! All modules (db, core, cli, utils) return AppError so that the monitor,
//! the one-shot commands and the tests can match on the same taxonomy.

use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    // ---------------------------
    // IO
    // ---------------------------
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    // ---------------------------
    // Database-related
    // ---------------------------
    #[error("Database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("Database migration error: {0}")]
    Migration(String),

    // ---------------------------
    // Parsing errors
    // ---------------------------
    #[error("Invalid date format: {0}")]
    InvalidDate(String),

    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("Invalid direction: {0}")]
    InvalidDirection(String),

    #[error("Invalid event source: {0}")]
    InvalidSource(String),

    #[error("Invalid channel name: {0}")]
    InvalidChannel(String),

    #[error("Invalid card UID: {0}")]
    InvalidUid(String),

    // ---------------------------
    // Attendance errors
    // ---------------------------
    #[error("Unregistered card: {0}")]
    UnregisteredCard(String),

    #[error("Registration conflict: {0}")]
    Conflict(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Ledger busy: {0}")]
    TransientFailure(String),

    #[error("Attendance not recorded after {attempts} attempts")]
    WriteFailed { attempts: u32 },

    #[error("Scan source unavailable: {0}")]
    ScanSourceUnavailable(String),

    // ---------------------------
    // Config errors
    // ---------------------------
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to load configuration")]
    ConfigLoad,

    // ---------------------------
    // Import / output
    // ---------------------------
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // ---------------------------
    // Generic fallback
    // ---------------------------
    #[error("Internal error: {0}")]
    Other(String),
}

impl AppError {
    /// True when the failure comes from write contention and the caller may retry.
    pub fn is_transient(&self) -> bool {
        matches!(self, AppError::TransientFailure(_))
    }
}

pub type AppResult<T> = Result<T, AppError>;
