//! Error types for the voltab crate.

use thiserror::Error;

/// Report loading errors.
///
/// Parsing itself never fails: malformed lines are dropped and a report
/// without a header yields no rows. Only getting the text off disk can go wrong.
#[derive(Debug, Error)]
pub enum TableError {
    #[error("report file not found: {0}")]
    FileNotFound(String),

    #[error("I/O error: {0}")]
    Io(String),
}

pub type TableResult<T> = Result<T, TableError>;
