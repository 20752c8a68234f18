//! The application level error type.
use std::path::PathBuf;

use crate::models::transaction::TransactionId;

/// The errors that may occur while working with the transaction store.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The persisted file exists but does not match the expected columns
    /// and types.
    ///
    /// `line` is 1-based and counts the header row.
    #[error("corrupt data in {} on line {line}: {reason}", path.display())]
    CorruptData {
        path: PathBuf,
        line: u64,
        reason: String,
    },

    /// No transaction with the given ID exists in the current snapshot.
    #[error("transaction with ID {0} not found")]
    NotFound(TransactionId),

    /// The user supplied a transaction that cannot be stored, e.g. a
    /// negative amount or an unknown category.
    #[error("{0}")]
    Validation(String),

    /// Reading or writing the data file failed.
    ///
    /// When this is returned from a mutating operation the mutation has not
    /// been applied and may be retried.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The terminal UI could not be set up or drawn.
    #[error("terminal error: {0}")]
    Terminal(String),
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    pub fn corrupt(path: impl Into<PathBuf>, line: u64, reason: impl Into<String>) -> Self {
        Error::CorruptData {
            path: path.into(),
            line,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
