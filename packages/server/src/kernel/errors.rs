//! Engine-wide error type.

use thiserror::Error;

use crate::domain::{BookingId, InterpreterId};

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("booking {0} not found")]
    BookingNotFound(BookingId),

    #[error("booking {0} has no eligible interpreter candidates")]
    NoCandidates(BookingId),

    #[error("booking {0} is already locked by {1}")]
    AlreadyLocked(BookingId, String),

    #[error("booking {0} failed to commit: {1}")]
    CommitFailed(BookingId, String),

    #[error("commit conflicted with another writer for interpreter {0}")]
    Conflict(InterpreterId),

    #[error("invalid policy configuration: {0}")]
    InvalidPolicy(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("configuration error: {0}")]
    Config(#[from] anyhow::Error),
}

pub type EngineResult<T> = Result<T, EngineError>;
