//! # Engine Error Types
//!
//! Error type for the workflow layer. Domain rule violations surface as
//! [`CoreError`] variants; storage failures surface as [`DbError`]. Callers
//! match on `EngineError::Core` for anything a cashier can act on
//! (insufficient stock, table occupied, short payment) and treat
//! `EngineError::Db` as operational.

use comptoir_core::CoreError;
use comptoir_db::DbError;
use thiserror::Error;

/// Errors produced by the engine workflows.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A domain rule was violated.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The storage layer failed.
    #[error(transparent)]
    Db(#[from] DbError),
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

// Raw sqlx errors escape the repositories at transaction boundaries
// (`begin`/`commit`); classify them through DbError like any other
// storage failure.
impl From<sqlx::Error> for EngineError {
    fn from(err: sqlx::Error) -> Self {
        EngineError::Db(DbError::from(err))
    }
}

impl EngineError {
    /// Whether this error represents a domain rule violation rather than
    /// an operational failure.
    pub fn is_domain(&self) -> bool {
        matches!(self, EngineError::Core(_))
    }
}
