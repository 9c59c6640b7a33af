//! # Error Taxonomy
//!
//! Smartacus classifies errors by *kind*, not by type name, so that every
//! crate's error enum can be mapped onto the same recoverability rules:
//!
//! - [`ErrorKind::InvalidAuth`] is terminal — surfaced immediately, never retried.
//! - [`ErrorKind::RateLimit`] and [`ErrorKind::Transient`] are retried with
//!   back-off within a retry budget before becoming a [`ErrorKind::Fetch`].
//! - [`ErrorKind::DataNotFound`] and [`ErrorKind::Transform`] are per-item and
//!   never abort the batch that produced them.
//! - [`ErrorKind::Store`] aborts only the transaction it occurred in.
//! - [`ErrorKind::Validation`] is only ever raised at startup.
//! - [`ErrorKind::TimeBudgetExceeded`] finalizes a stage as failed without
//!   aborting the cycle.
//!
//! Crate-local error enums (`CatalogError`, `DomainError`, `PipelineError`,
//! ...) implement [`Classified`] so orchestration code can branch on kind
//! without matching on every concrete variant.

use thiserror::Error;

/// Coarse error classification shared by every crate in the workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidAuth,
    RateLimit,
    Fetch,
    DataNotFound,
    Transform,
    Store,
    Validation,
    TimeBudgetExceeded,
    Internal,
}

impl ErrorKind {
    /// Whether this kind is recoverable within the current cycle (never
    /// propagates out of the orchestrator) versus terminal at startup.
    pub fn is_recoverable(self) -> bool {
        !matches!(self, ErrorKind::InvalidAuth | ErrorKind::Validation)
    }
}

/// Implemented by every crate-local error enum so shared orchestration code
/// can decide retry/propagation behavior without a match over foreign types.
pub trait Classified {
    fn kind(&self) -> ErrorKind;
}

/// Errors raised by `smartacus-core` itself: configuration loading and the
/// database pool.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("configuration validation failed: {0}")]
    Validation(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl Classified for CoreError {
    fn kind(&self) -> ErrorKind {
        match self {
            CoreError::Config(_) | CoreError::Validation(_) => ErrorKind::Validation,
            CoreError::Database(_) => ErrorKind::Store,
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
