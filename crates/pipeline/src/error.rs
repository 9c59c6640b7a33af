use smartacus_catalog::CatalogError;
use smartacus_core::error::{Classified, ErrorKind};
use smartacus_domain::DomainError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("domain/store error: {0}")]
    Domain(#[from] DomainError),

    #[error("stage soft-timeout exceeded: {0}")]
    TimeBudgetExceeded(String),

    #[error("invalid configuration: {0}")]
    Validation(String),
}

impl Classified for PipelineError {
    fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::Catalog(e) => e.kind(),
            PipelineError::Domain(e) => e.kind(),
            PipelineError::TimeBudgetExceeded(_) => ErrorKind::TimeBudgetExceeded,
            PipelineError::Validation(_) => ErrorKind::Validation,
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
