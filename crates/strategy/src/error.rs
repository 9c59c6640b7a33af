use smartacus_catalog::CatalogError;
use smartacus_core::error::{Classified, ErrorKind};
use smartacus_domain::DomainError;
use smartacus_pipeline::PipelineError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StrategyError {
    #[error("domain/store error: {0}")]
    Domain(#[from] DomainError),

    #[error("pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("budget manager error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("invalid configuration: {0}")]
    Validation(String),

    #[error("oracle consultation error: {0}")]
    Oracle(String),
}

impl Classified for StrategyError {
    fn kind(&self) -> ErrorKind {
        match self {
            StrategyError::Domain(e) => e.kind(),
            StrategyError::Pipeline(e) => e.kind(),
            StrategyError::Catalog(e) => e.kind(),
            StrategyError::Validation(_) => ErrorKind::Validation,
            StrategyError::Oracle(_) => ErrorKind::Fetch,
        }
    }
}

pub type Result<T> = std::result::Result<T, StrategyError>;
