use smartacus_core::error::{Classified, ErrorKind};
use smartacus_domain::error::DomainError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("invalid credentials for remote catalog provider")]
    InvalidAuth,

    #[error("rate-limited by remote catalog provider")]
    RateLimit,

    #[error("fetch failed after exhausting retries: {0}")]
    Fetch(String),

    #[error("transform error: {0}")]
    Transform(String),

    #[error("http transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("domain error: {0}")]
    Domain(#[from] DomainError),
}

impl Classified for CatalogError {
    fn kind(&self) -> ErrorKind {
        match self {
            CatalogError::InvalidAuth => ErrorKind::InvalidAuth,
            CatalogError::RateLimit => ErrorKind::RateLimit,
            CatalogError::Fetch(_) | CatalogError::Http(_) => ErrorKind::Fetch,
            CatalogError::Transform(_) | CatalogError::Json(_) => ErrorKind::Transform,
            CatalogError::Database(_) => ErrorKind::Store,
            CatalogError::Domain(e) => e.kind(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CatalogError>;
