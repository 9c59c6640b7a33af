use smartacus_core::error::{Classified, ErrorKind};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("listing not found: {id}")]
    ListingNotFound { id: String },

    #[error("niche not found: {category_id}/{marketplace_domain}")]
    NicheNotFound { category_id: String, marketplace_domain: i32 },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid data: {0}")]
    Invalid(String),
}

impl Classified for DomainError {
    fn kind(&self) -> ErrorKind {
        match self {
            DomainError::ListingNotFound { .. } | DomainError::NicheNotFound { .. } => ErrorKind::DataNotFound,
            DomainError::Database(_) => ErrorKind::Store,
            DomainError::Serialization(_) | DomainError::Invalid(_) => ErrorKind::Transform,
        }
    }
}

pub type Result<T> = std::result::Result<T, DomainError>;
