use smartacus_core::error::{Classified, ErrorKind};
use smartacus_domain::DomainError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReviewsError {
    #[error("domain/store error: {0}")]
    Domain(#[from] DomainError),
    #[error("review provider job {0} timed out after {1}s")]
    JobTimeout(String, u64),
    #[error("review provider error: {0}")]
    Provider(String),
    #[error("insufficient reviews: need {required}, have {available}")]
    InsufficientReviews { required: usize, available: usize },
}

impl Classified for ReviewsError {
    fn kind(&self) -> ErrorKind {
        match self {
            ReviewsError::Domain(e) => e.kind(),
            ReviewsError::JobTimeout(_, _) => ErrorKind::TimeBudgetExceeded,
            ReviewsError::Provider(_) => ErrorKind::Fetch,
            ReviewsError::InsufficientReviews { .. } => ErrorKind::Validation,
        }
    }
}

pub type Result<T> = std::result::Result<T, ReviewsError>;
