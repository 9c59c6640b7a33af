pub mod config;
pub mod database;
pub mod error;
pub mod logging;
pub mod types;

#[cfg(test)]
mod tests;

pub use config::Config;
pub use database::DatabasePool;
pub use error::{Classified, CoreError, ErrorKind, Result};
pub use types::{PaginationOptions, PaginationResult, YearMonth};

pub use chrono::{DateTime, Utc};
pub use uuid::Uuid;
