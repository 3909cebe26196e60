mod catalog;

pub use catalog::{NewCatalogItem, SqlCatalogRepository, DEFAULT_CONFIDENCE};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("catalog item {0} not found")]
    ItemNotFound(i64),
}
