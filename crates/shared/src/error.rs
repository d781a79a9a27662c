//! Error types for SiteHost

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SiteHostError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sqlx::Error> for SiteHostError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => SiteHostError::NotFound("row not found".to_string()),
            sqlx::Error::Database(db_err) => {
                // PostgreSQL unique violation
                if db_err.code().as_deref() == Some("23505") {
                    return SiteHostError::Conflict(db_err.message().to_string());
                }
                // PostgreSQL foreign key violation
                if db_err.code().as_deref() == Some("23503") {
                    return SiteHostError::Validation(db_err.message().to_string());
                }
                SiteHostError::Database(db_err.to_string())
            }
            _ => SiteHostError::Database(err.to_string()),
        }
    }
}

pub type SiteHostResult<T> = Result<T, SiteHostError>;
