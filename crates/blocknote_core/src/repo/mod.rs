//! Repository contracts and SQLite implementations.
//!
//! # Responsibility
//! - Provide use-case oriented persistence for full notes, summaries and
//!   categories.
//! - Keep SQL and transaction handling inside the persistence boundary.
//!
//! # Invariants
//! - Write paths validate before touching storage.
//! - Every multi-statement write runs in one `BEGIN IMMEDIATE` transaction;
//!   a failure at any step rolls the whole write back.
//! - Read paths reject invalid persisted rows (`InvalidData`) instead of
//!   masking them.

use crate::db::DbError;
use crate::model::block::ValidationError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod category_repo;
pub mod note_repo;

pub type RepoResult<T> = Result<T, RepoError>;

#[derive(Debug)]
pub enum RepoError {
    Validation(ValidationError),
    /// Storage failure; the enclosing transaction was rolled back.
    Db(DbError),
    NotFound { entity: &'static str, id: String },
    InvalidData(String),
    /// The target is protected from this mutation (e.g. a default category).
    Protected(String),
}

impl RepoError {
    pub(crate) fn note_not_found(id: impl ToString) -> Self {
        Self::NotFound {
            entity: "note",
            id: id.to_string(),
        }
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound { entity, id } => write!(f, "{entity} not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
            Self::Protected(message) => write!(f, "protected: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::NotFound { .. } | Self::InvalidData(_) | Self::Protected(_) => None,
        }
    }
}

impl From<ValidationError> for RepoError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}
