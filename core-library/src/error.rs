use sqlx::error::ErrorKind;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LibraryError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The referenced parent row is not committed yet.
    #[error("{entity} {id} references missing parent {parent_id}")]
    ParentMissing {
        entity: String,
        id: String,
        parent_id: String,
    },

    #[error("{entity} {id} violates a uniqueness constraint")]
    UniqueViolation { entity: String, id: String },

    #[error("Entity not found: {entity_type} with id {id}")]
    NotFound { entity_type: String, id: String },

    #[error("Invalid input: {field} - {message}")]
    InvalidInput { field: String, message: String },

    #[error("Migration failed: {0}")]
    Migration(String),
}

impl LibraryError {
    /// Whether the failure is a referential ordering problem that may succeed
    /// once the parent has been written.
    pub fn is_parent_missing(&self) -> bool {
        matches!(self, LibraryError::ParentMissing { .. })
    }
}

pub type Result<T> = std::result::Result<T, LibraryError>;

/// Constraint class of a failed write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Constraint {
    Unique,
    ForeignKey,
    Other,
}

pub(crate) fn constraint_of(err: &sqlx::Error) -> Constraint {
    let sqlx::Error::Database(db_err) = err else {
        return Constraint::Other;
    };

    match db_err.kind() {
        ErrorKind::UniqueViolation => Constraint::Unique,
        ErrorKind::ForeignKeyViolation => Constraint::ForeignKey,
        _ => constraint_from_message(db_err.message()),
    }
}

fn constraint_from_message(message: &str) -> Constraint {
    if message.contains("UNIQUE constraint failed") {
        Constraint::Unique
    } else if message.contains("FOREIGN KEY constraint failed") {
        Constraint::ForeignKey
    } else {
        Constraint::Other
    }
}

/// Map a failed write of `entity` (optionally pointing at `parent_id`) onto
/// the store's error classes.
pub(crate) fn classify_write_error(
    err: sqlx::Error,
    entity: &str,
    id: &str,
    parent_id: Option<&str>,
) -> LibraryError {
    match constraint_of(&err) {
        Constraint::ForeignKey => LibraryError::ParentMissing {
            entity: entity.to_string(),
            id: id.to_string(),
            parent_id: parent_id.unwrap_or_default().to_string(),
        },
        Constraint::Unique => LibraryError::UniqueViolation {
            entity: entity.to_string(),
            id: id.to_string(),
        },
        Constraint::Other => LibraryError::Database(err),
    }
}
