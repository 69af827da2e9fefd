use thiserror::Error;

/// Failure of the storage layer itself, as opposed to a contract violation
/// by the caller. Always fatal for the enclosing request.
#[derive(Debug, Error)]
#[error("query failed: {info}")]
pub struct QueryError {
    info: String,
}

impl QueryError {
    pub fn new(info: String) -> Self {
        Self { info }
    }
}

impl From<sqlx::Error> for QueryError {
    fn from(value: sqlx::Error) -> Self {
        match value {
            sqlx::Error::Configuration(e) => Self::new(format!("{e}")),
            sqlx::Error::Database(e) => Self::new(format!("{e}")),
            sqlx::Error::Io(e) => Self::new(format!("{e}")),
            sqlx::Error::Tls(e) => Self::new(format!("{e}")),
            sqlx::Error::Protocol(e) => Self::new(format!("{e}")),
            sqlx::Error::RowNotFound => Self::new(String::from("RowNotFound")),
            sqlx::Error::TypeNotFound { type_name } => {
                Self::new(format!("Type not found: {type_name}"))
            }
            sqlx::Error::ColumnNotFound(e) => Self::new(format!("{e}")),
            sqlx::Error::ColumnDecode { index, source } => {
                Self::new(format!("Column decode {index} ({source})"))
            }
            sqlx::Error::Decode(e) => Self::new(format!("{e}")),
            sqlx::Error::PoolTimedOut => Self::new(String::from("Pool timed out")),
            sqlx::Error::PoolClosed => Self::new(String::from("Pool closed")),
            sqlx::Error::WorkerCrashed => Self::new(String::from("Worker crashed")),
            sqlx::Error::Migrate(e) => Self::new(format!("{e}")),
            _ => Self::new(String::from("Unknown error")),
        }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("validation failed for `{field}`: {message}")]
    Validation {
        field: &'static str,
        message: String,
    },

    #[error("permission denied: {0}")]
    PermissionDenied(&'static str),

    #[error("conflict: {0}")]
    Conflict(&'static str),

    #[error("not found: {0}")]
    NotFound(&'static str),

    #[error("users cannot subscribe to themselves")]
    SelfReference,

    #[error(transparent)]
    Query(#[from] QueryError),
}

impl Error {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }
}

/// Maps a foreign-key violation on `entity` to `NotFound`; anything else is
/// a storage failure.
pub(crate) fn on_missing_reference(e: sqlx::Error, entity: &'static str) -> Error {
    let is_fk = e
        .as_database_error()
        .is_some_and(|db| db.is_foreign_key_violation());

    if is_fk {
        Error::NotFound(entity)
    } else {
        QueryError::from(e).into()
    }
}

/// Maps a foreign-key violation to `Conflict` for deletes that are blocked
/// while other rows still reference the target.
pub(crate) fn on_blocked_delete(e: sqlx::Error, message: &'static str) -> Error {
    let is_fk = e
        .as_database_error()
        .is_some_and(|db| db.is_foreign_key_violation());

    if is_fk {
        Error::Conflict(message)
    } else {
        QueryError::from(e).into()
    }
}
