use thiserror::Error;
use tokio_postgres::error::SqlState;

/// Label used for the registry's pool in connection errors.
pub(crate) const REGISTRY_DATABASE: &str = "registry";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Registered model '{name}' not found")]
    RegisteredModelNotFound { name: String },

    #[error("Model version {version} of registered model '{name}' not found")]
    ModelVersionNotFound { name: String, version: i32 },

    #[error("Tag '{tag}' not found on {target}")]
    TagNotFound { target: String, tag: String },

    #[error("Registered model '{name}' already exists")]
    RegisteredModelAlreadyExists { name: String },

    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    #[error("Connection failed to {database}: {cause}")]
    ConnectionFailed { database: String, cause: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Category a [`StoreError`] is reported under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    AlreadyExists,
    InvalidArgument,
    Storage,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::NotFound => write!(f, "not_found"),
            ErrorKind::AlreadyExists => write!(f, "already_exists"),
            ErrorKind::InvalidArgument => write!(f, "invalid_argument"),
            ErrorKind::Storage => write!(f, "storage"),
        }
    }
}

impl StoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::RegisteredModelNotFound { .. }
            | StoreError::ModelVersionNotFound { .. }
            | StoreError::TagNotFound { .. } => ErrorKind::NotFound,
            StoreError::RegisteredModelAlreadyExists { .. } => ErrorKind::AlreadyExists,
            StoreError::InvalidArgument { .. } => ErrorKind::InvalidArgument,
            StoreError::ConnectionFailed { .. } | StoreError::Internal(_) => ErrorKind::Storage,
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        StoreError::InvalidArgument {
            message: message.into(),
        }
    }

    pub(crate) fn model_not_found(name: &str) -> Self {
        StoreError::RegisteredModelNotFound {
            name: name.to_string(),
        }
    }

    pub(crate) fn version_not_found(name: &str, version: i32) -> Self {
        StoreError::ModelVersionNotFound {
            name: name.to_string(),
            version,
        }
    }
}

/// True when the statement failed on a primary key or unique constraint.
pub(crate) fn is_unique_violation(err: &tokio_postgres::Error) -> bool {
    err.code() == Some(&SqlState::UNIQUE_VIOLATION)
}

/// Server-side message and detail when PostgreSQL reported the failure,
/// otherwise the client error text.
pub(crate) fn db_error_message(err: &tokio_postgres::Error) -> String {
    match err.as_db_error() {
        Some(db_err) => match db_err.detail() {
            Some(detail) => format!("{} - {}", db_err.message(), detail),
            None => db_err.message().to_string(),
        },
        None => err.to_string(),
    }
}

impl From<tokio_postgres::Error> for StoreError {
    fn from(err: tokio_postgres::Error) -> Self {
        let message = db_error_message(&err);
        // Over-long values are caller input
        if err.code() == Some(&SqlState::STRING_DATA_RIGHT_TRUNCATION) {
            return StoreError::InvalidArgument { message };
        }
        StoreError::Internal(message)
    }
}

impl From<deadpool_postgres::PoolError> for StoreError {
    fn from(err: deadpool_postgres::PoolError) -> Self {
        StoreError::ConnectionFailed {
            database: REGISTRY_DATABASE.to_string(),
            cause: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(StoreError::model_not_found("m").kind(), ErrorKind::NotFound);
        assert_eq!(StoreError::version_not_found("m", 3).kind(), ErrorKind::NotFound);
        assert_eq!(
            StoreError::TagNotFound {
                target: "registered model 'm'".to_string(),
                tag: "t".to_string(),
            }
            .kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            StoreError::RegisteredModelAlreadyExists { name: "m".to_string() }.kind(),
            ErrorKind::AlreadyExists
        );
        assert_eq!(StoreError::invalid("bad").kind(), ErrorKind::InvalidArgument);
        assert_eq!(StoreError::Internal("boom".to_string()).kind(), ErrorKind::Storage);
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            StoreError::version_not_found("resnet", 2).to_string(),
            "Model version 2 of registered model 'resnet' not found"
        );
        assert_eq!(
            StoreError::invalid("Tag must not be empty").to_string(),
            "Invalid argument: Tag must not be empty"
        );
        assert_eq!(ErrorKind::AlreadyExists.to_string(), "already_exists");
    }

    #[test]
    fn test_pool_errors_name_the_registry() {
        let err = StoreError::from(deadpool_postgres::PoolError::Closed);
        assert_eq!(err.kind(), ErrorKind::Storage);
        assert!(matches!(
            &err,
            StoreError::ConnectionFailed { database, .. } if database == REGISTRY_DATABASE
        ));
    }
}
