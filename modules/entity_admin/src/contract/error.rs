use admin_query::{ErrorKind, ValidationErrors};
use thiserror::Error;

use crate::domain::error::DomainError;

/// Errors that are safe to expose to other modules
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AdminError {
    #[error("{message}")]
    NotFound { message: String },

    #[error("{message}")]
    Usage { message: String },

    #[error(transparent)]
    Validation(ValidationErrors),

    #[error("{schema} with id {id} already exists")]
    AlreadyExists { schema: String, id: String },

    /// Raw store failure, message only.
    #[error("store error: {message}")]
    Store { message: String },
}

impl AdminError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    pub fn usage(message: impl Into<String>) -> Self {
        Self::Usage {
            message: message.into(),
        }
    }

    pub fn store(message: impl Into<String>) -> Self {
        Self::Store {
            message: message.into(),
        }
    }
}

impl From<DomainError> for AdminError {
    fn from(domain_error: DomainError) -> Self {
        match domain_error {
            DomainError::Query(admin_query::Error::Validation(errors)) => Self::Validation(errors),
            DomainError::Query(e) => match e.kind() {
                ErrorKind::NotFound => Self::not_found(e.to_string()),
                ErrorKind::Usage | ErrorKind::Validation => Self::usage(e.to_string()),
            },
            DomainError::AlreadyExists { schema, id } => Self::AlreadyExists { schema, id },
            DomainError::Database { message } => Self::store(message),
        }
    }
}
