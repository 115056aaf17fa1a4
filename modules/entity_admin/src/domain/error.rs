use admin_query::{Error as QueryError, Operation, ValidationErrors};
use thiserror::Error;

/// Domain-specific errors using thiserror
#[derive(Error, Debug)]
pub enum DomainError {
    #[error(transparent)]
    Query(#[from] QueryError),

    #[error("{schema} with id {id} already exists")]
    AlreadyExists { schema: String, id: String },

    #[error("Database error: {message}")]
    Database { message: String },
}

pub type DomainResult<T> = Result<T, DomainError>;

impl DomainError {
    pub fn unknown_schema(class_name: impl Into<String>) -> Self {
        Self::Query(QueryError::UnknownSchema(class_name.into()))
    }

    pub fn record_not_found(schema: impl Into<String>, id: impl ToString) -> Self {
        Self::Query(QueryError::RecordNotFound {
            schema: schema.into(),
            id: id.to_string(),
        })
    }

    pub fn already_exists(schema: impl Into<String>, id: impl ToString) -> Self {
        Self::AlreadyExists {
            schema: schema.into(),
            id: id.to_string(),
        }
    }

    pub fn disabled(schema: impl Into<String>, operation: Operation) -> Self {
        Self::Query(QueryError::OperationDisabled {
            schema: schema.into(),
            operation,
        })
    }

    pub fn validation(errors: ValidationErrors) -> Self {
        Self::Query(QueryError::Validation(errors))
    }

    pub fn database(message: impl Into<String>) -> Self {
        Self::Database {
            message: message.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Query(e) if e.is_not_found())
    }
}

impl From<ValidationErrors> for DomainError {
    fn from(errors: ValidationErrors) -> Self {
        Self::validation(errors)
    }
}
