use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::schema::FieldType;

/// Write operations guarded by per-schema capability flags.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Operation {
    Create,
    Edit,
    Delete,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Operation::Create => "CREATE",
            Operation::Edit => "EDIT",
            Operation::Delete => "DELETE",
        })
    }
}

/// Why a single field (or the row as a whole) was rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    UnknownField,
    TypeMismatch,
    Required,
    Unique,
    NotNull,
    ForeignKey,
    Check,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FieldViolation {
    /// Logical field name; `None` when the store did not say which column failed.
    pub field: Option<String>,
    pub kind: ViolationKind,
    pub message: String,
}

/// Structured validation report, one entry per rejected field.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ValidationErrors {
    entries: Vec<FieldViolation>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: Option<String>, kind: ViolationKind, message: impl Into<String>) -> Self {
        let mut v = Self::new();
        v.push(field, kind, message);
        v
    }

    pub fn push(&mut self, field: Option<String>, kind: ViolationKind, message: impl Into<String>) {
        self.entries.push(FieldViolation {
            field,
            kind,
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn entries(&self) -> &[FieldViolation] {
        &self.entries
    }

    pub fn for_field<'a>(&'a self, field: &'a str) -> impl Iterator<Item = &'a FieldViolation> {
        self.entries
            .iter()
            .filter(move |e| e.field.as_deref() == Some(field))
    }

    /// `Ok(value)` when nothing was recorded, otherwise the report as an error.
    pub fn into_result<T>(self, value: T) -> Result<T> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(Error::Validation(self))
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("validation failed")?;
        for (i, e) in self.entries.iter().enumerate() {
            f.write_str(if i == 0 { ": " } else { "; " })?;
            match &e.field {
                Some(field) => write!(f, "{field}: {}", e.message)?,
                None => f.write_str(&e.message)?,
            }
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

/// Engine error taxonomy: lookups, usage mistakes and validation reports.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum Error {
    #[error("unknown schema: {0}")]
    UnknownSchema(String),

    #[error("unknown field '{field}' on {schema}")]
    UnknownField { schema: String, field: String },

    #[error("{schema} with id {id} not found")]
    RecordNotFound { schema: String, id: String },

    #[error("invalid page {page}: valid pages are 1..={page_count}")]
    InvalidPage { page: u64, page_count: u64 },

    #[error("page size must be at least 1")]
    InvalidPageSize,

    #[error("unknown operator: {0}")]
    UnknownOperator(String),

    #[error("cannot parse '{value}' as {expected} for field '{field}'")]
    TypeMismatch {
        field: String,
        expected: FieldType,
        value: String,
    },

    #[error("field '{field}' of type {field_type} does not support ordering")]
    NotOrderable { field: String, field_type: FieldType },

    #[error("field '{field}' of type {field_type} cannot be filtered")]
    NotFilterable { field: String, field_type: FieldType },

    #[error("invalid sort direction: {0}")]
    InvalidSortDirection(String),

    #[error("invalid value '{value}' for parameter '{name}'")]
    InvalidParam { name: String, value: String },

    #[error("malformed filter parameters: {0}")]
    MalformedFacets(String),

    #[error("{operation} operations have been disabled on {schema}")]
    OperationDisabled { schema: String, operation: Operation },

    #[error(transparent)]
    Validation(#[from] ValidationErrors),
}

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Usage,
    Validation,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::UnknownSchema(_) | Error::UnknownField { .. } | Error::RecordNotFound { .. } => {
                ErrorKind::NotFound
            }
            Error::Validation(_) => ErrorKind::Validation,
            _ => ErrorKind::Usage,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    pub fn invalid_param(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::InvalidParam {
            name: name.into(),
            value: value.into(),
        }
    }
}
