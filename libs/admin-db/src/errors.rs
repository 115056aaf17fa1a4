//! Constraint-violation classification across SQLite and Postgres.

use admin_query::{SchemaDescriptor, ValidationErrors, ViolationKind};
use once_cell::sync::Lazy;
use regex::Regex;
use sea_orm::{DbErr, RuntimeErr};
use sqlx::error::{DatabaseError, ErrorKind};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConstraintKind {
    Unique,
    NotNull,
    ForeignKey,
    Check,
    TypeMismatch,
}

impl From<ConstraintKind> for ViolationKind {
    fn from(kind: ConstraintKind) -> Self {
        match kind {
            ConstraintKind::Unique => ViolationKind::Unique,
            ConstraintKind::NotNull => ViolationKind::NotNull,
            ConstraintKind::ForeignKey => ViolationKind::ForeignKey,
            ConstraintKind::Check => ViolationKind::Check,
            ConstraintKind::TypeMismatch => ViolationKind::TypeMismatch,
        }
    }
}

/// A store-level constraint failure.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConstraintViolation {
    pub kind: ConstraintKind,
    /// Offending columns, when the driver reported them.
    pub columns: Vec<String>,
    pub message: String,
}

impl ConstraintViolation {
    /// One entry per offending column, mapped back to logical field names.
    pub fn into_validation(self, schema: &SchemaDescriptor) -> ValidationErrors {
        let kind = ViolationKind::from(self.kind);
        if self.columns.is_empty() {
            return ValidationErrors::single(None, kind, self.message);
        }
        let mut out = ValidationErrors::new();
        for column in &self.columns {
            let field = schema
                .sorted_fields()
                .iter()
                .find(|f| f.column() == column)
                .map_or_else(|| column.clone(), |f| f.name().to_string());
            out.push(Some(field), kind, self.message.clone());
        }
        out
    }
}

/// Returns true if the given SQLSTATE / extended code is a unique violation
/// (Postgres 23505, SQLite 2067 and 1555 for primary keys).
pub fn is_unique_violation_code(code: &str) -> bool {
    matches!(code, "23505" | "2067" | "1555")
}

fn is_type_mismatch_code(code: &str) -> bool {
    // SQLite MISMATCH / CONSTRAINT_DATATYPE, Postgres class 22 (data exception).
    matches!(code, "20" | "3091") || code.starts_with("22")
}

/// Classify a SeaORM error; `None` for anything that is not a constraint failure.
pub fn classify_db_err(err: &DbErr) -> Option<ConstraintViolation> {
    match err {
        DbErr::Exec(RuntimeErr::SqlxError(e)) | DbErr::Query(RuntimeErr::SqlxError(e)) => {
            classify_sqlx_err(e)
        }
        _ => None,
    }
}

pub fn classify_sqlx_err(err: &sqlx::Error) -> Option<ConstraintViolation> {
    match err {
        sqlx::Error::Database(db) => classify_database_error(db.as_ref()),
        _ => None,
    }
}

fn classify_database_error(db: &dyn DatabaseError) -> Option<ConstraintViolation> {
    let code = db.code().map(|c| c.into_owned()).unwrap_or_default();
    let kind = match db.kind() {
        ErrorKind::UniqueViolation => ConstraintKind::Unique,
        ErrorKind::NotNullViolation => ConstraintKind::NotNull,
        ErrorKind::ForeignKeyViolation => ConstraintKind::ForeignKey,
        ErrorKind::CheckViolation => ConstraintKind::Check,
        _ if is_unique_violation_code(&code) => ConstraintKind::Unique,
        _ if is_type_mismatch_code(&code) => ConstraintKind::TypeMismatch,
        _ => return None,
    };
    let message = db.message().to_string();
    let mut columns = columns_from_message(&message);
    if columns.is_empty() {
        columns = driver_columns(db);
    }
    tracing::debug!(?kind, %code, ?columns, "constraint violation");
    Some(ConstraintViolation {
        kind,
        columns,
        message,
    })
}

/// SQLite: `UNIQUE constraint failed: person.email, person.team_id`
static SQLITE_COLUMNS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"constraint failed: (.+)$").expect("static regex")
});

/// Postgres: `null value in column "name" of relation "person" ...`
static PG_COLUMN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"column "([^"]+)""#).expect("static regex"));

/// Postgres detail: `Key (email)=(a@b.c) already exists.`
static PG_KEY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Key \(([^)]+)\)=").expect("static regex"));

pub(crate) fn columns_from_message(message: &str) -> Vec<String> {
    if let Some(caps) = SQLITE_COLUMNS.captures(message) {
        return caps[1]
            .split(',')
            .filter_map(|part| {
                let part = part.trim();
                // `FOREIGN KEY constraint failed` has no column list
                if part.is_empty() {
                    return None;
                }
                Some(part.rsplit('.').next().unwrap_or(part).to_string())
            })
            .collect();
    }
    if let Some(caps) = PG_COLUMN.captures(message) {
        return vec![caps[1].to_string()];
    }
    if let Some(caps) = PG_KEY.captures(message) {
        return split_key_list(&caps[1]);
    }
    Vec::new()
}

fn split_key_list(list: &str) -> Vec<String> {
    list.split(',').map(|c| c.trim().to_string()).collect()
}

#[cfg(feature = "pg")]
fn driver_columns(db: &dyn DatabaseError) -> Vec<String> {
    use sqlx::postgres::PgDatabaseError;

    let Some(pg) = db.try_downcast_ref::<PgDatabaseError>() else {
        return Vec::new();
    };
    if let Some(column) = pg.column() {
        return vec![column.to_string()];
    }
    pg.detail()
        .and_then(|d| PG_KEY.captures(d))
        .map(|caps| split_key_list(&caps[1]))
        .unwrap_or_default()
}

#[cfg(not(feature = "pg"))]
fn driver_columns(_db: &dyn DatabaseError) -> Vec<String> {
    Vec::new()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sqlite_messages() {
        assert_eq!(
            columns_from_message("UNIQUE constraint failed: person.email"),
            vec!["email"]
        );
        assert_eq!(
            columns_from_message("UNIQUE constraint failed: member.team, member.person"),
            vec!["team", "person"]
        );
        assert_eq!(
            columns_from_message("NOT NULL constraint failed: person.name"),
            vec!["name"]
        );
        assert!(columns_from_message("FOREIGN KEY constraint failed").is_empty());
    }

    #[test]
    fn postgres_messages() {
        assert_eq!(
            columns_from_message(
                r#"null value in column "name" of relation "person" violates not-null constraint"#
            ),
            vec!["name"]
        );
        assert_eq!(
            columns_from_message("Key (team_id, person_id)=(1, 2) already exists."),
            vec!["team_id", "person_id"]
        );
    }

    #[test]
    fn codes() {
        assert!(is_unique_violation_code("23505"));
        assert!(is_unique_violation_code("2067"));
        assert!(!is_unique_violation_code("1299"));
        assert!(is_type_mismatch_code("22P02"));
    }
}
