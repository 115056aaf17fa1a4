//! Free text + filters → condition tree, and sort resolution.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ast::{CompareOp, Expr};
use crate::error::{Error, Result};
use crate::filter::{CompareOperator, FilterSet, QueryFilter};
use crate::schema::{FieldDescriptor, SchemaDescriptor};
use crate::value::FieldValue;

/// Build the condition for a list/search request; `None` means unconstrained.
///
/// Free text becomes an OR of case-insensitive substring matches over every
/// string field (nothing when the schema has none), AND-ed with every filter.
pub fn build_predicate(
    schema: &SchemaDescriptor,
    free_text: Option<&str>,
    filters: &FilterSet,
) -> Result<Option<Expr>> {
    let mut parts = Vec::with_capacity(filters.len() + 1);

    if let Some(text) = free_text.filter(|t| !t.trim().is_empty()) {
        let needle = text.to_lowercase();
        let any_string = schema
            .string_fields()
            .map(|f| {
                Expr::compare(
                    f.name(),
                    CompareOp::TextContains,
                    FieldValue::String(needle.clone()),
                )
            })
            .collect();
        match Expr::or(any_string) {
            Some(group) => parts.push(group),
            None => tracing::debug!(
                schema = schema.class_name(),
                "no string fields; ignoring free text"
            ),
        }
    }

    for filter in filters {
        parts.push(filter_to_expr(schema, filter)?);
    }

    Ok(Expr::and(parts))
}

fn filter_to_expr(schema: &SchemaDescriptor, filter: &QueryFilter) -> Result<Expr> {
    let field = schema.field_by_name(&filter.field)?;
    let field_type = field.field_type();
    if !field_type.is_filterable() {
        return Err(Error::NotFilterable {
            field: field.name().to_string(),
            field_type,
        });
    }
    if filter.op.is_ordering() && !field_type.is_orderable() {
        return Err(Error::NotOrderable {
            field: field.name().to_string(),
            field_type,
        });
    }

    let (op, value) = match filter.op {
        CompareOperator::Equals => (
            CompareOp::TextEquals,
            FieldValue::String(filter.value.to_lowercase()),
        ),
        CompareOperator::Contains => (
            CompareOp::TextContains,
            FieldValue::String(filter.value.to_lowercase()),
        ),
        CompareOperator::Eq => (CompareOp::Eq, typed(field, &filter.value)?),
        CompareOperator::GreaterThan => (CompareOp::Gt, typed(field, &filter.value)?),
        CompareOperator::LessThan => (CompareOp::Lt, typed(field, &filter.value)?),
    };
    Ok(Expr::compare(field.name(), op, value))
}

fn typed(field: &FieldDescriptor, literal: &str) -> Result<FieldValue> {
    FieldValue::parse(field.name(), field.value_type(), literal)
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDir {
    #[default]
    Asc,
    Desc,
}

impl FromStr for SortDir {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" => Ok(SortDir::Asc),
            "desc" => Ok(SortDir::Desc),
            _ => Err(Error::InvalidSortDirection(s.to_string())),
        }
    }
}

impl fmt::Display for SortDir {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SortDir::Asc => "asc",
            SortDir::Desc => "desc",
        })
    }
}

/// One resolved `ORDER BY` key (logical field name).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SortKey {
    pub field: String,
    pub dir: SortDir,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SortSpec {
    pub field: String,
    pub dir: SortDir,
}

impl SortSpec {
    /// Primary key ascending.
    pub fn default_for(schema: &SchemaDescriptor) -> Self {
        Self {
            field: schema.primary_key().name().to_string(),
            dir: SortDir::Asc,
        }
    }

    /// Resolve raw `sortKey`/`sortOrder` values; blanks fall back to defaults.
    pub fn resolve(
        schema: &SchemaDescriptor,
        sort_key: Option<&str>,
        sort_order: Option<&str>,
    ) -> Result<Self> {
        let dir = match sort_order.map(str::trim).filter(|s| !s.is_empty()) {
            Some(raw) => raw.parse()?,
            None => SortDir::Asc,
        };
        let field = match sort_key.map(str::trim).filter(|s| !s.is_empty()) {
            Some(raw) => {
                let field = schema.field_by_name(raw)?;
                if !field.field_type().is_orderable() {
                    return Err(Error::NotOrderable {
                        field: field.name().to_string(),
                        field_type: field.field_type(),
                    });
                }
                field.name().to_string()
            }
            None => schema.primary_key().name().to_string(),
        };
        Ok(Self { field, dir })
    }

    /// Order keys with the primary key appended as a tiebreaker.
    pub fn keys(&self, schema: &SchemaDescriptor) -> Vec<SortKey> {
        let pk = schema.primary_key().name();
        let mut keys = vec![SortKey {
            field: self.field.clone(),
            dir: self.dir,
        }];
        if self.field != pk {
            keys.push(SortKey {
                field: pk.to_string(),
                dir: self.dir,
            });
        }
        keys
    }
}
