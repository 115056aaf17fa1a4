use std::collections::btree_set;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::{Error, Result};
use crate::schema::SchemaDescriptor;

/// Fixed operator vocabulary of the list/search surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareOperator {
    /// Case-insensitive equality of the stringified column.
    Equals,
    /// Case-insensitive substring of the stringified column.
    Contains,
    /// Typed equality.
    Eq,
    GreaterThan,
    LessThan,
}

impl CompareOperator {
    pub const ALL: [CompareOperator; 5] = [
        CompareOperator::Equals,
        CompareOperator::Contains,
        CompareOperator::Eq,
        CompareOperator::GreaterThan,
        CompareOperator::LessThan,
    ];

    /// URL token.
    pub fn token(self) -> &'static str {
        match self {
            CompareOperator::Equals => "equals",
            CompareOperator::Contains => "contains",
            CompareOperator::Eq => "eq",
            CompareOperator::GreaterThan => "gt",
            CompareOperator::LessThan => "lt",
        }
    }

    pub fn is_ordering(self) -> bool {
        matches!(self, CompareOperator::GreaterThan | CompareOperator::LessThan)
    }
}

impl fmt::Display for CompareOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl FromStr for CompareOperator {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "equals" => Ok(CompareOperator::Equals),
            "contains" => Ok(CompareOperator::Contains),
            "eq" => Ok(CompareOperator::Eq),
            "gt" | "greater_than" => Ok(CompareOperator::GreaterThan),
            "lt" | "less_than" => Ok(CompareOperator::LessThan),
            _ => Err(Error::UnknownOperator(s.to_string())),
        }
    }
}

/// One `(field, operator, value)` clause.
///
/// Equality and ordering are by field name, operator and value, in that
/// order, which is also the canonical encoding order.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct QueryFilter {
    pub field: String,
    pub op: CompareOperator,
    pub value: String,
}

impl QueryFilter {
    pub fn new(field: impl Into<String>, op: CompareOperator, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            op,
            value: value.into(),
        }
    }

    /// Build a filter whose field is known to `schema`, using the declared
    /// spelling of the field name.
    pub fn for_schema(
        schema: &SchemaDescriptor,
        field: &str,
        op: &str,
        value: impl Into<String>,
    ) -> Result<Self> {
        let op = op.parse()?;
        let field = schema.field_by_name(field)?;
        Ok(Self::new(field.name(), op, value))
    }
}

impl fmt::Display for QueryFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.field, self.op, self.value)
    }
}

/// Request-scoped working set of filters in canonical order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct FilterSet(BTreeSet<QueryFilter>);

impl FilterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` if an equal filter was already present.
    pub fn insert(&mut self, filter: QueryFilter) -> bool {
        self.0.insert(filter)
    }

    /// Remove by value equality.
    pub fn remove(&mut self, filter: &QueryFilter) -> bool {
        self.0.remove(filter)
    }

    pub fn contains(&self, filter: &QueryFilter) -> bool {
        self.0.contains(filter)
    }

    pub fn iter(&self) -> btree_set::Iter<'_, QueryFilter> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<QueryFilter> for FilterSet {
    fn from_iter<I: IntoIterator<Item = QueryFilter>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Extend<QueryFilter> for FilterSet {
    fn extend<I: IntoIterator<Item = QueryFilter>>(&mut self, iter: I) {
        self.0.extend(iter);
    }
}

impl IntoIterator for FilterSet {
    type Item = QueryFilter;
    type IntoIter = btree_set::IntoIter<QueryFilter>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a FilterSet {
    type Item = &'a QueryFilter;
    type IntoIter = btree_set::Iter<'a, QueryFilter>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
