//! Store-agnostic condition tree.
//!
//! Leaves reference fields by logical name; a store translator resolves the
//! column. [`Expr::matches`] evaluates the tree against an in-memory
//! [`Record`] with SQL NULL semantics.

use std::cmp::Ordering;

use crate::record::Record;
use crate::value::FieldValue;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompareOp {
    /// `lower(text(field)) = value`; the value is already lower-cased.
    TextEquals,
    /// `lower(text(field)) LIKE %value%`; the value is already lower-cased.
    TextContains,
    Eq,
    Gt,
    Lt,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    And(Vec<Expr>),
    Or(Vec<Expr>),
    Compare {
        field: String,
        op: CompareOp,
        value: FieldValue,
    },
}

impl Expr {
    pub fn compare(field: impl Into<String>, op: CompareOp, value: FieldValue) -> Self {
        Expr::Compare {
            field: field.into(),
            op,
            value,
        }
    }

    /// Conjunction; `None` for no parts, the part itself for one.
    pub fn and(mut parts: Vec<Expr>) -> Option<Expr> {
        match parts.len() {
            0 => None,
            1 => parts.pop(),
            _ => Some(Expr::And(parts)),
        }
    }

    /// Disjunction; `None` for no parts, the part itself for one.
    pub fn or(mut parts: Vec<Expr>) -> Option<Expr> {
        match parts.len() {
            0 => None,
            1 => parts.pop(),
            _ => Some(Expr::Or(parts)),
        }
    }

    pub fn matches(&self, record: &Record) -> bool {
        match self {
            Expr::And(parts) => parts.iter().all(|p| p.matches(record)),
            Expr::Or(parts) => parts.iter().any(|p| p.matches(record)),
            Expr::Compare { field, op, value } => {
                let Some(actual) = record.get(field) else {
                    return false;
                };
                match op {
                    CompareOp::TextEquals | CompareOp::TextContains => {
                        let (Some(text), Some(needle)) = (actual.text_key(), value.as_str()) else {
                            return false;
                        };
                        if *op == CompareOp::TextEquals {
                            text == needle
                        } else {
                            text.contains(needle)
                        }
                    }
                    CompareOp::Eq => actual.compare(value) == Some(Ordering::Equal),
                    CompareOp::Gt => actual.compare(value) == Some(Ordering::Greater),
                    CompareOp::Lt => actual.compare(value) == Some(Ordering::Less),
                }
            }
        }
    }
}
