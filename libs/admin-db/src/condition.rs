//! Condition tree → `sea_orm::Condition` (AST in, SQL out).
//!
//! Building the tree belongs to `admin_query`; this module only resolves
//! logical field names to columns and binds typed values.

use admin_query::{CompareOp, Expr as Ast, FieldType, FieldValue, SchemaDescriptor};
use bigdecimal::BigDecimal;
use rust_decimal::Decimal;
use sea_orm::sea_query::{Alias, Expr, Func, LikeExpr, SimpleExpr};
use sea_orm::{Condition, Value};

use crate::{DbError, Result};

/* ---------- value conversion ---------- */

fn bigdecimal_to_decimal(bd: &BigDecimal) -> Result<Decimal> {
    // Preserve precision via the string form.
    let s = bd.normalized().to_string();
    Decimal::from_str_exact(&s)
        .or_else(|_| s.parse::<Decimal>())
        .map_err(|_| DbError::Decimal(s))
}

/// Bind a typed value; `value_type` decides the SQL type of NULL.
pub fn to_sea_value(value: &FieldValue, value_type: FieldType) -> Result<Value> {
    Ok(match value {
        FieldValue::Null => null_of(value_type),
        FieldValue::String(s) => Value::String(Some(Box::new(s.clone()))),
        FieldValue::Integer(i) => Value::BigInt(Some(*i)),
        FieldValue::Decimal(d) => Value::Decimal(Some(Box::new(bigdecimal_to_decimal(d)?))),
        FieldValue::Boolean(b) => Value::Bool(Some(*b)),
        FieldValue::Date(d) => Value::ChronoDate(Some(Box::new(*d))),
        FieldValue::DateTime(dt) => Value::ChronoDateTime(Some(Box::new(*dt))),
        FieldValue::Binary(bytes) => Value::Bytes(Some(Box::new(bytes.clone()))),
    })
}

fn null_of(value_type: FieldType) -> Value {
    match value_type {
        FieldType::Integer => Value::BigInt(None),
        FieldType::Decimal => Value::Decimal(None),
        FieldType::Boolean => Value::Bool(None),
        FieldType::Date => Value::ChronoDate(None),
        FieldType::DateTime => Value::ChronoDateTime(None),
        FieldType::Binary => Value::Bytes(None),
        FieldType::String
        | FieldType::Enum
        | FieldType::RelationToOne
        | FieldType::RelationToMany => Value::String(None),
    }
}

/* ---------- LIKE helpers ---------- */

pub(crate) const LIKE_ESCAPE: char = '!';

pub fn like_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '%' | '_' | LIKE_ESCAPE => {
                out.push(LIKE_ESCAPE);
                out.push(ch);
            }
            c => out.push(c),
        }
    }
    out
}

pub fn like_contains(s: &str) -> String {
    format!("%{}%", like_escape(s))
}

/// Upper-case forms of the needle's non-ASCII letters, paired with the
/// lower-case letter they fold to. Sorted so the SQL is stable.
fn non_ascii_folds(needle: &str) -> Vec<(char, char)> {
    let mut folds: Vec<(char, char)> = needle
        .chars()
        .filter(|c| !c.is_ascii())
        .filter_map(|lower| {
            let mut upper = lower.to_uppercase();
            match (upper.next(), upper.next()) {
                (Some(u), None) if u != lower && u.to_lowercase().eq([lower]) => Some((u, lower)),
                _ => None,
            }
        })
        .collect();
    folds.sort_unstable();
    folds.dedup();
    folds
}

/// The column as lower-case text, comparable with a lower-cased `needle`.
///
/// Booleans read `true`/`false` on every engine. SQLite's `LOWER` only folds
/// ASCII, so upper-case forms of the needle's other letters are replaced
/// first: `LOWER(REPLACE(CAST(col AS TEXT), 'Ë', 'ë'))`.
fn text_of(column: &str, value_type: FieldType, needle: &str) -> Expr {
    if value_type == FieldType::Boolean {
        let col = || SimpleExpr::from(Expr::col(Alias::new(column)));
        return Expr::expr(Expr::case(col(), "true").case(col().not(), "false"));
    }
    let text = SimpleExpr::from(Func::cast_as(
        Expr::col(Alias::new(column)),
        Alias::new("TEXT"),
    ));
    let folded = non_ascii_folds(needle)
        .into_iter()
        .fold(text, |acc, (upper, lower)| {
            Func::cust(Alias::new("REPLACE"))
                .arg(acc)
                .arg(upper.to_string())
                .arg(lower.to_string())
                .into()
        });
    Expr::expr(Func::lower(folded))
}

/* ---------- Expr (AST) -> Condition ---------- */

pub fn expr_to_condition(expr: &Ast, schema: &SchemaDescriptor) -> Result<Condition> {
    Ok(match expr {
        Ast::And(parts) => parts.iter().try_fold(Condition::all(), |acc, p| {
            Ok::<_, DbError>(acc.add(expr_to_condition(p, schema)?))
        })?,
        Ast::Or(parts) => parts.iter().try_fold(Condition::any(), |acc, p| {
            Ok::<_, DbError>(acc.add(expr_to_condition(p, schema)?))
        })?,
        Ast::Compare { field, op, value } => Condition::all().add(compare(schema, field, *op, value)?),
    })
}

fn compare(
    schema: &SchemaDescriptor,
    field: &str,
    op: CompareOp,
    value: &FieldValue,
) -> Result<SimpleExpr> {
    let f = schema
        .field(field)
        .filter(|f| f.has_column())
        .ok_or_else(|| DbError::UnknownField {
            schema: schema.class_name().to_string(),
            field: field.to_string(),
        })?;
    let col = f.column();

    Ok(match op {
        CompareOp::TextEquals => {
            let needle = text_operand(value);
            text_of(col, f.value_type(), &needle).eq(needle)
        }
        CompareOp::TextContains => {
            let needle = text_operand(value);
            text_of(col, f.value_type(), &needle)
                .like(LikeExpr::new(like_contains(&needle)).escape(LIKE_ESCAPE))
        }
        CompareOp::Eq => Expr::col(Alias::new(col)).eq(to_sea_value(value, f.value_type())?),
        CompareOp::Gt => Expr::col(Alias::new(col)).gt(to_sea_value(value, f.value_type())?),
        CompareOp::Lt => Expr::col(Alias::new(col)).lt(to_sea_value(value, f.value_type())?),
    })
}

fn text_operand(value: &FieldValue) -> String {
    value.to_string().to_lowercase()
}
