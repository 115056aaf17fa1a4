//! Per-schema statement builders over `sea_query`.
//!
//! Tables and columns come from the schema registry at runtime, so every
//! identifier goes through `Alias`; values are always bound.

use admin_query::{FieldValue, PageWindow, SchemaDescriptor, SortDir, SortKey};
use sea_orm::sea_query::{
    Alias, DeleteStatement, Expr, InsertStatement, Order, Query, SelectStatement, SimpleExpr,
    UpdateStatement,
};
use sea_orm::Condition;

use crate::condition::to_sea_value;
use crate::{DbError, Result};

/// Alias of the `COUNT(pk)` column.
pub const COUNT_ALIAS: &str = "total";

fn column_of<'a>(schema: &'a SchemaDescriptor, field: &str) -> Result<&'a str> {
    schema
        .field(field)
        .filter(|f| f.has_column())
        .map(|f| f.column())
        .ok_or_else(|| DbError::UnknownField {
            schema: schema.class_name().to_string(),
            field: field.to_string(),
        })
}

fn pk_eq(schema: &SchemaDescriptor, pk: &FieldValue) -> Result<SimpleExpr> {
    let pk_field = schema.primary_key();
    Ok(Expr::col(Alias::new(pk_field.column())).eq(to_sea_value(pk, pk_field.value_type())?))
}

/// `SELECT COUNT(pk) AS total FROM t [WHERE cond]`
pub fn count(schema: &SchemaDescriptor, cond: Option<Condition>) -> SelectStatement {
    let mut q = Query::select();
    q.expr_as(
        Expr::col(Alias::new(schema.primary_key().column())).count(),
        Alias::new(COUNT_ALIAS),
    )
    .from(Alias::new(schema.table()));
    if let Some(cond) = cond {
        q.cond_where(cond);
    }
    q
}

/// Root columns in schema order.
fn select_columns(schema: &SchemaDescriptor) -> SelectStatement {
    let mut q = Query::select();
    q.columns(schema.columns().map(|f| Alias::new(f.column())))
        .from(Alias::new(schema.table()));
    q
}

/// One page of rows ordered by `keys`.
pub fn select_page(
    schema: &SchemaDescriptor,
    cond: Option<Condition>,
    keys: &[SortKey],
    window: PageWindow,
) -> Result<SelectStatement> {
    let mut q = select_columns(schema);
    if let Some(cond) = cond {
        q.cond_where(cond);
    }
    for key in keys {
        let order = match key.dir {
            SortDir::Asc => Order::Asc,
            SortDir::Desc => Order::Desc,
        };
        q.order_by(Alias::new(column_of(schema, &key.field)?), order);
    }
    q.limit(window.limit()).offset(window.offset());
    Ok(q)
}

pub fn select_by_pk(schema: &SchemaDescriptor, pk: &FieldValue) -> Result<SelectStatement> {
    let mut q = select_columns(schema);
    q.and_where(pk_eq(schema, pk)?);
    Ok(q)
}

/// `INSERT ... RETURNING pk`; `DEFAULT VALUES` when nothing is set.
///
/// `values` are `(logical field, value)` pairs for root columns.
pub fn insert(schema: &SchemaDescriptor, values: &[(String, FieldValue)]) -> Result<InsertStatement> {
    let mut columns = Vec::with_capacity(values.len());
    let mut exprs: Vec<SimpleExpr> = Vec::with_capacity(values.len());
    for (name, value) in values {
        let field = schema.field_by_name(name).map_err(|_| DbError::UnknownField {
            schema: schema.class_name().to_string(),
            field: name.clone(),
        })?;
        columns.push(Alias::new(column_of(schema, field.name())?));
        exprs.push(to_sea_value(value, field.value_type())?.into());
    }

    let mut q = Query::insert();
    q.into_table(Alias::new(schema.table()))
        .returning_col(Alias::new(schema.primary_key().column()));
    if exprs.is_empty() {
        q.or_default_values();
    } else {
        q.columns(columns).values(exprs)?;
    }
    Ok(q)
}

/// `UPDATE ... WHERE pk = ?`; `None` when there is nothing to set.
pub fn update(
    schema: &SchemaDescriptor,
    pk: &FieldValue,
    values: &[(String, FieldValue)],
) -> Result<Option<UpdateStatement>> {
    let pk_name = schema.primary_key().name();
    let mut sets = Vec::with_capacity(values.len());
    for (name, value) in values.iter().filter(|(n, _)| n != pk_name) {
        let field = schema.field(name).ok_or_else(|| DbError::UnknownField {
            schema: schema.class_name().to_string(),
            field: name.clone(),
        })?;
        sets.push((
            Alias::new(column_of(schema, field.name())?),
            SimpleExpr::from(to_sea_value(value, field.value_type())?),
        ));
    }
    if sets.is_empty() {
        return Ok(None);
    }

    let mut q = Query::update();
    q.table(Alias::new(schema.table()))
        .values(sets)
        .and_where(pk_eq(schema, pk)?);
    Ok(Some(q))
}

pub fn delete(schema: &SchemaDescriptor, pk: &FieldValue) -> Result<DeleteStatement> {
    let mut q = Query::delete();
    q.from_table(Alias::new(schema.table()))
        .and_where(pk_eq(schema, pk)?);
    Ok(q)
}

/* ---------- to-many join tables ---------- */

fn join_of<'a>(
    schema: &'a SchemaDescriptor,
    field: &str,
) -> Result<(&'a admin_query::JoinTable, admin_query::FieldType)> {
    schema
        .field(field)
        .and_then(|f| f.relation().map(|r| (r, f.value_type())))
        .and_then(|(r, key_type)| r.join.as_ref().map(|j| (j, key_type)))
        .ok_or_else(|| DbError::UnknownField {
            schema: schema.class_name().to_string(),
            field: field.to_string(),
        })
}

/// Related keys of one to-many field for one owner.
pub fn select_related(
    schema: &SchemaDescriptor,
    field: &str,
    pk: &FieldValue,
) -> Result<SelectStatement> {
    let (join, _) = join_of(schema, field)?;
    let pk_type = schema.primary_key().value_type();
    let mut q = Query::select();
    q.column(Alias::new(&join.target_column))
        .from(Alias::new(&join.table))
        .and_where(Expr::col(Alias::new(&join.source_column)).eq(to_sea_value(pk, pk_type)?))
        .order_by(Alias::new(&join.target_column), Order::Asc);
    Ok(q)
}

pub fn clear_related(
    schema: &SchemaDescriptor,
    field: &str,
    pk: &FieldValue,
) -> Result<DeleteStatement> {
    let (join, _) = join_of(schema, field)?;
    let pk_type = schema.primary_key().value_type();
    let mut q = Query::delete();
    q.from_table(Alias::new(&join.table))
        .and_where(Expr::col(Alias::new(&join.source_column)).eq(to_sea_value(pk, pk_type)?));
    Ok(q)
}

/// `None` when `keys` is empty.
pub fn insert_related(
    schema: &SchemaDescriptor,
    field: &str,
    pk: &FieldValue,
    keys: &[FieldValue],
) -> Result<Option<InsertStatement>> {
    if keys.is_empty() {
        return Ok(None);
    }
    let (join, key_type) = join_of(schema, field)?;
    let pk_type = schema.primary_key().value_type();
    let owner = to_sea_value(pk, pk_type)?;

    let mut q = Query::insert();
    q.into_table(Alias::new(&join.table)).columns([
        Alias::new(&join.source_column),
        Alias::new(&join.target_column),
    ]);
    for key in keys {
        q.values([
            SimpleExpr::from(owner.clone()),
            SimpleExpr::from(to_sea_value(key, key_type)?),
        ])?;
    }
    Ok(Some(q))
}
