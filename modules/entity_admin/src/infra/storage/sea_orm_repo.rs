//! SeaORM-backed repository implementation for the domain port.
//!
//! This struct is generic over `C: ConnectionTrait + TransactionTrait`, so it
//! can be built over a `DatabaseConnection` or any other connection handle.
//! Statements come from `admin_db::statements`; tables and columns are only
//! known at runtime, so there are no SeaORM entities here.

use admin_db::{classify_db_err, expr_to_condition, rows, statements, DbError};
use admin_query::{
    build_predicate, FieldValue, FilterSet, PageWindow, Record, SchemaDescriptor, SortSpec,
    ValidationErrors, ViolationKind,
};
use sea_orm::{
    Condition, ConnectionTrait, DbErr, ExecResult, QueryResult, StatementBuilder,
    TransactionTrait,
};
use tracing::{instrument, trace};

use crate::domain::error::{DomainError, DomainResult};
use crate::domain::form::{RelationValues, TypedValues};
use crate::domain::repo::AdminRepository;

/// SeaORM repository impl.
/// Holds a connection object; its lifetime/ownership is up to the caller.
pub struct SeaOrmAdminRepository<C>
where
    C: ConnectionTrait + TransactionTrait + Send + Sync,
{
    conn: C,
}

impl<C> SeaOrmAdminRepository<C>
where
    C: ConnectionTrait + TransactionTrait + Send + Sync,
{
    pub fn new(conn: C) -> Self {
        Self { conn }
    }
}

/// Constraint failures become validation reports; everything else stays raw.
fn store_err(schema: &SchemaDescriptor, err: DbErr) -> DomainError {
    match classify_db_err(&err) {
        Some(violation) => DomainError::validation(violation.into_validation(schema)),
        None => DomainError::database(err.to_string()),
    }
}

fn build_err(err: DbError) -> DomainError {
    DomainError::database(err.to_string())
}

fn condition(
    schema: &SchemaDescriptor,
    text: Option<&str>,
    filters: &FilterSet,
) -> DomainResult<Option<Condition>> {
    build_predicate(schema, text, filters)?
        .map(|expr| expr_to_condition(&expr, schema).map_err(build_err))
        .transpose()
}

async fn query_one<C, S>(conn: &C, schema: &SchemaDescriptor, stmt: &S) -> DomainResult<Option<QueryResult>>
where
    C: ConnectionTrait + Sync,
    S: StatementBuilder + Sync,
{
    let stmt = conn.get_database_backend().build(stmt);
    trace!(sql = %stmt.sql, "query_one");
    conn.query_one(stmt).await.map_err(|e| store_err(schema, e))
}

async fn query_all<C, S>(conn: &C, schema: &SchemaDescriptor, stmt: &S) -> DomainResult<Vec<QueryResult>>
where
    C: ConnectionTrait + Sync,
    S: StatementBuilder + Sync,
{
    let stmt = conn.get_database_backend().build(stmt);
    trace!(sql = %stmt.sql, "query_all");
    conn.query_all(stmt).await.map_err(|e| store_err(schema, e))
}

async fn execute<C, S>(conn: &C, schema: &SchemaDescriptor, stmt: &S) -> DomainResult<ExecResult>
where
    C: ConnectionTrait + Sync,
    S: StatementBuilder + Sync,
{
    let stmt = conn.get_database_backend().build(stmt);
    trace!(sql = %stmt.sql, "execute");
    conn.execute(stmt).await.map_err(|e| store_err(schema, e))
}

#[async_trait::async_trait]
impl<C> AdminRepository for SeaOrmAdminRepository<C>
where
    C: ConnectionTrait + TransactionTrait + Send + Sync + 'static,
{
    #[instrument(name = "entity_admin.repo.count", skip_all, fields(schema = %schema.class_name()))]
    async fn count(
        &self,
        schema: &SchemaDescriptor,
        text: Option<&str>,
        filters: &FilterSet,
    ) -> DomainResult<u64> {
        let stmt = statements::count(schema, condition(schema, text, filters)?);
        match query_one(&self.conn, schema, &stmt).await? {
            Some(row) => rows::decode_count(&row).map_err(build_err),
            None => Ok(0),
        }
    }

    #[instrument(name = "entity_admin.repo.search", skip_all, fields(schema = %schema.class_name(), page = window.page()))]
    async fn search(
        &self,
        schema: &SchemaDescriptor,
        text: Option<&str>,
        filters: &FilterSet,
        sort: &SortSpec,
        window: PageWindow,
    ) -> DomainResult<Vec<Record>> {
        let stmt = statements::select_page(
            schema,
            condition(schema, text, filters)?,
            &sort.keys(schema),
            window,
        )
        .map_err(build_err)?;
        query_all(&self.conn, schema, &stmt)
            .await?
            .iter()
            .map(|row| rows::decode_record(row, schema).map_err(build_err))
            .collect()
    }

    #[instrument(name = "entity_admin.repo.find_by_id", skip_all, fields(schema = %schema.class_name(), pk = %pk))]
    async fn find_by_id(
        &self,
        schema: &SchemaDescriptor,
        pk: &FieldValue,
    ) -> DomainResult<Option<Record>> {
        let stmt = statements::select_by_pk(schema, pk).map_err(build_err)?;
        let Some(row) = query_one(&self.conn, schema, &stmt).await? else {
            return Ok(None);
        };
        let mut record = rows::decode_record(&row, schema).map_err(build_err)?;

        for field in schema.to_many_fields() {
            let Some(join) = field.relation().and_then(|r| r.join.as_ref()) else {
                continue;
            };
            let stmt = statements::select_related(schema, field.name(), pk).map_err(build_err)?;
            let keys = query_all(&self.conn, schema, &stmt)
                .await?
                .iter()
                .map(|row| {
                    rows::decode_value(row, &join.target_column, field.value_type())
                        .map_err(build_err)
                })
                .collect::<DomainResult<Vec<_>>>()?;
            record.set_relation(field.name(), keys);
        }
        Ok(Some(record))
    }

    #[instrument(name = "entity_admin.repo.create", skip_all, fields(schema = %schema.class_name(), explicit_pk = explicit_pk))]
    async fn create(
        &self,
        schema: &SchemaDescriptor,
        values: &TypedValues,
        explicit_pk: bool,
    ) -> DomainResult<FieldValue> {
        let values = if explicit_pk {
            values.values().to_vec()
        } else {
            values.without_primary_key(schema)
        };
        let stmt = statements::insert(schema, &values).map_err(build_err)?;
        let pk = schema.primary_key();
        let row = query_one(&self.conn, schema, &stmt)
            .await?
            .ok_or_else(|| DomainError::database("insert returned no primary key"))?;
        rows::decode_value(&row, pk.column(), pk.value_type()).map_err(build_err)
    }

    #[instrument(name = "entity_admin.repo.update", skip_all, fields(schema = %schema.class_name()))]
    async fn update(&self, schema: &SchemaDescriptor, values: &TypedValues) -> DomainResult<()> {
        let pk_name = schema.primary_key().name();
        let pk = values.primary_key(schema).ok_or_else(|| {
            DomainError::validation(ValidationErrors::single(
                Some(pk_name.to_string()),
                ViolationKind::Required,
                format!("'{pk_name}' is required to edit a {}", schema.class_name()),
            ))
        })?;
        let Some(stmt) = statements::update(schema, pk, values.values()).map_err(build_err)? else {
            return Ok(());
        };
        if execute(&self.conn, schema, &stmt).await?.rows_affected() == 0 {
            return Err(DomainError::record_not_found(schema.class_name(), pk));
        }
        Ok(())
    }

    #[instrument(name = "entity_admin.repo.delete", skip_all, fields(schema = %schema.class_name(), pk = %pk))]
    async fn delete(&self, schema: &SchemaDescriptor, pk: &FieldValue) -> DomainResult<bool> {
        let stmt = statements::delete(schema, pk).map_err(build_err)?;
        Ok(execute(&self.conn, schema, &stmt).await?.rows_affected() > 0)
    }

    #[instrument(name = "entity_admin.repo.attach_relation", skip_all, fields(schema = %schema.class_name(), pk = %pk))]
    async fn attach_relation(
        &self,
        schema: &SchemaDescriptor,
        pk: &FieldValue,
        relations: &RelationValues,
    ) -> DomainResult<()> {
        let txn = self.conn.begin().await.map_err(|e| store_err(schema, e))?;
        for (field, keys) in relations.iter() {
            let clear = statements::clear_related(schema, field, pk).map_err(build_err)?;
            execute(&txn, schema, &clear).await?;
            if let Some(insert) =
                statements::insert_related(schema, field, pk, keys).map_err(build_err)?
            {
                execute(&txn, schema, &insert).await?;
            }
            trace!(field, keys = keys.len(), "relation replaced");
        }
        txn.commit().await.map_err(|e| store_err(schema, e))
    }
}
