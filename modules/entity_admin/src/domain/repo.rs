use admin_query::{FieldValue, FilterSet, PageWindow, Record, SchemaDescriptor, SortSpec};
use async_trait::async_trait;

use crate::domain::error::DomainResult;
use crate::domain::form::{RelationValues, TypedValues};

/// Port for the domain layer: persistence operations the domain needs.
/// Object-safe and async-friendly via `async_trait`.
///
/// Store constraint violations come back as `DomainError::Query(Validation)`,
/// one entry per violated field when the store names it.
#[async_trait]
pub trait AdminRepository: Send + Sync {
    /// Rows matching the free text and every filter.
    async fn count(
        &self,
        schema: &SchemaDescriptor,
        text: Option<&str>,
        filters: &FilterSet,
    ) -> DomainResult<u64>;

    /// One window of matching rows ordered by `sort` (primary key breaks ties).
    async fn search(
        &self,
        schema: &SchemaDescriptor,
        text: Option<&str>,
        filters: &FilterSet,
        sort: &SortSpec,
        window: PageWindow,
    ) -> DomainResult<Vec<Record>>;

    /// Load a record and the keys of its to-many relations.
    async fn find_by_id(
        &self,
        schema: &SchemaDescriptor,
        pk: &FieldValue,
    ) -> DomainResult<Option<Record>>;

    /// Insert and return the new primary key.
    ///
    /// Without `explicit_pk` the submitted key is dropped and the store
    /// generates one.
    async fn create(
        &self,
        schema: &SchemaDescriptor,
        values: &TypedValues,
        explicit_pk: bool,
    ) -> DomainResult<FieldValue>;

    /// Update the row named by the primary key in `values`.
    async fn update(&self, schema: &SchemaDescriptor, values: &TypedValues) -> DomainResult<()>;

    /// Delete by id. Returns true if a row was deleted.
    async fn delete(&self, schema: &SchemaDescriptor, pk: &FieldValue) -> DomainResult<bool>;

    /// Replace the join rows of every relation named in `relations`.
    async fn attach_relation(
        &self,
        schema: &SchemaDescriptor,
        pk: &FieldValue,
        relations: &RelationValues,
    ) -> DomainResult<()>;
}
