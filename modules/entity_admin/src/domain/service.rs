use std::sync::Arc;

use admin_query::facets::{self, FacetEncoding};
use admin_query::{
    validate_page, FieldValue, ListDefaults, ListParams, Operation, PaginatedResult, Record,
    SchemaDescriptor, SchemaRegistry,
};
use tracing::{debug, info, instrument, warn};

use crate::contract::model::{
    BulkDeleteReport, DeleteFailure, IndexEntry, ListOutcome, ListPage, NamespaceGroup,
    SaveOutcome,
};
use crate::domain::error::{DomainError, DomainResult};
use crate::domain::form::{self, RelationValues, TypedValues, Uploads, CREATE_FLAG};
use crate::domain::repo::AdminRepository;

/// Domain service: capability checks, list/search flow, form saving.
/// Depends only on the repository port, not on infra types.
#[derive(Clone)]
pub struct Service {
    registry: Arc<SchemaRegistry>,
    repo: Arc<dyn AdminRepository>,
    config: ServiceConfig,
}

/// Configuration for the domain service
#[derive(Debug, Clone, Copy, Default)]
pub struct ServiceConfig {
    pub list: ListDefaults,
    pub facet_encoding: FacetEncoding,
}

impl Service {
    /// Create a service with dependencies.
    pub fn new(
        registry: Arc<SchemaRegistry>,
        repo: Arc<dyn AdminRepository>,
        config: ServiceConfig,
    ) -> Self {
        Self {
            registry,
            repo,
            config,
        }
    }

    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    pub fn schema(&self, class_name: &str) -> DomainResult<&SchemaDescriptor> {
        Ok(self.registry.find_by_class_name(class_name)?)
    }

    fn parse_id(schema: &SchemaDescriptor, id: &str) -> DomainResult<FieldValue> {
        let pk = schema.primary_key();
        Ok(FieldValue::parse(pk.name(), pk.value_type(), id)?)
    }

    #[instrument(name = "entity_admin.service.index", skip(self))]
    pub async fn index(&self, text: Option<&str>) -> DomainResult<Vec<NamespaceGroup>> {
        let matching = self.registry.search(text);
        debug!(matches = matching.len(), "building schema index");

        let mut groups = Vec::new();
        for (namespace, schemas) in SchemaRegistry::grouped_by_namespace(matching) {
            let mut entries = Vec::with_capacity(schemas.len());
            for schema in schemas {
                let count = self.repo.count(schema, None, &Default::default()).await?;
                entries.push(IndexEntry {
                    class_name: schema.class_name().to_string(),
                    table: schema.table().to_string(),
                    count,
                });
            }
            groups.push(NamespaceGroup { namespace, entries });
        }
        Ok(groups)
    }

    /// Decode the request, then count → validate page → search.
    ///
    /// Requests carrying removal parameters never touch the store; they get
    /// the query string of the remaining filters instead.
    #[instrument(name = "entity_admin.service.list", skip(self, params))]
    pub async fn list(
        &self,
        class_name: &str,
        params: &[(String, String)],
    ) -> DomainResult<ListOutcome> {
        let schema = self.schema(class_name)?;

        if let Some(location) =
            facets::removal_redirect(schema, params, self.config.facet_encoding)?
        {
            debug!(%location, "filter removal redirect");
            return Ok(ListOutcome::Redirect { location });
        }

        let params = ListParams::from_pairs(schema, params, self.config.list)?;
        let text = params.query.as_deref();

        let total = self.repo.count(schema, text, &params.filters).await?;
        let window = validate_page(params.page, params.page_size, total)?;
        let items = if total == 0 {
            Vec::new()
        } else {
            self.repo
                .search(schema, text, &params.filters, &params.sort, window)
                .await?
        };
        debug!(total, returned = items.len(), "listed records");

        Ok(ListOutcome::Page(ListPage {
            schema: schema.class_name().to_string(),
            query: params.query,
            filters: params.filters,
            sort: params.sort,
            result: PaginatedResult::new(items, window, total),
        }))
    }

    #[instrument(name = "entity_admin.service.get", skip(self))]
    pub async fn get(&self, class_name: &str, id: &str) -> DomainResult<Record> {
        let schema = self.schema(class_name)?;
        let pk = Self::parse_id(schema, id)?;
        self.repo
            .find_by_id(schema, &pk)
            .await?
            .ok_or_else(|| DomainError::record_not_found(schema.class_name(), &pk))
    }

    /// Create-or-edit form flow.
    ///
    /// The `__dbadmin_create` flag tells the create form from the edit form.
    /// A blank key creates with a generated key; a key naming an existing row
    /// edits it (or is rejected by the create form); a key naming no row
    /// creates with that key. Relations are attached after the row write.
    #[instrument(name = "entity_admin.service.save", skip(self, form, uploads))]
    pub async fn save(
        &self,
        class_name: &str,
        form: &[(String, String)],
        uploads: &Uploads,
    ) -> DomainResult<SaveOutcome> {
        let schema = self.schema(class_name)?;
        let create_form = parse_create_flag(form)?;
        if create_form {
            schema.ensure_enabled(Operation::Create)?;
        }

        let relations = RelationValues::from_form(schema, form)?;
        let submitted_pk = form::primary_key_from_form(schema, form)?;

        let existing = match &submitted_pk {
            Some(pk) => self.repo.find_by_id(schema, pk).await?.is_some(),
            None => false,
        };

        let outcome = match (submitted_pk, existing) {
            (Some(pk), true) if create_form => {
                return Err(DomainError::already_exists(schema.class_name(), &pk));
            }
            (Some(pk), true) => {
                schema.ensure_enabled(Operation::Edit)?;
                let values = TypedValues::from_form(schema, form, uploads, Operation::Edit)?;
                self.repo.update(schema, &values).await?;
                info!(pk = %pk, "updated record");
                SaveOutcome { pk, created: false }
            }
            (submitted, _) => {
                schema.ensure_enabled(Operation::Create)?;
                let explicit = submitted.is_some();
                let values = TypedValues::from_form(schema, form, uploads, Operation::Create)?;
                let pk = self.repo.create(schema, &values, explicit).await?;
                info!(pk = %pk, explicit, "created record");
                SaveOutcome { pk, created: true }
            }
        };

        if !relations.is_empty() {
            self.repo
                .attach_relation(schema, &outcome.pk, &relations)
                .await?;
            debug!("attached relations");
        }
        Ok(outcome)
    }

    #[instrument(name = "entity_admin.service.delete", skip(self))]
    pub async fn delete(&self, class_name: &str, id: &str) -> DomainResult<FieldValue> {
        let schema = self.schema(class_name)?;
        schema.ensure_enabled(Operation::Delete)?;
        let pk = Self::parse_id(schema, id)?;

        if !self.repo.delete(schema, &pk).await? {
            return Err(DomainError::record_not_found(schema.class_name(), &pk));
        }
        info!(pk = %pk, "deleted record");
        Ok(pk)
    }

    /// Delete every id independently; failures are reported, not fatal.
    #[instrument(name = "entity_admin.service.delete_many", skip(self, ids), fields(ids = ids.len()))]
    pub async fn delete_many(
        &self,
        class_name: &str,
        ids: &[String],
    ) -> DomainResult<BulkDeleteReport> {
        let schema = self.schema(class_name)?;
        schema.ensure_enabled(Operation::Delete)?;

        let mut report = BulkDeleteReport::default();
        for id in ids {
            let outcome = match Self::parse_id(schema, id) {
                Ok(pk) => match self.repo.delete(schema, &pk).await {
                    Ok(true) => Ok(()),
                    Ok(false) => Err(DomainError::record_not_found(schema.class_name(), &pk)),
                    Err(e) => Err(e),
                },
                Err(e) => Err(e),
            };
            match outcome {
                Ok(()) => report.deleted += 1,
                Err(e) => {
                    warn!(%id, error = %e, "bulk delete entry failed");
                    report.failures.push(DeleteFailure {
                        id: id.clone(),
                        message: e.to_string(),
                    });
                }
            }
        }
        info!(deleted = report.deleted, failed = report.failures.len(), "bulk delete done");
        Ok(report)
    }
}

fn parse_create_flag(form: &[(String, String)]) -> DomainResult<bool> {
    let raw = form
        .iter()
        .rev()
        .find(|(k, _)| k == CREATE_FLAG)
        .map(|(_, v)| v.trim());
    match raw {
        Some("true") => Ok(true),
        Some("false") => Ok(false),
        other => Err(admin_query::Error::invalid_param(CREATE_FLAG, other.unwrap_or_default()).into()),
    }
}
