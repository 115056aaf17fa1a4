use async_trait::async_trait;
use std::sync::Arc;

use admin_query::{FieldValue, Record, SchemaDescriptor};

use crate::contract::{
    client::EntityAdminApi,
    error::AdminError,
    model::{BulkDeleteReport, ListOutcome, NamespaceGroup, SaveOutcome, Uploads},
};
use crate::domain::service::Service;

/// Local implementation of the EntityAdminApi trait that delegates to the domain service
pub struct EntityAdminLocalClient {
    service: Arc<Service>,
}

impl EntityAdminLocalClient {
    pub fn new(service: Arc<Service>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl EntityAdminApi for EntityAdminLocalClient {
    async fn index(&self, text: Option<&str>) -> Result<Vec<NamespaceGroup>, AdminError> {
        self.service.index(text).await.map_err(Into::into)
    }

    fn schema(&self, class_name: &str) -> Result<SchemaDescriptor, AdminError> {
        self.service
            .schema(class_name)
            .cloned()
            .map_err(Into::into)
    }

    async fn list(
        &self,
        class_name: &str,
        params: &[(String, String)],
    ) -> Result<ListOutcome, AdminError> {
        self.service
            .list(class_name, params)
            .await
            .map_err(Into::into)
    }

    async fn get(&self, class_name: &str, id: &str) -> Result<Record, AdminError> {
        self.service.get(class_name, id).await.map_err(Into::into)
    }

    async fn save(
        &self,
        class_name: &str,
        form: &[(String, String)],
        uploads: &Uploads,
    ) -> Result<SaveOutcome, AdminError> {
        self.service
            .save(class_name, form, uploads)
            .await
            .map_err(Into::into)
    }

    async fn delete(&self, class_name: &str, id: &str) -> Result<FieldValue, AdminError> {
        self.service.delete(class_name, id).await.map_err(Into::into)
    }

    async fn delete_many(
        &self,
        class_name: &str,
        ids: &[String],
    ) -> Result<BulkDeleteReport, AdminError> {
        self.service
            .delete_many(class_name, ids)
            .await
            .map_err(Into::into)
    }
}
