use admin_query::{FieldValue, Record, SchemaDescriptor};
use async_trait::async_trait;

use crate::contract::{
    error::AdminError,
    model::{BulkDeleteReport, ListOutcome, NamespaceGroup, SaveOutcome, Uploads},
};

/// Public API of the entity admin module.
///
/// Requests use raw, untyped input (query pairs, form pairs, id strings);
/// typing happens behind this trait.
#[async_trait]
pub trait EntityAdminApi: Send + Sync {
    /// Schemas matching `text`, grouped by namespace, with row counts.
    async fn index(&self, text: Option<&str>) -> Result<Vec<NamespaceGroup>, AdminError>;

    fn schema(&self, class_name: &str) -> Result<SchemaDescriptor, AdminError>;

    async fn list(
        &self,
        class_name: &str,
        params: &[(String, String)],
    ) -> Result<ListOutcome, AdminError>;

    async fn get(&self, class_name: &str, id: &str) -> Result<Record, AdminError>;

    /// Create-or-edit form submission.
    async fn save(
        &self,
        class_name: &str,
        form: &[(String, String)],
        uploads: &Uploads,
    ) -> Result<SaveOutcome, AdminError>;

    async fn delete(&self, class_name: &str, id: &str) -> Result<FieldValue, AdminError>;

    async fn delete_many(
        &self,
        class_name: &str,
        ids: &[String],
    ) -> Result<BulkDeleteReport, AdminError>;
}
