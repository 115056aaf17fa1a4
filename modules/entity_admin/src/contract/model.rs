use std::collections::BTreeMap;

use admin_query::{FieldValue, FilterSet, PaginatedResult, Record, SortSpec};
use serde::Serialize;

/// Hidden form flag: `true` for the create form, `false` for the edit form.
pub const CREATE_FLAG: &str = "__dbadmin_create";

/// Suffix marking the values of a to-many relation.
pub const RELATION_SUFFIX: &str = "[]";

/// Uploaded file contents keyed by field name.
pub type Uploads = BTreeMap<String, Vec<u8>>;

/// One schema on the index page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexEntry {
    pub class_name: String,
    pub table: String,
    pub count: u64,
}

/// Index entries sharing a namespace, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NamespaceGroup {
    pub namespace: String,
    pub entries: Vec<IndexEntry>,
}

/// A rendered list request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListPage {
    pub schema: String,
    pub query: Option<String>,
    pub filters: FilterSet,
    pub sort: SortSpec,
    #[serde(flatten)]
    pub result: PaginatedResult<Record>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ListOutcome {
    /// The request removed filters; follow this query string instead.
    Redirect { location: String },
    Page(ListPage),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SaveOutcome {
    pub pk: FieldValue,
    pub created: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeleteFailure {
    pub id: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BulkDeleteReport {
    pub deleted: u64,
    pub failures: Vec<DeleteFailure>,
}
