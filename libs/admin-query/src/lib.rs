//! Schema-driven query and predicate engine for entity administration.
//!
//! Pure and synchronous: schemas, typed values, filters, the condition tree,
//! the faceted-search URL codec and pagination. Store access lives elsewhere.

pub mod ast;
pub mod error;
pub mod facets;
pub mod filter;
pub mod page;
pub mod params;
pub mod predicate;
pub mod record;
pub mod schema;
pub mod value;

pub use ast::{CompareOp, Expr};
pub use error::{Error, ErrorKind, FieldViolation, Operation, Result, ValidationErrors, ViolationKind};
pub use facets::FacetEncoding;
pub use filter::{CompareOperator, FilterSet, QueryFilter};
pub use page::{page_count, validate_page, PageWindow, PaginatedResult};
pub use params::{ListDefaults, ListParams};
pub use predicate::{build_predicate, SortDir, SortKey, SortSpec};
pub use record::Record;
pub use schema::{
    FieldDecl, FieldDescriptor, FieldType, JoinTable, Relation, SchemaDecl, SchemaDescriptor,
    SchemaError, SchemaRegistry,
};
pub use value::FieldValue;
