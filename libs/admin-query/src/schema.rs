//! Schema metadata: entity types, their fields and capabilities.
//!
//! Schemas are declared explicitly (builder API or YAML/JSON via serde) and
//! resolved once into an immutable [`SchemaRegistry`]. Relation key types are
//! filled in from the referenced schema's primary key at that point.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::{Error, Operation, Result};

/// Closed set of semantic field types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    String,
    Integer,
    Decimal,
    Boolean,
    Date,
    DateTime,
    Enum,
    RelationToOne,
    RelationToMany,
    Binary,
}

impl FieldType {
    pub fn as_str(self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Integer => "integer",
            FieldType::Decimal => "decimal",
            FieldType::Boolean => "boolean",
            FieldType::Date => "date",
            FieldType::DateTime => "datetime",
            FieldType::Enum => "enum",
            FieldType::RelationToOne => "relation_to_one",
            FieldType::RelationToMany => "relation_to_many",
            FieldType::Binary => "binary",
        }
    }

    /// Supports `gt`/`lt` comparisons and sorting.
    pub fn is_orderable(self) -> bool {
        !matches!(
            self,
            FieldType::Boolean | FieldType::Binary | FieldType::RelationToMany
        )
    }

    pub fn is_filterable(self) -> bool {
        !matches!(self, FieldType::Binary | FieldType::RelationToMany)
    }

    pub fn is_relation(self) -> bool {
        matches!(self, FieldType::RelationToOne | FieldType::RelationToMany)
    }

    /// Stored as a column on the entity's own table.
    pub fn has_column(self) -> bool {
        self != FieldType::RelationToMany
    }

    fn can_be_primary_key(self) -> bool {
        matches!(
            self,
            FieldType::String
                | FieldType::Integer
                | FieldType::Decimal
                | FieldType::Date
                | FieldType::DateTime
                | FieldType::Enum
        )
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Link table backing a to-many relation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JoinTable {
    pub table: String,
    /// Column holding the owning entity's primary key.
    pub source_column: String,
    /// Column holding the referenced entity's primary key.
    pub target_column: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Relation {
    pub target: String,
    /// Primary-key type of `target`; the value type of the relation.
    pub key_type: FieldType,
    pub join: Option<JoinTable>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldDescriptor {
    name: String,
    column: String,
    field_type: FieldType,
    primary_key: bool,
    nullable: bool,
    relation: Option<Relation>,
}

impl FieldDescriptor {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn column(&self) -> &str {
        &self.column
    }

    pub fn field_type(&self) -> FieldType {
        self.field_type
    }

    pub fn is_primary_key(&self) -> bool {
        self.primary_key
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    pub fn relation(&self) -> Option<&Relation> {
        self.relation.as_ref()
    }

    /// Scalar type values of this field are parsed into.
    pub fn value_type(&self) -> FieldType {
        match (&self.relation, self.field_type) {
            (Some(rel), _) => rel.key_type,
            (None, t) => t,
        }
    }

    pub fn has_column(&self) -> bool {
        self.field_type.has_column()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SchemaDescriptor {
    class_name: String,
    table: String,
    namespace: String,
    fields: Vec<FieldDescriptor>,
    pk: usize,
    create_enabled: bool,
    edit_enabled: bool,
    delete_enabled: bool,
}

impl SchemaDescriptor {
    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Fields in declaration order.
    pub fn sorted_fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn primary_key(&self) -> &FieldDescriptor {
        &self.fields[self.pk]
    }

    /// Exact match first, then ASCII case-insensitive.
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .or_else(|| self.fields.iter().find(|f| f.name.eq_ignore_ascii_case(name)))
    }

    pub fn field_by_name(&self, name: &str) -> Result<&FieldDescriptor> {
        self.field(name).ok_or_else(|| Error::UnknownField {
            schema: self.class_name.clone(),
            field: name.to_string(),
        })
    }

    pub fn string_fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields
            .iter()
            .filter(|f| f.field_type == FieldType::String)
    }

    /// Fields stored on the root table.
    pub fn columns(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.iter().filter(|f| f.has_column())
    }

    pub fn to_many_fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields
            .iter()
            .filter(|f| f.field_type == FieldType::RelationToMany)
    }

    pub fn is_enabled(&self, op: Operation) -> bool {
        match op {
            Operation::Create => self.create_enabled,
            Operation::Edit => self.edit_enabled,
            Operation::Delete => self.delete_enabled,
        }
    }

    pub fn ensure_enabled(&self, op: Operation) -> Result<()> {
        if self.is_enabled(op) {
            Ok(())
        } else {
            Err(Error::OperationDisabled {
                schema: self.class_name.clone(),
                operation: op,
            })
        }
    }
}

/* ---------- declarations ---------- */

fn enabled() -> bool {
    true
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldDecl {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default)]
    pub primary_key: bool,
    /// Defaults to `true` for everything but the primary key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nullable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub references: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub join_table: Option<JoinTable>,
}

impl FieldDecl {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            column: None,
            field_type,
            primary_key: false,
            nullable: None,
            references: None,
            join_table: None,
        }
    }

    pub fn column(mut self, column: impl Into<String>) -> Self {
        self.column = Some(column.into());
        self
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    pub fn required(mut self) -> Self {
        self.nullable = Some(false);
        self
    }

    pub fn references(mut self, target: impl Into<String>) -> Self {
        self.references = Some(target.into());
        self
    }

    pub fn join_table(
        mut self,
        table: impl Into<String>,
        source_column: impl Into<String>,
        target_column: impl Into<String>,
    ) -> Self {
        self.join_table = Some(JoinTable {
            table: table.into(),
            source_column: source_column.into(),
            target_column: target_column.into(),
        });
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SchemaDecl {
    pub class_name: String,
    pub table: String,
    #[serde(default)]
    pub namespace: String,
    #[serde(default = "enabled")]
    pub create_enabled: bool,
    #[serde(default = "enabled")]
    pub edit_enabled: bool,
    #[serde(default = "enabled")]
    pub delete_enabled: bool,
    pub fields: Vec<FieldDecl>,
}

impl SchemaDecl {
    pub fn new(class_name: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            table: table.into(),
            namespace: String::new(),
            create_enabled: true,
            edit_enabled: true,
            delete_enabled: true,
            fields: Vec::new(),
        }
    }

    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    pub fn field(mut self, field: FieldDecl) -> Self {
        self.fields.push(field);
        self
    }

    pub fn disable(mut self, op: Operation) -> Self {
        match op {
            Operation::Create => self.create_enabled = false,
            Operation::Edit => self.edit_enabled = false,
            Operation::Delete => self.delete_enabled = false,
        }
        self
    }
}

/* ---------- registry ---------- */

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("schema '{0}' declared more than once")]
    DuplicateSchema(String),

    #[error("field '{field}' declared more than once on {schema}")]
    DuplicateField { schema: String, field: String },

    #[error("{0} has no primary key field")]
    MissingPrimaryKey(String),

    #[error("{schema} declares several primary keys: {fields:?}")]
    MultiplePrimaryKeys { schema: String, fields: Vec<String> },

    #[error("{schema}.{field}: {field_type} cannot be a primary key")]
    InvalidPrimaryKey {
        schema: String,
        field: String,
        field_type: FieldType,
    },

    #[error("{schema}.{field}: relation field needs `references`")]
    MissingRelationTarget { schema: String, field: String },

    #[error("{schema}.{field}: `references` is only valid on relation fields")]
    UnexpectedRelationTarget { schema: String, field: String },

    #[error("{schema}.{field}: unknown relation target '{target}'")]
    UnknownRelationTarget {
        schema: String,
        field: String,
        target: String,
    },

    #[error("{schema}.{field}: to-many relation needs `join_table`")]
    MissingJoinTable { schema: String, field: String },

    #[error("{schema}.{field}: `join_table` is only valid on to-many relations")]
    UnexpectedJoinTable { schema: String, field: String },
}

/// Immutable, process-wide set of schemas.
#[derive(Clone, Debug, Default)]
pub struct SchemaRegistry {
    schemas: Vec<SchemaDescriptor>,
    by_name: HashMap<String, usize>,
}

impl SchemaRegistry {
    /// Validate declarations and resolve relation key types.
    pub fn build(decls: Vec<SchemaDecl>) -> std::result::Result<Self, SchemaError> {
        let mut by_name = HashMap::with_capacity(decls.len());
        for (i, d) in decls.iter().enumerate() {
            if by_name.insert(d.class_name.clone(), i).is_some() {
                return Err(SchemaError::DuplicateSchema(d.class_name.clone()));
            }
        }

        // Primary-key types first, so relations can be resolved in any order.
        let mut pk_types = HashMap::with_capacity(decls.len());
        for d in &decls {
            let pk = primary_key_of(d)?;
            pk_types.insert(d.class_name.clone(), pk.field_type);
        }

        let mut schemas = Vec::with_capacity(decls.len());
        for d in decls {
            schemas.push(resolve_schema(d, &pk_types)?);
        }

        tracing::debug!(count = schemas.len(), "schema registry built");
        Ok(Self { schemas, by_name })
    }

    pub fn list_schemas(&self) -> &[SchemaDescriptor] {
        &self.schemas
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    /// Exact class name first, then ASCII case-insensitive.
    pub fn find_by_class_name(&self, name: &str) -> Result<&SchemaDescriptor> {
        self.by_name
            .get(name)
            .map(|&i| &self.schemas[i])
            .or_else(|| {
                self.schemas
                    .iter()
                    .find(|s| s.class_name.eq_ignore_ascii_case(name))
            })
            .ok_or_else(|| Error::UnknownSchema(name.to_string()))
    }

    pub fn field_by_name<'a>(
        &self,
        schema: &'a SchemaDescriptor,
        name: &str,
    ) -> Result<&'a FieldDescriptor> {
        schema.field_by_name(name)
    }

    pub fn sorted_fields<'a>(&self, schema: &'a SchemaDescriptor) -> &'a [FieldDescriptor] {
        schema.sorted_fields()
    }

    /// Schemas whose class name or table contains `text`, ignoring case.
    pub fn search(&self, text: Option<&str>) -> Vec<&SchemaDescriptor> {
        let needle = text
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_lowercase);
        self.schemas
            .iter()
            .filter(|s| match &needle {
                None => true,
                Some(n) => {
                    s.class_name.to_lowercase().contains(n) || s.table.to_lowercase().contains(n)
                }
            })
            .collect()
    }

    /// Namespace → schemas, namespaces sorted, schemas in declaration order.
    pub fn grouped_by_namespace<'a>(
        schemas: impl IntoIterator<Item = &'a SchemaDescriptor>,
    ) -> BTreeMap<String, Vec<&'a SchemaDescriptor>> {
        let mut out: BTreeMap<String, Vec<&SchemaDescriptor>> = BTreeMap::new();
        for s in schemas {
            out.entry(s.namespace.clone()).or_default().push(s);
        }
        out
    }
}

fn primary_key_of(d: &SchemaDecl) -> std::result::Result<&FieldDecl, SchemaError> {
    let pks: Vec<&FieldDecl> = d.fields.iter().filter(|f| f.primary_key).collect();
    match pks.as_slice() {
        [] => Err(SchemaError::MissingPrimaryKey(d.class_name.clone())),
        [pk] if !pk.field_type.can_be_primary_key() => Err(SchemaError::InvalidPrimaryKey {
            schema: d.class_name.clone(),
            field: pk.name.clone(),
            field_type: pk.field_type,
        }),
        [pk] => Ok(pk),
        many => Err(SchemaError::MultiplePrimaryKeys {
            schema: d.class_name.clone(),
            fields: many.iter().map(|f| f.name.clone()).collect(),
        }),
    }
}

fn resolve_schema(
    d: SchemaDecl,
    pk_types: &HashMap<String, FieldType>,
) -> std::result::Result<SchemaDescriptor, SchemaError> {
    let mut seen = HashSet::new();
    let mut fields = Vec::with_capacity(d.fields.len());
    let mut pk = 0;

    for (i, f) in d.fields.into_iter().enumerate() {
        if !seen.insert(f.name.clone()) {
            return Err(SchemaError::DuplicateField {
                schema: d.class_name,
                field: f.name,
            });
        }
        if f.primary_key {
            pk = i;
        }

        let err_ctx = || (d.class_name.clone(), f.name.clone());
        let relation = match (f.field_type, f.references) {
            (FieldType::RelationToOne | FieldType::RelationToMany, None) => {
                let (schema, field) = err_ctx();
                return Err(SchemaError::MissingRelationTarget { schema, field });
            }
            (FieldType::RelationToOne | FieldType::RelationToMany, Some(target)) => {
                let key_type = match pk_types.get(&target) {
                    Some(t) => *t,
                    None => {
                        let (schema, field) = err_ctx();
                        return Err(SchemaError::UnknownRelationTarget {
                            schema,
                            field,
                            target,
                        });
                    }
                };
                let join = match (f.field_type, f.join_table) {
                    (FieldType::RelationToMany, None) => {
                        let (schema, field) = err_ctx();
                        return Err(SchemaError::MissingJoinTable { schema, field });
                    }
                    (FieldType::RelationToOne, Some(_)) => {
                        let (schema, field) = err_ctx();
                        return Err(SchemaError::UnexpectedJoinTable { schema, field });
                    }
                    (_, join) => join,
                };
                Some(Relation {
                    target,
                    key_type,
                    join,
                })
            }
            (_, Some(_)) => {
                let (schema, field) = err_ctx();
                return Err(SchemaError::UnexpectedRelationTarget { schema, field });
            }
            (_, None) => {
                if f.join_table.is_some() {
                    let (schema, field) = err_ctx();
                    return Err(SchemaError::UnexpectedJoinTable { schema, field });
                }
                None
            }
        };

        fields.push(FieldDescriptor {
            column: f.column.unwrap_or_else(|| f.name.clone()),
            nullable: !f.primary_key && f.nullable.unwrap_or(true),
            name: f.name,
            field_type: f.field_type,
            primary_key: f.primary_key,
            relation,
        });
    }

    Ok(SchemaDescriptor {
        class_name: d.class_name,
        table: d.table,
        namespace: d.namespace,
        fields,
        pk,
        create_enabled: d.create_enabled,
        edit_enabled: d.edit_enabled,
        delete_enabled: d.delete_enabled,
    })
}
