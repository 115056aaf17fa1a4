//! Raw form input → typed values.
//!
//! Every raw string is parsed with its field's value type before anything
//! reaches the store. Parsing never stops at the first failure: all rejected
//! fields end up in one [`ValidationErrors`] report.

use std::collections::BTreeMap;

use admin_query::{
    FieldDescriptor, FieldType, FieldValue, Operation, SchemaDescriptor, ValidationErrors,
    ViolationKind,
};

pub use crate::contract::model::{Uploads, CREATE_FLAG, RELATION_SUFFIX};

fn is_control_key(key: &str) -> bool {
    key.starts_with("__")
}

fn blank_is_null(field: &FieldDescriptor) -> bool {
    !matches!(field.field_type(), FieldType::String | FieldType::Enum)
}

fn is_blank(value: &FieldValue) -> bool {
    match value {
        FieldValue::Null => true,
        FieldValue::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

/// Root-column values of one create or edit request, in schema order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TypedValues {
    values: Vec<(String, FieldValue)>,
}

impl TypedValues {
    /// Type every submitted field of `schema`.
    ///
    /// Later duplicates of a key win. Binary fields are taken from `uploads`
    /// only; on [`Operation::Edit`] a binary field without an upload is left
    /// out so the column stays untouched.
    pub fn from_form(
        schema: &SchemaDescriptor,
        raw: &[(String, String)],
        uploads: &Uploads,
        op: Operation,
    ) -> Result<Self, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let mut submitted: BTreeMap<&str, &str> = BTreeMap::new();

        for (key, value) in raw {
            if is_control_key(key) || key.ends_with(RELATION_SUFFIX) {
                continue;
            }
            match schema.field(key) {
                Some(field) if field.has_column() => {
                    submitted.insert(field.name(), value.as_str());
                }
                Some(field) => errors.push(
                    Some(field.name().to_string()),
                    ViolationKind::UnknownField,
                    format!("'{}' takes its values as '{}{RELATION_SUFFIX}'", field.name(), field.name()),
                ),
                None => errors.push(
                    Some(key.clone()),
                    ViolationKind::UnknownField,
                    format!("{} has no field '{key}'", schema.class_name()),
                ),
            }
        }
        for name in uploads.keys() {
            match schema.field(name) {
                Some(field) if field.name() == name && field.field_type() == FieldType::Binary => {}
                _ => errors.push(
                    Some(name.clone()),
                    ViolationKind::UnknownField,
                    format!("'{name}' is not a binary field of {}", schema.class_name()),
                ),
            }
        }

        let mut values = Vec::new();
        for field in schema.columns() {
            let value = if field.field_type() == FieldType::Binary {
                uploads
                    .get(field.name())
                    .map(|bytes| FieldValue::Binary(bytes.clone()))
            } else {
                match submitted.get(field.name()) {
                    Some(raw) if raw.trim().is_empty() && blank_is_null(field) => Some(FieldValue::Null),
                    Some(raw) => match FieldValue::parse(field.name(), field.value_type(), raw) {
                        Ok(v) => Some(v),
                        Err(e) => {
                            errors.push(
                                Some(field.name().to_string()),
                                ViolationKind::TypeMismatch,
                                e.to_string(),
                            );
                            continue;
                        }
                    },
                    None => None,
                }
            };

            let required = !field.is_nullable() && !field.is_primary_key();
            match value {
                Some(FieldValue::Null) if required => errors.push(
                    Some(field.name().to_string()),
                    ViolationKind::Required,
                    format!("'{}' cannot be empty", field.name()),
                ),
                None if required && op == Operation::Create => errors.push(
                    Some(field.name().to_string()),
                    ViolationKind::Required,
                    format!("'{}' is required", field.name()),
                ),
                Some(v) => values.push((field.name().to_string(), v)),
                None => {}
            }
        }

        let pk = schema.primary_key().name();
        if op == Operation::Edit && !values.iter().any(|(n, v)| n == pk && !is_blank(v)) {
            errors.push(
                Some(pk.to_string()),
                ViolationKind::Required,
                format!("'{pk}' is required to edit a {}", schema.class_name()),
            );
        }

        if errors.is_empty() {
            Ok(Self { values })
        } else {
            Err(errors)
        }
    }

    pub fn values(&self) -> &[(String, FieldValue)] {
        &self.values
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.values.iter().find(|(n, _)| n == field).map(|(_, v)| v)
    }

    /// Submitted primary key, unless blank.
    pub fn primary_key(&self, schema: &SchemaDescriptor) -> Option<&FieldValue> {
        self.get(schema.primary_key().name()).filter(|v| !is_blank(v))
    }

    /// All values except the primary key.
    pub fn without_primary_key(&self, schema: &SchemaDescriptor) -> Vec<(String, FieldValue)> {
        let pk = schema.primary_key().name();
        self.values
            .iter()
            .filter(|(n, _)| n != pk)
            .cloned()
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Parse only the primary key of a raw form; `None` when blank or absent.
pub fn primary_key_from_form(
    schema: &SchemaDescriptor,
    raw: &[(String, String)],
) -> Result<Option<FieldValue>, ValidationErrors> {
    let pk = schema.primary_key();
    let Some(literal) = raw
        .iter()
        .rev()
        .find(|(k, _)| schema.field(k).map(FieldDescriptor::name) == Some(pk.name()))
        .map(|(_, v)| v.trim())
        .filter(|v| !v.is_empty())
    else {
        return Ok(None);
    };
    FieldValue::parse(pk.name(), pk.value_type(), literal)
        .map(Some)
        .map_err(|e| {
            ValidationErrors::single(
                Some(pk.name().to_string()),
                ViolationKind::TypeMismatch,
                e.to_string(),
            )
        })
}

/// Submitted keys of to-many relations, typed with the target's key type.
///
/// An empty list clears the relation, so a form that submits only a blank
/// placeholder for `members[]` removes every member.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RelationValues(BTreeMap<String, Vec<FieldValue>>);

impl RelationValues {
    pub fn from_form(
        schema: &SchemaDescriptor,
        raw: &[(String, String)],
    ) -> Result<Self, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let mut out: BTreeMap<String, Vec<FieldValue>> = BTreeMap::new();

        for (key, value) in raw {
            let Some(name) = key.strip_suffix(RELATION_SUFFIX) else {
                continue;
            };
            let Some(field) = schema
                .field(name)
                .filter(|f| f.field_type() == FieldType::RelationToMany)
            else {
                errors.push(
                    Some(name.to_string()),
                    ViolationKind::UnknownField,
                    format!("{} has no to-many relation '{name}'", schema.class_name()),
                );
                continue;
            };

            let keys = out.entry(field.name().to_string()).or_default();
            let value = value.trim();
            if value.is_empty() {
                continue;
            }
            match FieldValue::parse(field.name(), field.value_type(), value) {
                Ok(v) if !keys.contains(&v) => keys.push(v),
                Ok(_) => {}
                Err(e) => errors.push(
                    Some(field.name().to_string()),
                    ViolationKind::TypeMismatch,
                    e.to_string(),
                ),
            }
        }

        if errors.is_empty() {
            Ok(Self(out))
        } else {
            Err(errors)
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[FieldValue])> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn get(&self, field: &str) -> Option<&[FieldValue]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn insert(&mut self, field: impl Into<String>, keys: Vec<FieldValue>) {
        self.0.insert(field.into(), keys);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use admin_query::{FieldDecl, SchemaDecl, SchemaRegistry};

    fn registry() -> SchemaRegistry {
        SchemaRegistry::build(vec![
            SchemaDecl::new("Person", "person")
                .field(FieldDecl::new("id", FieldType::Integer).primary_key())
                .field(FieldDecl::new("name", FieldType::String).required())
                .field(FieldDecl::new("age", FieldType::Integer))
                .field(FieldDecl::new("avatar", FieldType::Binary))
                .field(
                    FieldDecl::new("teams", FieldType::RelationToMany)
                        .references("Team")
                        .join_table("team_member", "person_id", "team_code"),
                ),
            SchemaDecl::new("Team", "team")
                .field(FieldDecl::new("code", FieldType::String).primary_key()),
        ])
        .unwrap()
    }

    fn form(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn every_failure_is_reported() {
        let reg = registry();
        let person = reg.find_by_class_name("Person").unwrap();
        let raw = form(&[("age", "old"), ("salary", "1"), (CREATE_FLAG, "true")]);
        let errs = TypedValues::from_form(person, &raw, &Uploads::new(), Operation::Create)
            .unwrap_err();
        assert_eq!(errs.len(), 3);
        assert_eq!(errs.for_field("age").next().unwrap().kind, ViolationKind::TypeMismatch);
        assert_eq!(errs.for_field("salary").next().unwrap().kind, ViolationKind::UnknownField);
        assert_eq!(errs.for_field("name").next().unwrap().kind, ViolationKind::Required);
    }

    #[test]
    fn blank_becomes_null_except_for_strings() {
        let reg = registry();
        let person = reg.find_by_class_name("Person").unwrap();
        let raw = form(&[("id", ""), ("name", "Bob"), ("age", " ")]);
        let typed = TypedValues::from_form(person, &raw, &Uploads::new(), Operation::Create).unwrap();
        assert_eq!(typed.get("age"), Some(&FieldValue::Null));
        assert_eq!(typed.get("name"), Some(&FieldValue::from("Bob")));
        assert!(typed.primary_key(person).is_none());
        assert_eq!(typed.without_primary_key(person).len(), 2);
    }

    #[test]
    fn binary_only_from_uploads() {
        let reg = registry();
        let person = reg.find_by_class_name("Person").unwrap();
        let raw = form(&[("id", "1"), ("name", "Bob"), ("avatar", "aGk=")]);
        let typed = TypedValues::from_form(person, &raw, &Uploads::new(), Operation::Edit).unwrap();
        assert_eq!(typed.get("avatar"), None);

        let uploads = Uploads::from([("avatar".to_string(), vec![1, 2, 3])]);
        let typed = TypedValues::from_form(person, &raw, &uploads, Operation::Edit).unwrap();
        assert_eq!(typed.get("avatar"), Some(&FieldValue::Binary(vec![1, 2, 3])));
    }

    #[test]
    fn edit_requires_primary_key() {
        let reg = registry();
        let person = reg.find_by_class_name("Person").unwrap();
        let errs = TypedValues::from_form(person, &form(&[("name", "Bob")]), &Uploads::new(), Operation::Edit)
            .unwrap_err();
        assert_eq!(errs.for_field("id").next().unwrap().kind, ViolationKind::Required);
    }

    #[test]
    fn relation_values() {
        let reg = registry();
        let person = reg.find_by_class_name("Person").unwrap();
        let raw = form(&[("teams[]", ""), ("teams[]", "core"), ("teams[]", "web"), ("teams[]", "core")]);
        let rel = RelationValues::from_form(person, &raw).unwrap();
        assert_eq!(
            rel.get("teams").unwrap(),
            &[FieldValue::from("core"), FieldValue::from("web")]
        );

        let cleared = RelationValues::from_form(person, &form(&[("teams[]", "")])).unwrap();
        assert_eq!(cleared.get("teams"), Some(&[] as &[FieldValue]));

        assert!(RelationValues::from_form(person, &form(&[("name[]", "x")])).is_err());
    }

    #[test]
    fn primary_key_parsing() {
        let reg = registry();
        let person = reg.find_by_class_name("Person").unwrap();
        assert_eq!(
            primary_key_from_form(person, &form(&[("id", " 7 ")])).unwrap(),
            Some(FieldValue::Integer(7))
        );
        assert_eq!(primary_key_from_form(person, &form(&[("id", "")])).unwrap(), None);
        assert!(primary_key_from_form(person, &form(&[("id", "x")])).is_err());
    }
}
