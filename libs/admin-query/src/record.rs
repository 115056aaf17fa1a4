use std::collections::BTreeMap;

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::value::FieldValue;

/// One entity instance.
///
/// Root columns keep schema order; to-many relation keys are only present
/// when the record was loaded by primary key.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Record {
    values: Vec<(String, FieldValue)>,
    relations: BTreeMap<String, Vec<FieldValue>>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.set(field, value);
        self
    }

    /// Insert or replace a column value.
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<FieldValue>) {
        let field = field.into();
        let value = value.into();
        match self.values.iter_mut().find(|(f, _)| *f == field) {
            Some(slot) => slot.1 = value,
            None => self.values.push((field, value)),
        }
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.values
            .iter()
            .find(|(f, _)| f == field)
            .map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.values.iter().map(|(f, v)| (f.as_str(), v))
    }

    pub fn set_relation(&mut self, field: impl Into<String>, keys: Vec<FieldValue>) {
        self.relations.insert(field.into(), keys);
    }

    pub fn relation(&self, field: &str) -> Option<&[FieldValue]> {
        self.relations.get(field).map(Vec::as_slice)
    }

    pub fn relations(&self) -> &BTreeMap<String, Vec<FieldValue>> {
        &self.relations
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len() + self.relations.len()))?;
        for (field, value) in &self.values {
            map.serialize_entry(field, value)?;
        }
        for (field, keys) in &self.relations {
            map.serialize_entry(field, keys)?;
        }
        map.end()
    }
}
