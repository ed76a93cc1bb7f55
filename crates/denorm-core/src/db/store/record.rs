use crate::{error::InternalError, key::Key, traits::FieldAccess, value::Value};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

///
/// Record
///
/// Dynamic row: a primary key plus named field values.
/// Field names and value kinds are checked against the entity model when
/// the row is saved.
///

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Record {
    key: Key,
    fields: BTreeMap<String, Value>,
}

impl Record {
    #[must_use]
    pub fn new(key: impl Into<Key>) -> Self {
        Self {
            key: key.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Builder-style field assignment.
    #[must_use]
    pub fn with(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(name.to_string(), value.into());
        self
    }

    /// Borrow a field value without cloning.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Iterate the fields carried by this row, in name order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields
            .iter()
            .map(|(name, value)| (name.as_str(), value))
    }

    pub fn insert(&mut self, name: &str, value: impl Into<Value>) {
        self.fields.insert(name.to_string(), value.into());
    }
}

impl FieldAccess for Record {
    fn key(&self) -> Key {
        self.key.clone()
    }

    fn get_field(&self, name: &str) -> Option<Value> {
        self.fields.get(name).cloned()
    }

    fn set_field(&mut self, name: &str, value: Value) -> Result<(), InternalError> {
        self.fields.insert(name.to_string(), value);
        Ok(())
    }
}
