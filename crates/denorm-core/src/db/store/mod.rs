mod record;

#[cfg(test)]
mod tests;

use crate::{
    db::signal::{ChangeEvent, Signal, SignalBus},
    error::InternalError,
    key::Key,
    model::entity::EntityModel,
    traits::{FieldAccess, RowStore},
    value::Value,
};
use std::{
    cell::RefCell,
    collections::{BTreeMap, BTreeSet},
};

// re-exports
pub use record::Record;

type Table = BTreeMap<Key, Record>;

///
/// MemoryStore
///
/// In-memory row store keyed by entity name, publishing lifecycle signals
/// around every write.
///
/// Table borrows are released before any signal is dispatched, so handlers
/// are free to read and save rows re-entrantly.
///

#[derive(Debug, Default)]
pub struct MemoryStore {
    models: RefCell<BTreeMap<&'static str, &'static EntityModel>>,
    tables: RefCell<BTreeMap<&'static str, Table>>,
    signals: SignalBus<Self>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an entity model, creating its empty table.
    pub fn register_entity(&self, model: &'static EntityModel) -> Result<(), InternalError> {
        let mut models = self.models.borrow_mut();
        if models.contains_key(model.name) {
            return Err(InternalError::store_conflict(format!(
                "entity '{}' already registered",
                model.name
            )));
        }

        models.insert(model.name, model);
        self.tables.borrow_mut().insert(model.name, Table::new());

        Ok(())
    }

    /// Look up a registered entity model.
    pub fn model(&self, entity: &str) -> Result<&'static EntityModel, InternalError> {
        self.models
            .borrow()
            .get(entity)
            .copied()
            .ok_or_else(|| InternalError::unknown_entity(entity))
    }

    /// Number of stored rows for one entity.
    pub fn count(&self, entity: &str) -> Result<usize, InternalError> {
        self.with_table(entity, BTreeMap::len)
    }

    /// Delete one row, firing delete signals.
    /// Returns `false` without firing anything when the key is absent.
    pub fn delete(&self, entity: &'static str, key: &Key) -> Result<bool, InternalError> {
        if !self.with_table(entity, |table| table.contains_key(key))? {
            return Ok(false);
        }

        let keys = BTreeSet::from([key.clone()]);
        self.signals
            .publish(self, &ChangeEvent::new(Signal::PreDelete, entity, &keys))?;

        self.with_table_mut(entity, |table| table.remove(key))?;

        self.signals
            .publish(self, &ChangeEvent::new(Signal::PostDelete, entity, &keys))?;

        Ok(true)
    }

    /// Set one field on every stored row among `keys` without per-row save
    /// signals; only the bulk channels fire. Returns the number of rows
    /// updated.
    pub fn update_where(
        &self,
        entity: &'static str,
        keys: &BTreeSet<Key>,
        field: &str,
        value: impl Into<Value>,
    ) -> Result<usize, InternalError> {
        let model = self.model(entity)?;
        let value: Value = value.into();
        Self::check_field(model, field, &value)?;

        let matched: BTreeSet<Key> = self.with_table(entity, |table| {
            keys.iter()
                .filter(|key| table.contains_key(key))
                .cloned()
                .collect()
        })?;
        if matched.is_empty() {
            return Ok(0);
        }

        self.signals.publish(
            self,
            &ChangeEvent::new(Signal::PreBulkUpdate, entity, &matched),
        )?;

        self.with_table_mut(entity, |table| {
            for key in &matched {
                if let Some(row) = table.get_mut(key) {
                    row.insert(field, value.clone());
                }
            }
        })?;

        self.signals.publish(
            self,
            &ChangeEvent::new(Signal::PostBulkUpdate, entity, &matched),
        )?;

        Ok(matched.len())
    }

    fn check_fields(model: &EntityModel, row: &Record) -> Result<(), InternalError> {
        row.fields()
            .try_for_each(|(name, value)| Self::check_field(model, name, value))
    }

    fn check_field(model: &EntityModel, name: &str, value: &Value) -> Result<(), InternalError> {
        let Some(field) = model.field(name) else {
            return Err(InternalError::store_unsupported(format!(
                "undeclared field: entity={} field={name}",
                model.name
            )));
        };

        if field.kind.accepts(value) {
            Ok(())
        } else {
            Err(InternalError::store_unsupported(format!(
                "value does not fit field: entity={} field={name} kind={:?}",
                model.name, field.kind
            )))
        }
    }

    fn with_table<R>(&self, entity: &str, f: impl FnOnce(&Table) -> R) -> Result<R, InternalError> {
        let tables = self.tables.borrow();
        let table = tables
            .get(entity)
            .ok_or_else(|| InternalError::unknown_entity(entity))?;

        Ok(f(table))
    }

    fn with_table_mut<R>(
        &self,
        entity: &str,
        f: impl FnOnce(&mut Table) -> R,
    ) -> Result<R, InternalError> {
        let mut tables = self.tables.borrow_mut();
        let table = tables
            .get_mut(entity)
            .ok_or_else(|| InternalError::unknown_entity(entity))?;

        Ok(f(table))
    }
}

impl RowStore for MemoryStore {
    type Row = Record;

    fn filter_by_key(
        &self,
        entity: &str,
        keys: &BTreeSet<Key>,
    ) -> Result<Vec<Record>, InternalError> {
        self.with_table(entity, |table| {
            keys.iter()
                .filter_map(|key| table.get(key).cloned())
                .collect()
        })
    }

    fn all_rows(&self, entity: &str) -> Result<Vec<Record>, InternalError> {
        self.with_table(entity, |table| table.values().cloned().collect())
    }

    fn save(&self, entity: &'static str, mut row: Record) -> Result<(), InternalError> {
        let model = self.model(entity)?;
        Self::check_fields(model, &row)?;

        let keys = BTreeSet::from([row.key()]);
        self.signals
            .publish(self, &ChangeEvent::new(Signal::PreSave, entity, &keys))?;
        self.signals.publish_pre_save(self, entity, &mut row)?;

        // pre-save handlers may have written fields
        Self::check_fields(model, &row)?;
        self.with_table_mut(entity, |table| table.insert(row.key(), row))?;

        self.signals
            .publish(self, &ChangeEvent::new(Signal::PostSave, entity, &keys))
    }

    fn signals(&self) -> &SignalBus<Self> {
        &self.signals
    }
}
