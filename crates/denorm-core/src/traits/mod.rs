use crate::{db::signal::SignalBus, error::InternalError, key::Key, value::Value};
use std::{collections::BTreeSet, fmt::Debug};

// ============================================================================
// ROW ACCESS
// ============================================================================
//
// The engine reads and writes rows only through these traits; adapters
// decide how a row is laid out.
//

///
/// FieldAccess
///
/// Per-row accessor over named fields.
/// `get_field` returns `None` for fields the row does not carry.
///

pub trait FieldAccess {
    /// Primary key of this row.
    fn key(&self) -> Key;

    /// Read one field by name.
    fn get_field(&self, name: &str) -> Option<Value>;

    /// Write one field by name.
    fn set_field(&mut self, name: &str, value: Value) -> Result<(), InternalError>;
}

///
/// RowStore
///
/// Row-storage capability consumed by the denormalization engine.
///
/// ## Contract
/// - `filter_by_key` returns the stored rows among `keys`; missing keys are
///   silently absent from the result.
/// - `save` fires the lifecycle signals published on `signals()` and may
///   re-enter the engine before returning.
/// - No borrow of internal state may be held across a signal dispatch.
///

pub trait RowStore: Sized {
    type Row: FieldAccess + Clone + Debug;

    /// Rows of `entity` whose primary key is in `keys`.
    fn filter_by_key(
        &self,
        entity: &str,
        keys: &BTreeSet<Key>,
    ) -> Result<Vec<Self::Row>, InternalError>;

    /// Every stored row of `entity`.
    fn all_rows(&self, entity: &str) -> Result<Vec<Self::Row>, InternalError>;

    /// Persist one row, firing save signals.
    fn save(&self, entity: &'static str, row: Self::Row) -> Result<(), InternalError>;

    /// Lifecycle channel this store publishes on.
    fn signals(&self) -> &SignalBus<Self>;

    /// Load one row by key.
    fn get(&self, entity: &str, key: &Key) -> Result<Option<Self::Row>, InternalError> {
        let keys = BTreeSet::from([key.clone()]);

        Ok(self.filter_by_key(entity, &keys)?.into_iter().next())
    }

    /// Rows of `entity` whose `field` references any of `keys`, either as a
    /// single reference or as a member of a reference list.
    ///
    /// The default scans `all_rows`; adapters with a reverse index should
    /// override it.
    fn filter_by_reference(
        &self,
        entity: &str,
        field: &str,
        keys: &BTreeSet<Key>,
    ) -> Result<Vec<Self::Row>, InternalError> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let rows = self.all_rows(entity)?;

        Ok(rows
            .into_iter()
            .filter(|row| {
                row.get_field(field)
                    .is_some_and(|value| keys.iter().any(|key| value.references(key)))
            })
            .collect())
    }
}
