use super::Resolver;
use crate::{
    denorm::ImpactSet,
    error::InternalError,
    traits::{FieldAccess, RowStore},
};

///
/// ReverseForeignKey
///
/// Reverse reference: rows of `source` hold `field` pointing at owning rows.
/// Resolved before a change it yields the old target, after it the new one.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ReverseForeignKey {
    source: &'static str,
    field: &'static str,
}

impl ReverseForeignKey {
    #[must_use]
    pub const fn new(source: &'static str, field: &'static str) -> Self {
        Self { source, field }
    }
}

impl<S: RowStore> Resolver<S> for ReverseForeignKey {
    fn source(&self) -> &'static str {
        self.source
    }

    // Targets come from the changed rows themselves; nothing to bind.
    fn setup(&mut self, _owning: &'static str) -> Result<(), InternalError> {
        Ok(())
    }

    fn resolve(&self, _store: &S, changed: &[S::Row]) -> Result<ImpactSet, InternalError> {
        Ok(changed
            .iter()
            .filter_map(|row| row.get_field(self.field))
            .flat_map(|value| value.referenced_keys())
            .collect())
    }
}
