use super::{Resolver, bound_owning};
use crate::{
    denorm::ImpactSet,
    error::InternalError,
    key::Key,
    traits::{FieldAccess, RowStore},
};
use std::collections::BTreeSet;

///
/// ForeignKey
///
/// Direct reference: the owning entity holds `field` pointing at a row of
/// `source`. A changed source row refreshes every owning row referencing it.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ForeignKey {
    source: &'static str,
    field: &'static str,
    owning: Option<&'static str>,
}

impl ForeignKey {
    #[must_use]
    pub const fn new(source: &'static str, field: &'static str) -> Self {
        Self {
            source,
            field,
            owning: None,
        }
    }
}

impl<S: RowStore> Resolver<S> for ForeignKey {
    fn source(&self) -> &'static str {
        self.source
    }

    fn setup(&mut self, owning: &'static str) -> Result<(), InternalError> {
        self.owning = Some(owning);
        Ok(())
    }

    fn resolve(&self, store: &S, changed: &[S::Row]) -> Result<ImpactSet, InternalError> {
        if changed.is_empty() {
            return Ok(ImpactSet::new());
        }

        let owning = bound_owning(self.owning, "foreign key", self.source, self.field)?;
        let keys: BTreeSet<Key> = changed.iter().map(FieldAccess::key).collect();

        Ok(store
            .filter_by_reference(owning, self.field, &keys)?
            .iter()
            .map(FieldAccess::key)
            .collect())
    }
}
