use super::{Resolver, bound_owning};
use crate::{
    denorm::ImpactSet,
    error::InternalError,
    traits::{FieldAccess, RowStore},
};

///
/// Identity
/// Self dependency: changed owning rows are their own impact set.
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Identity {
    owning: Option<&'static str>,
}

impl Identity {
    #[must_use]
    pub const fn new() -> Self {
        Self { owning: None }
    }
}

impl<S: RowStore> Resolver<S> for Identity {
    // Unbound identity resolvers listen to nothing.
    fn source(&self) -> &'static str {
        self.owning.unwrap_or_default()
    }

    fn setup(&mut self, owning: &'static str) -> Result<(), InternalError> {
        self.owning = Some(owning);
        Ok(())
    }

    fn resolve(&self, _store: &S, changed: &[S::Row]) -> Result<ImpactSet, InternalError> {
        if changed.is_empty() {
            return Ok(ImpactSet::new());
        }
        bound_owning(self.owning, "identity", "self", "-")?;

        Ok(changed.iter().map(FieldAccess::key).collect())
    }
}
