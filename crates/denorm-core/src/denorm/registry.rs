use crate::{
    config::DenormConfig,
    denorm::rule::{Denorm, DenormBuilder},
    error::{ErrorClass, ErrorOrigin, InternalError},
    model::field::DenormalizedField,
    traits::RowStore,
};
use std::rc::Rc;
use thiserror::Error as ThisError;

///
/// RegistryError
///

#[derive(Debug, ThisError)]
pub enum RegistryError {
    #[error("denormalized field '{entity}.{field}' already registered")]
    AlreadyRegistered {
        entity: &'static str,
        field: &'static str,
    },

    #[error("denormalized field '{entity}.{field}' declared without a compute function")]
    MissingCompute {
        entity: &'static str,
        field: &'static str,
    },
}

impl RegistryError {
    pub(crate) const fn class(&self) -> ErrorClass {
        match self {
            Self::AlreadyRegistered { .. } => ErrorClass::Conflict,
            Self::MissingCompute { .. } => ErrorClass::Unsupported,
        }
    }
}

impl From<RegistryError> for InternalError {
    fn from(err: RegistryError) -> Self {
        Self::new(err.class(), ErrorOrigin::Registry, err.to_string())
    }
}

///
/// DenormRegistry
///
/// Every rule declared against one store, in declaration order.
/// Built once at startup and handed to whatever needs a full rebuild.
///

pub struct DenormRegistry<S: RowStore> {
    config: DenormConfig,
    rules: Vec<Rc<Denorm<S>>>,
}

impl<S: RowStore + 'static> DenormRegistry<S> {
    #[must_use]
    pub const fn new(config: DenormConfig) -> Self {
        Self {
            config,
            rules: Vec::new(),
        }
    }

    #[must_use]
    pub const fn config(&self) -> &DenormConfig {
        &self.config
    }

    /// Register one denormalized field and subscribe it to `store`.
    ///
    /// Resolvers are set up against the owning entity before any handler is
    /// connected. A second rule for the same `(entity, field)` is rejected.
    pub fn register(
        &mut self,
        store: &S,
        builder: DenormBuilder<S>,
    ) -> Result<DenormalizedField, InternalError> {
        let entity = builder.entity();
        let field = builder.field();
        if self.get(entity, field.name).is_some() {
            return Err(RegistryError::AlreadyRegistered {
                entity,
                field: field.name,
            }
            .into());
        }

        let rule = Rc::new(builder.build(&self.config)?);
        rule.connect(store);
        self.rules.push(rule);

        Ok(DenormalizedField::new(entity, field))
    }

    /// Iterate rules in declaration order.
    pub fn rules(&self) -> impl Iterator<Item = &Denorm<S>> {
        self.rules.iter().map(|rule| &**rule)
    }

    /// Look up the rule for one denormalized field.
    #[must_use]
    pub fn get(&self, entity: &str, field: &str) -> Option<&Denorm<S>> {
        self.rules()
            .find(|rule| rule.entity() == entity && rule.field().name == field)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Recompute every denormalized field over every stored row,
    /// ignoring change tracking.
    pub fn rebuild_all(&self, store: &S) -> Result<(), InternalError> {
        for rule in self.rules() {
            rule.rebuild(store)?;
        }

        Ok(())
    }

    /// Rebuild only the rules owned by `entity`. Returns how many ran.
    pub fn rebuild_entity(&self, store: &S, entity: &str) -> Result<usize, InternalError> {
        let mut rebuilt = 0;
        for rule in self.rules().filter(|rule| rule.entity() == entity) {
            rule.rebuild(store)?;
            rebuilt += 1;
        }

        Ok(rebuilt)
    }

    /// Reserved for batched writes; recomputation is currently immediate,
    /// so there is never anything to flush.
    pub const fn flush(&self) {}
}

impl<S: RowStore + 'static> Default for DenormRegistry<S> {
    fn default() -> Self {
        Self::new(DenormConfig::default())
    }
}
