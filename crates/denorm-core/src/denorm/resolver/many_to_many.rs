use super::{ForeignKey, Resolver, ReverseForeignKey};
use crate::{denorm::ImpactSet, error::InternalError, traits::RowStore};

///
/// ManyToMany
///
/// List-valued reference between the owning entity and `source`.
/// `Owning` means the owning row carries the key list; `Source` means each
/// source row carries a list of owning keys. Traversal matches the
/// single-reference resolvers since reference matching already walks lists.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ManyToMany {
    Owning(ForeignKey),
    Source(ReverseForeignKey),
}

impl ManyToMany {
    /// Owning rows hold `field: Vec<Key>` of `source` rows.
    #[must_use]
    pub const fn owning(source: &'static str, field: &'static str) -> Self {
        Self::Owning(ForeignKey::new(source, field))
    }

    /// `source` rows hold `field: Vec<Key>` of owning rows.
    #[must_use]
    pub const fn reverse(source: &'static str, field: &'static str) -> Self {
        Self::Source(ReverseForeignKey::new(source, field))
    }
}

impl<S: RowStore> Resolver<S> for ManyToMany {
    fn source(&self) -> &'static str {
        match self {
            Self::Owning(inner) => Resolver::<S>::source(inner),
            Self::Source(inner) => Resolver::<S>::source(inner),
        }
    }

    fn setup(&mut self, owning: &'static str) -> Result<(), InternalError> {
        match self {
            Self::Owning(inner) => Resolver::<S>::setup(inner, owning),
            Self::Source(inner) => Resolver::<S>::setup(inner, owning),
        }
    }

    fn resolve(&self, store: &S, changed: &[S::Row]) -> Result<ImpactSet, InternalError> {
        match self {
            Self::Owning(inner) => inner.resolve(store, changed),
            Self::Source(inner) => inner.resolve(store, changed),
        }
    }
}
