use crate::key::Key;
use derive_more::{Deref, DerefMut, IntoIterator};
use std::collections::BTreeSet;

///
/// ImpactSet
///
/// Deduplicated keys of owning-entity rows to recompute for one change.
/// Transient: built around a mutation and dropped once applied.
///

#[derive(Clone, Debug, Default, Deref, DerefMut, Eq, IntoIterator, PartialEq)]
#[into_iterator(owned, ref)]
pub struct ImpactSet(BTreeSet<Key>);

impl ImpactSet {
    #[must_use]
    pub const fn new() -> Self {
        Self(BTreeSet::new())
    }

    /// Fold another set into this one.
    pub fn union(&mut self, other: Self) {
        self.0.extend(other.0);
    }
}

impl FromIterator<Key> for ImpactSet {
    fn from_iter<I: IntoIterator<Item = Key>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl From<BTreeSet<Key>> for ImpactSet {
    fn from(keys: BTreeSet<Key>) -> Self {
        Self(keys)
    }
}
