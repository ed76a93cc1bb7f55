//! Dependency resolvers.
//!
//! A resolver watches one source entity and maps a batch of its changed
//! rows to the owning-entity rows whose denormalized value may be stale.
//! Resolvers run both before and after a mutation, so each one must cope
//! with relationships in transition; over-approximating is fine,
//! under-approximating leaves stale values behind.

mod foreign_key;
mod identity;
mod many_to_many;
mod reverse;

use crate::{denorm::ImpactSet, error::InternalError, traits::RowStore};

// re-exports
pub use foreign_key::ForeignKey;
pub use identity::Identity;
pub use many_to_many::ManyToMany;
pub use reverse::ReverseForeignKey;

///
/// Resolver
///

pub trait Resolver<S: RowStore> {
    /// Entity whose changes this resolver reacts to.
    fn source(&self) -> &'static str;

    /// One-time binding to the owning entity, run at registration.
    fn setup(&mut self, owning: &'static str) -> Result<(), InternalError>;

    /// Owning-entity rows affected by `changed` (rows of `source()`).
    /// An empty batch resolves to an empty set.
    fn resolve(&self, store: &S, changed: &[S::Row]) -> Result<ImpactSet, InternalError>;
}

// Owning entity recorded by `setup`, or an invariant error naming the
// resolver that was used unbound.
fn bound_owning(
    owning: Option<&'static str>,
    kind: &str,
    source: &str,
    field: &str,
) -> Result<&'static str, InternalError> {
    owning.ok_or_else(|| {
        InternalError::resolver_invariant(format!(
            "{kind} resolver used before setup: source={source} field={field}"
        ))
    })
}
