//! Denormalization engine: rules that keep one derived field in sync, the
//! resolvers that map changed rows to rows needing recomputation, and the
//! registry that owns every declared rule.

mod impact;
mod registry;
mod rule;

pub mod resolver;


// re-exports
pub use impact::ImpactSet;
pub use registry::{DenormRegistry, RegistryError};
pub use resolver::{ForeignKey, Identity, ManyToMany, Resolver, ReverseForeignKey};
pub use rule::{ComputeFn, Denorm, DenormBuilder};
