//! Core runtime for denorm: the denormalization engine, the row-store
//! contract it runs against, an in-memory reference store, and
//! observability.
#![warn(unreachable_pub)]

// public exports are one module level down
pub mod config;
pub mod db;
pub mod denorm;
pub mod error;
pub mod key;
pub mod model;
pub mod obs;
pub mod traits;
pub mod value;

// test
#[cfg(test)]
pub(crate) mod test_support;

///
/// Prelude
///
/// Prelude contains only declaration vocabulary.
/// Stores, sinks and errors are imported from their modules.
///

pub mod prelude {
    pub use crate::{
        denorm::{
            DenormBuilder, DenormRegistry, ForeignKey, Identity, ManyToMany, ReverseForeignKey,
        },
        key::Key,
        model::{
            entity::EntityModel,
            field::{FieldKind, FieldModel},
        },
        traits::{FieldAccess, RowStore},
        value::Value,
    };
}
