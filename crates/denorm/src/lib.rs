//! ## Crate layout
//! - `core`: the denormalization engine, row-store contract, in-memory
//!   store, config, and observability.
//!
//! The `prelude` module carries what application code needs to declare
//! denormalized fields and run them against the in-memory store.

pub use denorm_core as core;

/// re-exports
///
/// lets applications derive row types without naming serde themselves
pub mod __reexports {
    pub use serde;
}

//
// Consts
//

/// Workspace version re-export for downstream tooling/tests.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use crate::core::error::InternalError as Error;

///
/// Prelude
/// row-access traits come in by name so adapters can implement them
///

pub mod prelude {
    pub use crate::core::{
        config::DenormConfig,
        db::{MemoryStore, Record, Signal},
        error::{ErrorClass, InternalError},
        obs::{EventReport, MetricsSink, metrics_report, metrics_reset_all, with_metrics_sink},
        prelude::*,
    };
    pub use serde::{Deserialize, Serialize};
}
