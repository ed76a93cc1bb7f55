//! Row-storage side of the engine: lifecycle signals and the in-memory
//! reference store.

pub mod signal;
pub mod store;

// re-exports
pub use signal::{ChangeEvent, Signal, SignalBus};
pub use store::{MemoryStore, Record};
