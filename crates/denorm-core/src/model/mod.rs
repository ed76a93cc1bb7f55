//! Runtime schema descriptors: entities, their fields, and the
//! declaration wrapper for denormalized fields.

pub mod entity;
pub mod field;
