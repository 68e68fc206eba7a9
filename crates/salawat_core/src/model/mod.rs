//! Domain model for the counter subsystem.
//!
//! # Responsibility
//! - Define the value types shared by the engine, the store and the FFI layer.
//!
//! # Invariants
//! - `Count` is the only durable quantity; everything else is derived or
//!   transient.

pub mod count;
pub mod feedback;
pub mod locale;
pub mod milestone;
