//! Repository layer for counter persistence.
//!
//! # Responsibility
//! - Define the storage contract the engine writes through.
//! - Isolate SQLite query details from engine orchestration.
//!
//! # Invariants
//! - Only the counter engine holds a store; the presentation layer and the
//!   feedback coordinator never read or write it.

pub mod count_store;
