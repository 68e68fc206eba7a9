//! Flutter-facing bindings for the Salawat counter core.

pub mod api;
