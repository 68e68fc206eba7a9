//! Core domain logic for the Salawat counter.
//! This crate is the single source of truth for counter invariants.

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use logging::{default_log_level, init_logging, logging_status};
pub use model::count::{Count, CountParseError};
pub use model::feedback::{EventId, TapFeedbackEvent};
pub use model::locale::DisplayLocale;
pub use model::milestone::{MilestoneNotification, MilestoneSet, MilestoneSetError};
pub use repo::count_store::{
    CountStore, MemoryCountStore, SqliteCountStore, StoreError, StoreResult,
};
pub use service::counter_service::{
    progress_to_next, CounterConfig, CounterEngine, CounterSnapshot, ResetPolicy,
};
pub use service::feedback_service::FeedbackCoordinator;
pub use service::reset_gate::{ResetGate, ResetGateError, ResetToken};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
