//! Tap feedback event model.
//!
//! # Responsibility
//! - Describe one user tap's transient visual acknowledgment.
//!
//! # Invariants
//! - `id` is generated once and never reused for another event.
//! - Events are independent of the count mutation they accompany.

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Stable identifier of one feedback event.
pub type EventId = Uuid;

/// Ephemeral "tap happened here" record owned by the feedback coordinator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TapFeedbackEvent {
    pub id: EventId,
    /// Screen x coordinate as reported by the presentation layer.
    pub x: f64,
    /// Screen y coordinate as reported by the presentation layer.
    pub y: f64,
    /// Unix epoch milliseconds at creation.
    pub created_at_ms: i64,
}

impl TapFeedbackEvent {
    /// Creates an event with a fresh v4 identifier stamped with the current time.
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            x,
            y,
            created_at_ms: now_epoch_ms(),
        }
    }
}

fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}
