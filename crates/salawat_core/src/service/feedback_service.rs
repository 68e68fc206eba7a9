//! Feedback event coordinator.
//!
//! # Responsibility
//! - Track the active set of per-tap feedback events for the presentation
//!   layer to render.
//! - Remove an event when its animation reports completion.
//!
//! # Invariants
//! - Events move `Created -> Active -> Completed(removed)`; a removed id is
//!   never resurrected.
//! - `complete` is idempotent; unknown ids are ignored.
//! - Insertion order is render (z) order; lookup by id is a hash probe.
//! - No cap on the active set; render-side limits are the UI's concern.

use crate::model::feedback::{EventId, TapFeedbackEvent};
use indexmap::IndexMap;
use log::debug;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Owner of in-flight tap feedback events.
#[derive(Debug, Default)]
pub struct FeedbackCoordinator {
    active: Mutex<IndexMap<EventId, TapFeedbackEvent>>,
}

impl FeedbackCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a tap at `(x, y)` and returns its fresh id immediately.
    pub fn spawn(&self, x: f64, y: f64) -> EventId {
        let event = TapFeedbackEvent::new(x, y);
        let id = event.id;
        let mut active = self.lock_active();
        active.insert(id, event);
        debug!(
            "event=feedback_spawn module=feedback status=ok active={}",
            active.len()
        );
        id
    }

    /// Removes the event with `id`.
    ///
    /// Returns whether an event was removed; callers may ignore the result
    /// since completion callbacks can race or fire twice.
    pub fn complete(&self, id: EventId) -> bool {
        let mut active = self.lock_active();
        // `shift_remove` keeps the remaining events in z-order.
        if active.shift_remove(&id).is_none() {
            debug!("event=feedback_complete module=feedback status=ignored reason=unknown_id");
            return false;
        }
        debug!(
            "event=feedback_complete module=feedback status=ok active={}",
            active.len()
        );
        true
    }

    /// Active events in insertion order.
    pub fn active_events(&self) -> Vec<TapFeedbackEvent> {
        self.lock_active().values().cloned().collect()
    }

    pub fn active_len(&self) -> usize {
        self.lock_active().len()
    }

    fn lock_active(&self) -> MutexGuard<'_, IndexMap<EventId, TapFeedbackEvent>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
