//! Two-phase reset confirmation.
//!
//! # Responsibility
//! - Issue a one-time token when the user asks to reset.
//! - Run the irreversible engine reset only when that token comes back.
//!
//! # Invariants
//! - At most one request is pending; a new request replaces the old token.
//! - A token is consumed by a successful confirm and by expiry.
//! - The engine itself stays confirmation-free.

use crate::repo::count_store::CountStore;
use crate::service::counter_service::CounterEngine;
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use uuid::Uuid;

const DEFAULT_CONFIRM_TTL: Duration = Duration::from_secs(30);

pub type ResetToken = Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResetGateError {
    NoPendingRequest,
    TokenMismatch,
    Expired,
}

impl Display for ResetGateError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoPendingRequest => write!(f, "no reset request is pending"),
            Self::TokenMismatch => write!(f, "reset token does not match the pending request"),
            Self::Expired => write!(f, "reset request expired; ask again"),
        }
    }
}

impl Error for ResetGateError {}

#[derive(Debug)]
struct PendingReset {
    token: ResetToken,
    requested_at: Instant,
}

/// Request/confirm gate in front of `CounterEngine::reset`.
#[derive(Debug)]
pub struct ResetGate {
    ttl: Duration,
    pending: Mutex<Option<PendingReset>>,
}

impl Default for ResetGate {
    fn default() -> Self {
        Self::with_ttl(DEFAULT_CONFIRM_TTL)
    }
}

impl ResetGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            ttl,
            pending: Mutex::new(None),
        }
    }

    /// Phase one: records a reset request and returns its token.
    pub fn request(&self) -> ResetToken {
        let token = Uuid::new_v4();
        *self.lock_pending() = Some(PendingReset {
            token,
            requested_at: Instant::now(),
        });
        info!("event=reset_request module=reset_gate status=ok");
        token
    }

    /// Drops any pending request.
    pub fn cancel(&self) {
        if self.lock_pending().take().is_some() {
            info!("event=reset_cancel module=reset_gate status=ok");
        }
    }

    pub fn is_pending(&self) -> bool {
        self.lock_pending().is_some()
    }

    /// Phase two: consumes the pending request when `token` matches.
    pub fn confirm(&self, token: ResetToken) -> Result<(), ResetGateError> {
        let mut pending = self.lock_pending();
        let request = pending.as_ref().ok_or(ResetGateError::NoPendingRequest)?;

        if request.requested_at.elapsed() >= self.ttl {
            *pending = None;
            return Err(ResetGateError::Expired);
        }
        if request.token != token {
            return Err(ResetGateError::TokenMismatch);
        }

        *pending = None;
        Ok(())
    }

    /// Confirms `token` and resets `engine` on success.
    pub fn confirm_reset<S: CountStore>(
        &self,
        token: ResetToken,
        engine: &CounterEngine<S>,
    ) -> Result<(), ResetGateError> {
        self.confirm(token)?;
        engine.reset();
        Ok(())
    }

    fn lock_pending(&self) -> MutexGuard<'_, Option<PendingReset>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
