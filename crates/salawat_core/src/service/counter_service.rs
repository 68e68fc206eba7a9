//! Counter & milestone engine.
//!
//! # Responsibility
//! - Own the in-memory count and the golden unlock flag.
//! - Serialize every mutation and the store write it triggers.
//! - Derive milestone crossings, next milestone and progress.
//!
//! # Invariants
//! - All state lives behind one mutex; `increment`/`reset` finish under it, so
//!   no tap is lost, duplicated or skips its milestone check.
//! - Store writes are issued in mutation order; a failed write never rolls
//!   back the in-memory value and is retried on the next mutation.
//! - The golden flag is a guarded one-way write, never recomputed from the
//!   current count.
//!
//! # See also
//! - `repo::count_store` for the persisted record layout.

use crate::model::count::Count;
use crate::model::locale::DisplayLocale;
use crate::model::milestone::{MilestoneNotification, MilestoneSet};
use crate::repo::count_store::{CountStore, StoreResult};
use log::{debug, info, warn};
use num_bigint::BigUint;
use num_traits::ToPrimitive;
use serde::Serialize;
use std::sync::{Mutex, MutexGuard, PoisonError};

const DEFAULT_GOLDEN_THRESHOLD: u64 = 1_000;

/// What `reset()` does with the golden unlock flag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ResetPolicy {
    /// Reset clears the count only; the unlocked theme survives.
    #[default]
    KeepGolden,
    /// Reset also clears (and persists) the golden flag.
    ClearGolden,
}

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CounterConfig {
    pub milestones: MilestoneSet,
    /// First count at or above which the golden unlock fires.
    pub golden_threshold: Count,
    pub reset_policy: ResetPolicy,
}

impl Default for CounterConfig {
    fn default() -> Self {
        Self {
            milestones: MilestoneSet::Standard,
            golden_threshold: Count::from(DEFAULT_GOLDEN_THRESHOLD),
            reset_policy: ResetPolicy::default(),
        }
    }
}

/// Consistent read of everything the presentation layer renders.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CounterSnapshot {
    pub count: Count,
    /// Count grouped for the requested locale.
    pub formatted: String,
    pub next_milestone: Option<Count>,
    /// Fraction in `[0, 1]`; `None` once the milestone set is exhausted.
    pub progress: Option<f64>,
    pub golden_unlocked: bool,
}

/// Single-writer counter engine over a `CountStore`.
pub struct CounterEngine<S: CountStore> {
    config: CounterConfig,
    state: Mutex<EngineState<S>>,
}

struct EngineState<S> {
    store: S,
    count: Count,
    golden_unlocked: bool,
    pending: PendingWrites,
}

#[derive(Debug, Default, Clone, Copy)]
struct PendingWrites {
    count: bool,
    golden: bool,
}

impl<S: CountStore> CounterEngine<S> {
    /// Loads persisted state and builds the engine.
    ///
    /// Never fails: a missing, corrupt or unreadable record falls back to
    /// zero / locked and is logged.
    pub fn load(store: S, config: CounterConfig) -> Self {
        let count = match store.load_count() {
            Ok(Some(count)) => {
                info!(
                    "event=counter_load module=engine status=ok source=store digits={}",
                    count.to_decimal_string().len()
                );
                count
            }
            Ok(None) => {
                info!("event=counter_load module=engine status=ok source=default reason=absent");
                Count::zero()
            }
            Err(err) => {
                warn!(
                    "event=counter_load module=engine status=degraded source=default error_code=count_load_failed error={err}"
                );
                Count::zero()
            }
        };

        let golden_unlocked = match store.load_golden_unlocked() {
            Ok(flag) => flag.unwrap_or(false),
            Err(err) => {
                warn!(
                    "event=golden_load module=engine status=degraded source=default error_code=golden_load_failed error={err}"
                );
                false
            }
        };

        Self {
            config,
            state: Mutex::new(EngineState {
                store,
                count,
                golden_unlocked,
                pending: PendingWrites::default(),
            }),
        }
    }

    /// Loads with the default configuration.
    pub fn with_defaults(store: S) -> Self {
        Self::load(store, CounterConfig::default())
    }

    pub fn config(&self) -> &CounterConfig {
        &self.config
    }

    /// Adds one tap and persists it.
    ///
    /// Returns a notification when the new count is a milestone or when this
    /// increment flipped the golden unlock.
    pub fn increment(&self) -> Option<MilestoneNotification> {
        let mut state = self.lock_state();
        self.increment_locked(&mut state)
    }

    /// Adds one tap and returns the snapshot taken in the same critical
    /// section, so the view always reflects this tap.
    pub fn increment_with_snapshot(
        &self,
        locale: DisplayLocale,
    ) -> (Option<MilestoneNotification>, CounterSnapshot) {
        let mut state = self.lock_state();
        let notification = self.increment_locked(&mut state);
        let snapshot = self.build_snapshot(state.count.clone(), state.golden_unlocked, locale);
        (notification, snapshot)
    }

    fn increment_locked(&self, state: &mut EngineState<S>) -> Option<MilestoneNotification> {
        state.count.increment();
        state.pending.count = true;

        let golden_unlock =
            !state.golden_unlocked && state.count >= self.config.golden_threshold;
        if golden_unlock {
            state.golden_unlocked = true;
            state.pending.golden = true;
            info!(
                "event=golden_unlock module=engine status=ok count={}",
                state.count
            );
        }

        // Failures are logged and kept pending for the next mutation.
        let _ = state.persist_pending("increment");

        let is_milestone = self.config.milestones.contains(&state.count);
        if !is_milestone && !golden_unlock {
            debug!("event=counter_increment module=engine status=ok");
            return None;
        }

        info!(
            "event=milestone_reached module=engine status=ok milestone={} golden_unlock={}",
            state.count, golden_unlock
        );
        Some(MilestoneNotification {
            milestone: state.count.clone(),
            golden_unlock,
        })
    }

    /// Sets the count to zero and persists it.
    ///
    /// Confirmation is the caller's job; this call is irreversible.
    pub fn reset(&self) {
        let mut state = self.lock_state();
        let previous_digits = state.count.to_decimal_string().len();
        state.count.reset();
        state.pending.count = true;

        if self.config.reset_policy == ResetPolicy::ClearGolden && state.golden_unlocked {
            state.golden_unlocked = false;
            state.pending.golden = true;
        }

        let _ = state.persist_pending("reset");
        info!(
            "event=counter_reset module=engine status=ok previous_digits={previous_digits} golden_unlocked={}",
            state.golden_unlocked
        );
    }

    /// Retries any write that failed earlier.
    pub fn flush(&self) -> StoreResult<()> {
        self.lock_state().persist_pending("flush")
    }

    /// Returns whether a failed write is waiting for retry.
    pub fn has_pending_writes(&self) -> bool {
        let state = self.lock_state();
        state.pending.count || state.pending.golden
    }

    pub fn current_count(&self) -> Count {
        self.lock_state().count.clone()
    }

    /// Count with English digit grouping.
    pub fn formatted_count(&self) -> String {
        self.formatted_count_in(DisplayLocale::English)
    }

    pub fn formatted_count_in(&self, locale: DisplayLocale) -> String {
        self.lock_state().count.grouped(locale)
    }

    pub fn is_golden_unlocked(&self) -> bool {
        self.lock_state().golden_unlocked
    }

    /// Smallest milestone strictly above the current count.
    pub fn next_milestone(&self) -> Option<Count> {
        let count = self.current_count();
        self.config.milestones.next_after(&count)
    }

    /// Progress from the last reached milestone (or zero) to the next one.
    pub fn progress_to_next(&self) -> Option<f64> {
        let count = self.current_count();
        progress_to_next(&self.config.milestones, &count)
    }

    /// Everything the counter screen renders, read under one lock.
    pub fn snapshot(&self, locale: DisplayLocale) -> CounterSnapshot {
        let (count, golden_unlocked) = {
            let state = self.lock_state();
            (state.count.clone(), state.golden_unlocked)
        };
        self.build_snapshot(count, golden_unlocked, locale)
    }

    fn build_snapshot(
        &self,
        count: Count,
        golden_unlocked: bool,
        locale: DisplayLocale,
    ) -> CounterSnapshot {
        CounterSnapshot {
            formatted: count.grouped(locale),
            next_milestone: self.config.milestones.next_after(&count),
            progress: progress_to_next(&self.config.milestones, &count),
            golden_unlocked,
            count,
        }
    }

    /// Consumes the engine and hands the store back.
    pub fn into_store(self) -> S {
        self.state
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
            .store
    }

    fn lock_state(&self) -> MutexGuard<'_, EngineState<S>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<S: CountStore> EngineState<S> {
    fn persist_pending(&mut self, operation: &'static str) -> StoreResult<()> {
        let mut first_error = None;

        if self.pending.count {
            match self.store.save_count(&self.count) {
                Ok(()) => self.pending.count = false,
                Err(err) => {
                    warn!(
                        "event=count_save module=engine status=error operation={operation} error_code=count_save_failed error={err}"
                    );
                    first_error.get_or_insert(err);
                }
            }
        }

        if self.pending.golden {
            match self.store.save_golden_unlocked(self.golden_unlocked) {
                Ok(()) => self.pending.golden = false,
                Err(err) => {
                    warn!(
                        "event=golden_save module=engine status=error operation={operation} error_code=golden_save_failed error={err}"
                    );
                    first_error.get_or_insert(err);
                }
            }
        }

        first_error.map_or(Ok(()), Err)
    }
}

/// `(count - previous_or_zero) / (next - previous_or_zero)`, clamped to `[0, 1]`.
///
/// Returns `None` when no milestone lies above `count`.
pub fn progress_to_next(milestones: &MilestoneSet, count: &Count) -> Option<f64> {
    let next = BigUint::from(milestones.next_after(count)?);
    let base = milestones
        .previous_at_or_below(count)
        .map(BigUint::from)
        .unwrap_or_default();
    let current = count.as_biguint();

    if next <= base {
        return Some(1.0);
    }
    if *current <= base {
        return Some(0.0);
    }

    let done = current - &base;
    let span = &next - &base;
    Some(big_ratio(&done, &span).clamp(0.0, 1.0))
}

fn big_ratio(numerator: &BigUint, denominator: &BigUint) -> f64 {
    // Drop low bits so both operands fit an f64 mantissa without overflow.
    let shift = denominator
        .bits()
        .saturating_sub(u64::from(f64::MANTISSA_DIGITS));
    let numerator = (numerator >> shift).to_f64().unwrap_or(0.0);
    let denominator = (denominator >> shift).to_f64().unwrap_or(f64::INFINITY);
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}
