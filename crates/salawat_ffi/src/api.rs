//! FFI use-case API for Flutter-facing calls.
//!
//! # Responsibility
//! - Expose the counter, feedback and reset flows to Dart via FRB.
//! - Own the single process-wide counter session.
//!
//! # Invariants
//! - Exported functions must not panic across the FFI boundary.
//! - Counts cross the boundary as decimal strings, never as fixed-width ints.
//! - If the database cannot be opened the session runs in memory only.

use log::{debug, warn};
use salawat_core::{
    core_version as core_version_inner, init_logging as init_logging_inner, ping as ping_inner,
    CountStore, CounterConfig, CounterEngine, CounterSnapshot, DisplayLocale,
    FeedbackCoordinator, MemoryCountStore, MilestoneNotification, ResetGate, SqliteCountStore,
    TapFeedbackEvent,
};
use std::path::PathBuf;
use std::sync::OnceLock;
use uuid::Uuid;

const COUNTER_DB_FILE_NAME: &str = "salawat_counter.sqlite3";
const COUNTER_DB_PATH_ENV: &str = "SALAWAT_DB_PATH";

static COUNTER_SESSION: OnceLock<CounterSession> = OnceLock::new();

struct CounterSession {
    engine: CounterEngine<Box<dyn CountStore + Send>>,
    feedback: FeedbackCoordinator,
    reset_gate: ResetGate,
}

/// Minimal health-check API for FRB smoke integration.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Expose core crate version through FFI.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes Rust core logging once per process.
///
/// Input semantics:
/// - `level`: one of `trace|debug|info|warn|error` (case-insensitive).
/// - `log_dir`: absolute directory path where rolling logs are written.
///
/// # FFI contract
/// - Safe to call repeatedly with the same `level + log_dir`.
/// - Returns empty string on success and an error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err,
    }
}

/// Everything the counter screen renders.
#[derive(Debug, Clone, PartialEq)]
pub struct CounterView {
    /// Canonical decimal count.
    pub count: String,
    /// Count grouped for the requested locale.
    pub formatted: String,
    pub next_milestone: Option<String>,
    pub next_milestone_formatted: Option<String>,
    /// Fraction in `[0, 1]`; `None` when no milestone is left.
    pub progress: Option<f64>,
    pub golden_unlocked: bool,
}

/// Celebration payload for one milestone crossing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MilestoneView {
    pub milestone: String,
    pub formatted: String,
    /// `true` only for the tap that unlocked the golden theme.
    pub golden_unlock: bool,
}

/// Result of one user tap.
#[derive(Debug, Clone, PartialEq)]
pub struct TapResponse {
    /// Feedback event to animate; report back through `feedback_complete`.
    pub event_id: String,
    pub milestone: Option<MilestoneView>,
    pub counter: CounterView,
}

/// Active "+1" feedback item.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedbackEventView {
    pub event_id: String,
    pub x: f64,
    pub y: f64,
    pub created_at_ms: i64,
}

/// Envelope for the confirm step of a reset.
#[derive(Debug, Clone, PartialEq)]
pub struct ResetResponse {
    pub ok: bool,
    pub message: String,
    pub counter: CounterView,
}

/// Reads the current counter state.
///
/// `locale` is a language tag such as `en` or `ar`.
#[flutter_rust_bridge::frb(sync)]
pub fn counter_snapshot(locale: String) -> CounterView {
    let locale = DisplayLocale::from_tag(&locale);
    to_counter_view(session().engine.snapshot(locale), locale)
}

/// Records one tap at screen position `(x, y)`.
///
/// # FFI contract
/// - Every call counts exactly once, even if its animation is later dropped.
/// - The returned `event_id` stays active until `feedback_complete`.
#[flutter_rust_bridge::frb(sync)]
pub fn counter_tap(x: f64, y: f64, locale: String) -> TapResponse {
    let locale = DisplayLocale::from_tag(&locale);
    let session = session();
    let event_id = session.feedback.spawn(x, y);
    let (notification, snapshot) = session.engine.increment_with_snapshot(locale);

    TapResponse {
        event_id: event_id.to_string(),
        milestone: notification.map(|notification| to_milestone_view(notification, locale)),
        counter: to_counter_view(snapshot, locale),
    }
}

/// Reports that the feedback animation for `event_id` finished.
///
/// Unknown, malformed or already-completed ids are ignored.
#[flutter_rust_bridge::frb(sync)]
pub fn feedback_complete(event_id: String) {
    match Uuid::parse_str(event_id.trim()) {
        Ok(id) => {
            session().feedback.complete(id);
        }
        Err(_) => {
            debug!("event=feedback_complete module=ffi status=ignored reason=malformed_id");
        }
    }
}

/// Active feedback events in render order.
#[flutter_rust_bridge::frb(sync)]
pub fn feedback_active() -> Vec<FeedbackEventView> {
    session()
        .feedback
        .active_events()
        .into_iter()
        .map(to_feedback_view)
        .collect()
}

/// First step of reset; returns the token the confirm dialog must echo.
#[flutter_rust_bridge::frb(sync)]
pub fn counter_request_reset() -> String {
    session().reset_gate.request().to_string()
}

/// Second step of reset: resets the count when `token` matches.
#[flutter_rust_bridge::frb(sync)]
pub fn counter_confirm_reset(token: String, locale: String) -> ResetResponse {
    let locale = DisplayLocale::from_tag(&locale);
    let session = session();

    let result = match Uuid::parse_str(token.trim()) {
        Ok(token) => session
            .reset_gate
            .confirm_reset(token, &session.engine)
            .map_err(|err| err.to_string()),
        Err(_) => Err(format!("malformed reset token `{}`", token.trim())),
    };

    let counter = to_counter_view(session.engine.snapshot(locale), locale);
    match result {
        Ok(()) => ResetResponse {
            ok: true,
            message: "Counter reset.".to_string(),
            counter,
        },
        Err(message) => ResetResponse {
            ok: false,
            message: format!("counter_confirm_reset failed: {message}"),
            counter,
        },
    }
}

/// Dismisses a pending reset request.
#[flutter_rust_bridge::frb(sync)]
pub fn counter_cancel_reset() {
    session().reset_gate.cancel();
}

fn session() -> &'static CounterSession {
    COUNTER_SESSION.get_or_init(open_session)
}

fn open_session() -> CounterSession {
    let db_path = resolve_counter_db_path();
    let store: Box<dyn CountStore + Send> = match SqliteCountStore::open(&db_path) {
        Ok(store) => Box::new(store),
        Err(err) => {
            warn!(
                "event=counter_session module=ffi status=degraded mode=memory error_code=store_open_failed error={err}"
            );
            Box::new(MemoryCountStore::new())
        }
    };

    CounterSession {
        engine: CounterEngine::load(store, CounterConfig::default()),
        feedback: FeedbackCoordinator::new(),
        reset_gate: ResetGate::new(),
    }
}

fn resolve_counter_db_path() -> PathBuf {
    if let Ok(raw) = std::env::var(COUNTER_DB_PATH_ENV) {
        let trimmed = raw.trim();
        if !trimmed.is_empty() {
            return PathBuf::from(trimmed);
        }
    }
    std::env::temp_dir().join(COUNTER_DB_FILE_NAME)
}

fn to_counter_view(snapshot: CounterSnapshot, locale: DisplayLocale) -> CounterView {
    CounterView {
        count: snapshot.count.to_decimal_string(),
        formatted: snapshot.formatted,
        next_milestone_formatted: snapshot
            .next_milestone
            .as_ref()
            .map(|milestone| milestone.grouped(locale)),
        next_milestone: snapshot
            .next_milestone
            .map(|milestone| milestone.to_decimal_string()),
        progress: snapshot.progress,
        golden_unlocked: snapshot.golden_unlocked,
    }
}

fn to_milestone_view(notification: MilestoneNotification, locale: DisplayLocale) -> MilestoneView {
    MilestoneView {
        formatted: notification.milestone.grouped(locale),
        milestone: notification.milestone.to_decimal_string(),
        golden_unlock: notification.golden_unlock,
    }
}

fn to_feedback_view(event: TapFeedbackEvent) -> FeedbackEventView {
    FeedbackEventView {
        event_id: event.id.to_string(),
        x: event.x,
        y: event.y,
        created_at_ms: event.created_at_ms,
    }
}
