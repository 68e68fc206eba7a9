//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `salawat_core` linkage without the Flutter runtime.
//! - Drive a short tap session: `salawat_cli [db_path] [taps]`.
//!
//! Without `db_path` the session runs against an in-memory database.

use salawat_core::{CounterEngine, DisplayLocale, SqliteCountStore, StoreResult};
use std::process::ExitCode;

const DEFAULT_TAPS: u64 = 1;

fn main() -> ExitCode {
    println!("salawat_core ping={}", salawat_core::ping());
    println!("salawat_core version={}", salawat_core::core_version());

    let mut args = std::env::args().skip(1);
    let db_path = args.next();
    let taps = match args.next().map(|raw| raw.trim().parse::<u64>()) {
        None => DEFAULT_TAPS,
        Some(Ok(taps)) => taps,
        Some(Err(err)) => {
            eprintln!("invalid tap count: {err}");
            return ExitCode::FAILURE;
        }
    };

    match run_session(db_path.as_deref(), taps) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("counter session failed: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run_session(db_path: Option<&str>, taps: u64) -> StoreResult<()> {
    let store = match db_path {
        Some(path) => SqliteCountStore::open(path)?,
        None => SqliteCountStore::open_in_memory()?,
    };
    let engine = CounterEngine::with_defaults(store);

    for _ in 0..taps {
        if let Some(notification) = engine.increment() {
            let kind = if notification.golden_unlock {
                "golden_unlock"
            } else {
                "milestone"
            };
            println!(
                "{kind}={}",
                notification.milestone.grouped(DisplayLocale::English)
            );
        }
    }
    engine.flush()?;

    let snapshot = engine.snapshot(DisplayLocale::English);
    println!("count={}", snapshot.formatted);
    println!(
        "next_milestone={}",
        snapshot
            .next_milestone
            .map(|milestone| milestone.grouped(DisplayLocale::English))
            .unwrap_or_else(|| "none".to_string())
    );
    println!(
        "progress={:.3} golden_unlocked={}",
        snapshot.progress.unwrap_or(1.0),
        snapshot.golden_unlocked
    );
    Ok(())
}
