use salawat_core::{
    Count, CountStore, CounterConfig, CounterEngine, DisplayLocale, MemoryCountStore,
    MilestoneNotification, MilestoneSet, ResetPolicy, SqliteCountStore, StoreError, StoreResult,
};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

fn six_milestone_config() -> CounterConfig {
    CounterConfig {
        milestones: MilestoneSet::from_u64s(&[1, 10, 50, 100, 500, 1_000]).unwrap(),
        ..CounterConfig::default()
    }
}

fn tap(engine: &CounterEngine<impl CountStore>, times: u64) -> Vec<MilestoneNotification> {
    (0..times).filter_map(|_| engine.increment()).collect()
}

#[test]
fn sequential_increments_are_exact() {
    let engine = CounterEngine::with_defaults(MemoryCountStore::new());
    tap(&engine, 2_345);
    assert_eq!(engine.current_count(), Count::from(2_345));
    assert_eq!(engine.formatted_count(), "2,345");
}

#[test]
fn rapid_fire_increments_from_many_threads_are_exact() {
    const THREADS: u64 = 8;
    const TAPS_PER_THREAD: u64 = 250;

    let engine = Arc::new(CounterEngine::load(
        SqliteCountStore::open_in_memory().unwrap(),
        six_milestone_config(),
    ));
    let notifications = Arc::new(Mutex::new(Vec::new()));

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let engine = Arc::clone(&engine);
            let notifications = Arc::clone(&notifications);
            thread::spawn(move || {
                for _ in 0..TAPS_PER_THREAD {
                    if let Some(notification) = engine.increment() {
                        notifications.lock().unwrap().push(notification);
                    }
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(engine.current_count(), Count::from(THREADS * TAPS_PER_THREAD));

    let mut reached: Vec<u64> = notifications
        .lock()
        .unwrap()
        .iter()
        .map(|notification| notification.milestone.to_u64().unwrap())
        .collect();
    reached.sort_unstable();
    assert_eq!(reached, vec![1, 10, 50, 100, 500, 1_000]);

    let engine = Arc::try_unwrap(engine).ok().expect("threads joined");
    let store = engine.into_store();
    assert_eq!(store.load_count().unwrap(), Some(Count::from(2_000)));
}

#[test]
fn concurrent_taps_each_see_their_own_count() {
    const THREADS: u64 = 4;
    const TAPS_PER_THREAD: u64 = 100;

    let engine = Arc::new(CounterEngine::with_defaults(MemoryCountStore::new()));
    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                (0..TAPS_PER_THREAD)
                    .map(|_| {
                        let (notification, snapshot) =
                            engine.increment_with_snapshot(DisplayLocale::English);
                        if let Some(notification) = notification {
                            assert_eq!(notification.milestone, snapshot.count);
                        }
                        snapshot.count.to_u64().unwrap()
                    })
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let mut seen: Vec<u64> = handles
        .into_iter()
        .flat_map(|handle| handle.join().unwrap())
        .collect();
    seen.sort_unstable();
    let expected: Vec<u64> = (1..=THREADS * TAPS_PER_THREAD).collect();
    assert_eq!(seen, expected);
}

#[test]
fn counting_to_one_thousand_yields_six_milestones_and_one_unlock() {
    let engine = CounterEngine::load(MemoryCountStore::new(), six_milestone_config());

    let notifications = tap(&engine, 1_000);

    let milestones: Vec<u64> = notifications
        .iter()
        .map(|notification| notification.milestone.to_u64().unwrap())
        .collect();
    assert_eq!(milestones, vec![1, 10, 50, 100, 500, 1_000]);

    let unlocks: Vec<&MilestoneNotification> = notifications
        .iter()
        .filter(|notification| notification.golden_unlock)
        .collect();
    assert_eq!(unlocks.len(), 1);
    assert_eq!(unlocks[0].milestone, Count::from(1_000));

    assert_eq!(engine.current_count(), Count::from(1_000));
    assert!(engine.is_golden_unlocked());
}

#[test]
fn golden_flag_stays_set_after_unlock_and_reset() {
    let engine = CounterEngine::with_defaults(MemoryCountStore::new());
    tap(&engine, 1_000);
    assert!(engine.is_golden_unlocked());

    for _ in 0..5_000 {
        engine.increment();
        assert!(engine.is_golden_unlocked());
    }

    engine.reset();
    assert!(engine.current_count().is_zero());
    assert!(engine.is_golden_unlocked());

    // The second pass through 1000 is an ordinary milestone.
    let second_pass = tap(&engine, 1_000);
    assert!(second_pass.iter().all(|notification| !notification.golden_unlock));
    assert_eq!(second_pass.last().unwrap().milestone, Count::from(1_000));
}

#[test]
fn progress_is_bounded_zero_at_milestones_and_approaches_one() {
    let engine = CounterEngine::with_defaults(MemoryCountStore::new());
    let milestones = MilestoneSet::Standard;

    for _ in 0..1_200 {
        let notification = engine.increment();
        let progress = engine.progress_to_next().expect("standard set is infinite");
        assert!((0.0..=1.0).contains(&progress), "{progress}");

        let count = engine.current_count();
        if notification.is_some() {
            assert_eq!(progress, 0.0);
        }
        let next = engine.next_milestone().unwrap();
        assert!(next > count);

        let mut following = count.clone();
        following.increment();
        if following == next {
            assert!(progress > 0.75, "count {count} progress {progress}");
        }
        assert!(milestones.contains(&count) == notification.is_some());
    }
}

#[test]
fn state_is_restored_from_database_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("counter.db");

    let engine = CounterEngine::with_defaults(SqliteCountStore::open(&path).unwrap());
    tap(&engine, 1_001);
    drop(engine);

    let engine = CounterEngine::with_defaults(SqliteCountStore::open(&path).unwrap());
    assert_eq!(engine.current_count(), Count::from(1_001));
    assert!(engine.is_golden_unlocked());
    assert_eq!(engine.increment(), None);
}

#[test]
fn huge_persisted_count_keeps_incrementing() {
    let store = MemoryCountStore::with_raw_count("999999999999999999999999");
    let engine = CounterEngine::with_defaults(store);
    assert!(!engine.is_golden_unlocked());

    let notification = engine.increment().expect("10^24 is a milestone");
    assert_eq!(
        notification.milestone.to_decimal_string(),
        format!("1{}", "0".repeat(24))
    );
    // Loaded far above the threshold with no flag record: first tap unlocks.
    assert!(notification.golden_unlock);
    assert_eq!(
        engine.formatted_count(),
        "1,000,000,000,000,000,000,000,000"
    );
}

/// Store whose writes fail while `failing` is set.
#[derive(Clone, Default)]
struct FlakyStore {
    inner: Arc<MemoryCountStore>,
    failing: Arc<AtomicBool>,
    failed_writes: Arc<AtomicUsize>,
}

impl FlakyStore {
    fn check(&self) -> StoreResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            self.failed_writes.fetch_add(1, Ordering::SeqCst);
            return Err(StoreError::Unavailable("disk full".to_string()));
        }
        Ok(())
    }
}

impl CountStore for FlakyStore {
    fn load_count(&self) -> StoreResult<Option<Count>> {
        self.inner.load_count()
    }

    fn save_count(&self, count: &Count) -> StoreResult<()> {
        self.check()?;
        self.inner.save_count(count)
    }

    fn load_golden_unlocked(&self) -> StoreResult<Option<bool>> {
        self.inner.load_golden_unlocked()
    }

    fn save_golden_unlocked(&self, unlocked: bool) -> StoreResult<()> {
        self.check()?;
        self.inner.save_golden_unlocked(unlocked)
    }
}

#[test]
fn failed_writes_do_not_roll_back_and_reconcile_on_next_tap() {
    let store = FlakyStore::default();
    let engine = CounterEngine::with_defaults(store.clone());

    tap(&engine, 3);
    store.failing.store(true, Ordering::SeqCst);
    tap(&engine, 2);

    assert_eq!(engine.current_count(), Count::from(5));
    assert!(engine.has_pending_writes());
    assert_eq!(store.inner.load_count().unwrap(), Some(Count::from(3)));
    assert_eq!(store.failed_writes.load(Ordering::SeqCst), 2);

    store.failing.store(false, Ordering::SeqCst);
    engine.increment();
    assert!(!engine.has_pending_writes());
    assert_eq!(store.inner.load_count().unwrap(), Some(Count::from(6)));
}

#[test]
fn flush_retries_pending_golden_flag() {
    let store = FlakyStore::default();
    let config = CounterConfig {
        golden_threshold: Count::from(2),
        ..CounterConfig::default()
    };
    let engine = CounterEngine::load(store.clone(), config);

    engine.increment();
    store.failing.store(true, Ordering::SeqCst);
    let unlock = engine.increment().expect("threshold reached");
    assert!(unlock.golden_unlock);
    assert!(engine.is_golden_unlocked());
    assert!(engine.flush().is_err());
    assert_eq!(store.inner.load_golden_unlocked().unwrap(), None);

    store.failing.store(false, Ordering::SeqCst);
    engine.flush().unwrap();
    assert_eq!(store.inner.load_golden_unlocked().unwrap(), Some(true));
    assert_eq!(store.inner.load_count().unwrap(), Some(Count::from(2)));
}

#[test]
fn clear_golden_policy_persists_cleared_flag() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("counter.db");
    let config = CounterConfig {
        golden_threshold: Count::from(10),
        reset_policy: ResetPolicy::ClearGolden,
        ..CounterConfig::default()
    };

    let engine = CounterEngine::load(SqliteCountStore::open(&path).unwrap(), config.clone());
    tap(&engine, 10);
    engine.reset();
    drop(engine);

    let engine = CounterEngine::load(SqliteCountStore::open(&path).unwrap(), config);
    assert!(engine.current_count().is_zero());
    assert!(!engine.is_golden_unlocked());
}
