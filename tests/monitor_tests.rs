use chrono::NaiveDateTime;
use kintouch::core::monitor::Clock;
use kintouch::core::scan_source::{open_source, take_sample};
use kintouch::core::{
    AttendanceEngine, ChannelPoller, InertSource, LineSource, Monitor, NullFeedback, RetryPolicy,
    Sample, ScanReport, ScanSource, ScriptStep, ScriptedSource,
};
use kintouch::db::pool::DbPool;
use kintouch::db::{SqliteLedger, SqliteRoster};
use kintouch::errors::AppError;
use kintouch::models::{Channel, Direction};
use kintouch::store::{LedgerStore, RosterStore};
use std::io::Cursor;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};

mod common;
use common::{class, meeting, open_test_pool, ts, uid};

/// A clock that advances one second per call.
fn ticking_clock(start: &str) -> Clock {
    let base = ts(start);
    let ticks = Arc::new(AtomicU32::new(0));
    Arc::new(move || -> NaiveDateTime {
        let n = ticks.fetch_add(1, Ordering::SeqCst);
        base + chrono::TimeDelta::seconds(i64::from(n))
    })
}

fn sqlite_poller<S: ScanSource>(
    path: &str,
    channel: Channel,
    source: S,
) -> ChannelPoller<S, SqliteRoster, SqliteLedger, NullFeedback> {
    let engine = AttendanceEngine::new(
        SqliteRoster::new(DbPool::new(path).unwrap()),
        SqliteLedger::new(DbPool::new(path).unwrap()),
        NullFeedback,
    )
    .with_retry(RetryPolicy {
        attempts: 3,
        backoff: Duration::from_millis(20),
    });
    ChannelPoller::new(channel, source, engine)
}

#[test]
fn test_monitor_runs_one_thread_per_channel() {
    let (path, pool) = open_test_pool("monitor_threads");
    let mut roster = SqliteRoster::new(pool);
    roster
        .register(1, &uid("04AA"), "Tanaka", ts("2025-01-01 08:00:00"))
        .unwrap();

    let (mut monitor, tx, rx) = Monitor::open();
    let clock = ticking_clock("2025-01-15 09:00:00");

    let class_source = ScriptedSource::new([
        ScriptStep::Card(uid("04AA")),
        ScriptStep::Card(uid("04AA")),
        ScriptStep::Absent,
        ScriptStep::Card(uid("04AA")),
    ]);
    let meeting_source = ScriptedSource::new([
        ScriptStep::Card(uid("04AA")),
        ScriptStep::Absent,
        ScriptStep::Card(uid("FFFF")),
    ]);

    monitor
        .spawn(
            sqlite_poller(&path, class(), class_source),
            Duration::from_millis(5),
            Arc::clone(&clock),
            tx.clone(),
        )
        .unwrap();
    monitor
        .spawn(
            sqlite_poller(&path, meeting(), meeting_source),
            Duration::from_millis(5),
            Arc::clone(&clock),
            tx.clone(),
        )
        .unwrap();
    drop(tx);
    assert_eq!(monitor.task_count(), 2);

    // class: IN, OUT. meeting: IN, unregistered.
    let mut outcomes = Vec::new();
    while outcomes.len() < 4 {
        let report = rx
            .recv_timeout(Duration::from_secs(10))
            .expect("report from a reader thread");
        outcomes.push(report);
    }

    monitor.request_stop();
    let mut stopped = 0;
    while let Ok(report) = rx.recv_timeout(Duration::from_secs(10)) {
        if matches!(report, ScanReport::Stopped { .. }) {
            stopped += 1;
        }
        if stopped == 2 {
            break;
        }
    }
    monitor.shutdown();
    assert_eq!(stopped, 2);

    let class_dirs: Vec<Direction> = outcomes
        .iter()
        .filter_map(|r| match r {
            ScanReport::Recorded(rec) if rec.channel == class() => Some(rec.direction),
            _ => None,
        })
        .collect();
    assert_eq!(class_dirs, vec![Direction::In, Direction::Out]);

    let meeting_in = outcomes.iter().any(|r| {
        matches!(r, ScanReport::Recorded(rec) if rec.channel == meeting() && rec.direction == Direction::In)
    });
    assert!(meeting_in);

    let unregistered: Vec<&ScanReport> = outcomes
        .iter()
        .filter(|r| matches!(r, ScanReport::Unregistered { .. }))
        .collect();
    assert_eq!(unregistered.len(), 1);
    assert_eq!(unregistered[0].channel(), &meeting());

    let ledger = SqliteLedger::new(DbPool::new(&path).unwrap());
    let last = ledger.last_event(&class(), 1).unwrap().unwrap();
    assert_eq!(last.direction, Direction::Out);
}

#[test]
fn test_monitor_stops_idle_readers() {
    let (path, _pool) = open_test_pool("monitor_idle");
    let (mut monitor, tx, rx) = Monitor::open();

    monitor
        .spawn(
            sqlite_poller(&path, class(), InertSource::new("not connected")),
            Duration::from_millis(500),
            ticking_clock("2025-01-15 09:00:00"),
            tx,
        )
        .unwrap();

    let stop = monitor.stop_flag();
    stop.store(true, Ordering::Relaxed);

    match rx.recv_timeout(Duration::from_secs(5)) {
        Ok(ScanReport::Stopped { channel }) => assert_eq!(channel, class()),
        other => panic!("expected Stopped, got {:?}", other),
    }
    monitor.shutdown();
}

#[test]
fn test_stop_during_write_retry_finishes_within_budget() {
    let (path, pool) = open_test_pool("monitor_stop_retry");
    let mut roster = SqliteRoster::new(pool);
    roster
        .register(1, &uid("04AA"), "Tanaka", ts("2025-01-01 08:00:00"))
        .unwrap();

    let lock = DbPool::new(&path).unwrap();
    lock.conn.execute_batch("BEGIN IMMEDIATE").unwrap();

    let engine = AttendanceEngine::new(
        SqliteRoster::new(DbPool::new(&path).unwrap()),
        SqliteLedger::new(DbPool::new(&path).unwrap()),
        NullFeedback,
    )
    .with_retry(RetryPolicy::default());
    let poller = ChannelPoller::new(
        class(),
        ScriptedSource::new([ScriptStep::Card(uid("04AA"))]),
        engine,
    );

    let (mut monitor, tx, rx) = Monitor::open();
    monitor
        .spawn(
            poller,
            Duration::from_millis(10),
            ticking_clock("2025-01-15 09:00:00"),
            tx,
        )
        .unwrap();

    // first attempt is waiting on the lock
    std::thread::sleep(Duration::from_millis(200));
    monitor.request_stop();
    let stop_requested = Instant::now();

    let mut reports = Vec::new();
    while let Ok(report) = rx.recv_timeout(Duration::from_secs(5)) {
        let done = matches!(report, ScanReport::Stopped { .. });
        reports.push(report);
        if done {
            break;
        }
    }
    let waited = stop_requested.elapsed();
    lock.conn.execute_batch("ROLLBACK").unwrap();
    monitor.shutdown();

    assert!(waited < Duration::from_millis(1500), "stopped after {:?}", waited);
    assert_eq!(reports.len(), 2, "{:?}", reports);
    assert!(matches!(
        reports[0],
        ScanReport::WriteFailed { attempts: 3, .. }
    ));
    assert!(matches!(reports[1], ScanReport::Stopped { .. }));

    let ledger = SqliteLedger::new(DbPool::new(&path).unwrap());
    assert!(ledger.last_event(&class(), 1).unwrap().is_none());
}

#[test]
fn test_line_source_reports_each_line_as_a_tap() {
    let input = Cursor::new("04 AA\n\n04AA\nnot-a-card\n");
    let mut source = LineSource::from_reader("test", input).unwrap();

    let mut samples = Vec::new();
    for _ in 0..100 {
        samples.push(take_sample(&mut source));
        std::thread::sleep(Duration::from_millis(2));
    }

    let taps: Vec<usize> = samples
        .iter()
        .enumerate()
        .filter(|(_, s)| **s != Sample::Absent)
        .map(|(i, _)| i)
        .collect();

    // the unparsable line never shows up as a card
    assert_eq!(taps.len(), 2);
    for i in taps {
        assert_eq!(samples[i], Sample::Present(Some(uid("04AA"))));
        assert_eq!(samples[i + 1], Sample::Absent);
    }
}

#[test]
fn test_open_source_strings() {
    assert!(matches!(
        open_source("none"),
        Err(AppError::ScanSourceUnavailable(_))
    ));
    assert!(matches!(
        open_source("pcsc:0"),
        Err(AppError::ScanSourceUnavailable(_))
    ));

    let missing = common::temp_out("missing_reader", "txt");
    assert!(matches!(
        open_source(&format!("file:{}", missing)),
        Err(AppError::ScanSourceUnavailable(_))
    ));

    let feed = common::temp_out("reader_feed", "txt");
    std::fs::write(&feed, "04AA\n").unwrap();
    let source = open_source(&format!("file:{}", feed)).unwrap();
    assert!(source.describe().contains(&feed));
}
