use chrono::{NaiveDate, NaiveDateTime};
use kintouch::core::engine::append_with_retry;
use kintouch::core::{
    AttendanceEngine, ChannelPoller, DirectionPolicy, FeedbackKind, NullFeedback,
    RecordingFeedback, RetryPolicy, ScanReport, ScriptStep, ScriptedSource,
};
use kintouch::errors::{AppError, AppResult};
use kintouch::models::{AttendanceEvent, Channel, Direction, EventSource, NewEvent};
use kintouch::store::{LedgerStore, MemoryRoster, RosterStore};
use std::cell::Cell;
use std::time::Duration;

mod common;
use common::{class, meeting, ts, uid};

/// Plain vector ledger; counts append calls.
#[derive(Default)]
struct VecLedger {
    events: Vec<AttendanceEvent>,
    appends: usize,
}

impl LedgerStore for VecLedger {
    fn append(&mut self, event: &NewEvent) -> AppResult<AttendanceEvent> {
        self.appends += 1;
        let stored = event.clone().into_event(self.events.len() as i64 + 1);
        self.events.push(stored.clone());
        Ok(stored)
    }

    fn last_event(&self, channel: &Channel, instructor_id: i64) -> AppResult<Option<AttendanceEvent>> {
        Ok(self
            .events
            .iter()
            .filter(|e| &e.channel == channel && e.instructor_id == instructor_id)
            .max_by_key(|e| (e.timestamp, e.id))
            .cloned())
    }

    fn events_on(&self, channel: &Channel, date: NaiveDate) -> AppResult<Vec<AttendanceEvent>> {
        Ok(self
            .events
            .iter()
            .filter(|e| &e.channel == channel && e.date() == date)
            .cloned()
            .collect())
    }
}

/// Ledger whose first `busy_for` appends report lock contention.
struct BusyLedger {
    inner: VecLedger,
    busy_for: usize,
    calls: Cell<usize>,
}

impl BusyLedger {
    fn always() -> Self {
        Self::failing(usize::MAX)
    }

    fn failing(busy_for: usize) -> Self {
        Self {
            inner: VecLedger::default(),
            busy_for,
            calls: Cell::new(0),
        }
    }
}

impl LedgerStore for BusyLedger {
    fn append(&mut self, event: &NewEvent) -> AppResult<AttendanceEvent> {
        let n = self.calls.get() + 1;
        self.calls.set(n);
        if n <= self.busy_for {
            return Err(AppError::TransientFailure("database is locked".into()));
        }
        self.inner.append(event)
    }

    fn last_event(&self, channel: &Channel, instructor_id: i64) -> AppResult<Option<AttendanceEvent>> {
        self.inner.last_event(channel, instructor_id)
    }

    fn events_on(&self, channel: &Channel, date: NaiveDate) -> AppResult<Vec<AttendanceEvent>> {
        self.inner.events_on(channel, date)
    }
}

fn roster_with(entries: &[(i64, &str, &str)]) -> MemoryRoster {
    let mut roster = MemoryRoster::new();
    for (id, raw, name) in entries {
        roster
            .register(*id, &uid(raw), name, ts("2025-01-01 00:00:00"))
            .expect("register");
    }
    roster
}

fn no_wait() -> RetryPolicy {
    RetryPolicy {
        attempts: 3,
        backoff: Duration::ZERO,
    }
}

fn engine(
    roster: MemoryRoster,
) -> AttendanceEngine<MemoryRoster, VecLedger, RecordingFeedback> {
    AttendanceEngine::new(roster, VecLedger::default(), RecordingFeedback::new())
        .with_retry(no_wait())
}

fn at(hms: &str) -> NaiveDateTime {
    ts(&format!("2025-01-15 {}", hms))
}

#[test]
fn test_first_scan_is_in_and_directions_alternate() {
    let mut eng = engine(roster_with(&[(1, "04AA", "Tanaka")]));
    let card = uid("04AA");

    let got: Vec<Direction> = ["09:00:00", "12:00:00", "13:00:00", "18:00:00"]
        .iter()
        .map(|t| eng.handle_scan(&class(), &card, at(t)).expect("scan").direction)
        .collect();

    assert_eq!(
        got,
        vec![Direction::In, Direction::Out, Direction::In, Direction::Out]
    );
    assert_eq!(eng.ledger().events.len(), 4);
}

#[test]
fn test_alternation_is_per_instructor() {
    let mut eng = engine(roster_with(&[(1, "04AA", "Tanaka"), (2, "04BB", "Suzuki")]));

    let a = eng.handle_scan(&class(), &uid("04AA"), at("09:00:00")).unwrap();
    let b = eng.handle_scan(&class(), &uid("04BB"), at("09:01:00")).unwrap();

    assert_eq!(a.direction, Direction::In);
    assert_eq!(b.direction, Direction::In);
    assert_eq!(b.instructor.name, "Suzuki");
}

#[test]
fn test_unregistered_card_never_touches_ledger() {
    let mut eng = engine(roster_with(&[(1, "04AA", "Tanaka")]));

    let err = eng
        .handle_scan(&class(), &uid("FFFF"), at("09:00:00"))
        .unwrap_err();

    assert!(matches!(err, AppError::UnregisteredCard(ref u) if u == "FFFF"));
    assert_eq!(eng.ledger().appends, 0);
    assert_eq!(eng.feedback().kinds(), vec![FeedbackKind::Error]);
}

#[test]
fn test_channels_are_independent() {
    let mut eng = engine(roster_with(&[(1, "04AA", "Tanaka")]));
    let card = uid("04AA");

    eng.handle_scan(&class(), &card, at("09:00:00")).unwrap();

    assert_eq!(
        eng.next_direction(&meeting(), 1, at("10:00:00")).unwrap(),
        Direction::In
    );
    let m = eng.handle_scan(&meeting(), &card, at("10:00:00")).unwrap();
    assert_eq!(m.direction, Direction::In);

    // class still expects OUT
    assert_eq!(
        eng.next_direction(&class(), 1, at("10:00:01")).unwrap(),
        Direction::Out
    );
}

#[test]
fn test_retry_gives_up_after_three_attempts() {
    let mut eng = AttendanceEngine::new(
        roster_with(&[(1, "04AA", "Tanaka")]),
        BusyLedger::always(),
        RecordingFeedback::new(),
    )
    .with_retry(no_wait());

    let err = eng
        .handle_scan(&class(), &uid("04AA"), at("09:00:00"))
        .unwrap_err();

    assert!(matches!(err, AppError::WriteFailed { attempts: 3 }));
    assert_eq!(eng.ledger().calls.get(), 3);
    assert!(eng.ledger().inner.events.is_empty());
    assert_eq!(eng.feedback().kinds(), vec![FeedbackKind::Error]);
}

#[test]
fn test_retry_recovers_from_transient_contention() {
    let mut eng = AttendanceEngine::new(
        roster_with(&[(1, "04AA", "Tanaka")]),
        BusyLedger::failing(2),
        RecordingFeedback::new(),
    )
    .with_retry(no_wait());

    let rec = eng
        .handle_scan(&class(), &uid("04AA"), at("09:00:00"))
        .expect("third attempt succeeds");

    assert_eq!(rec.direction, Direction::In);
    assert_eq!(eng.ledger().calls.get(), 3);
    assert_eq!(eng.ledger().inner.events.len(), 1);
    assert_eq!(eng.feedback().kinds(), vec![FeedbackKind::Success]);
}

#[test]
fn test_retry_waits_between_attempts() {
    let mut ledger = BusyLedger::always();
    let event = NewEvent {
        channel: class(),
        instructor_id: 1,
        card_uid: uid("04AA"),
        instructor_name: "Tanaka".into(),
        direction: Direction::In,
        timestamp: at("09:00:00"),
        source: EventSource::Scan,
    };
    let policy = RetryPolicy {
        attempts: 3,
        backoff: Duration::from_millis(20),
    };

    let started = std::time::Instant::now();
    let err = append_with_retry(&mut ledger, &event, policy).unwrap_err();

    assert!(matches!(err, AppError::WriteFailed { attempts: 3 }));
    // two sleeps: after attempt 1 and 2, none after the last
    assert!(started.elapsed() >= Duration::from_millis(40));
}

#[test]
fn test_non_transient_error_is_not_retried() {
    struct BrokenLedger {
        calls: usize,
    }

    impl LedgerStore for BrokenLedger {
        fn append(&mut self, _event: &NewEvent) -> AppResult<AttendanceEvent> {
            self.calls += 1;
            Err(AppError::Other("disk full".into()))
        }

        fn last_event(&self, _c: &Channel, _id: i64) -> AppResult<Option<AttendanceEvent>> {
            Ok(None)
        }

        fn events_on(&self, _c: &Channel, _d: NaiveDate) -> AppResult<Vec<AttendanceEvent>> {
            Ok(Vec::new())
        }
    }

    let mut eng = AttendanceEngine::new(
        roster_with(&[(1, "04AA", "Tanaka")]),
        BrokenLedger { calls: 0 },
        NullFeedback,
    )
    .with_retry(no_wait());

    let err = eng
        .handle_scan(&class(), &uid("04AA"), at("09:00:00"))
        .unwrap_err();

    assert!(matches!(err, AppError::Other(_)));
    assert_eq!(eng.ledger().calls, 1);
}

#[test]
fn test_first_of_day_policy() {
    let mut eng = engine(roster_with(&[(1, "04AA", "Tanaka")]))
        .with_policy(DirectionPolicy::FirstOfDay);
    let card = uid("04AA");

    let d1: Vec<Direction> = ["09:00:00", "12:00:00", "18:00:00"]
        .iter()
        .map(|t| eng.handle_scan(&class(), &card, at(t)).unwrap().direction)
        .collect();
    assert_eq!(d1, vec![Direction::In, Direction::Out, Direction::Out]);

    let next_day = eng
        .handle_scan(&class(), &card, ts("2025-01-16 08:30:00"))
        .unwrap();
    assert_eq!(next_day.direction, Direction::In);
}

#[test]
fn test_poller_suppresses_card_left_on_reader() {
    let card = uid("04AA");
    let source = ScriptedSource::new([
        ScriptStep::Card(card.clone()),
        ScriptStep::Card(card.clone()),
        ScriptStep::Card(card.clone()),
        ScriptStep::Absent,
        ScriptStep::Card(card.clone()),
    ]);
    let mut poller = ChannelPoller::new(class(), source, engine(roster_with(&[(1, "04AA", "Tanaka")])));

    let reports: Vec<Option<ScanReport>> = (0..5)
        .map(|i| poller.poll_once(at(&format!("09:00:0{}", i))))
        .collect();

    let written: Vec<usize> = reports
        .iter()
        .enumerate()
        .filter(|(_, r)| r.is_some())
        .map(|(i, _)| i)
        .collect();
    assert_eq!(written, vec![0, 4]);
    assert_eq!(poller.engine().ledger().appends, 2);

    match &reports[4] {
        Some(ScanReport::Recorded(r)) => assert_eq!(r.direction, Direction::Out),
        other => panic!("expected a recorded OUT, got {:?}", other),
    }
}

#[test]
fn test_poller_treats_faults_and_unreadable_uids() {
    let card = uid("04AA");
    let source = ScriptedSource::new([
        ScriptStep::Card(card.clone()),
        // still on the reader but this poll failed to read it
        ScriptStep::Unreadable,
        ScriptStep::Card(card.clone()),
        // reader error counts as a lifted card
        ScriptStep::Fault,
        ScriptStep::Card(card.clone()),
    ]);
    let mut poller = ChannelPoller::new(class(), source, engine(roster_with(&[(1, "04AA", "Tanaka")])));

    let outcomes: Vec<bool> = (0..5)
        .map(|i| poller.poll_once(at(&format!("09:00:0{}", i))).is_some())
        .collect();

    assert_eq!(outcomes, vec![true, false, false, false, true]);
    assert_eq!(poller.engine().ledger().appends, 2);
}

#[test]
fn test_different_card_is_a_new_tap_without_lift() {
    let source = ScriptedSource::new([
        ScriptStep::Card(uid("04AA")),
        ScriptStep::Card(uid("04BB")),
    ]);
    let mut poller = ChannelPoller::new(
        class(),
        source,
        engine(roster_with(&[(1, "04AA", "Tanaka"), (2, "04BB", "Suzuki")])),
    );

    assert!(poller.poll_once(at("09:00:00")).is_some());
    assert!(poller.poll_once(at("09:00:01")).is_some());
    assert_eq!(poller.engine().ledger().appends, 2);
}

#[test]
fn test_failed_scan_needs_a_new_tap() {
    let card = uid("04AA");
    let source = ScriptedSource::new([
        ScriptStep::Card(card.clone()),
        ScriptStep::Card(card.clone()),
    ]);
    let eng = AttendanceEngine::new(
        roster_with(&[(1, "04AA", "Tanaka")]),
        BusyLedger::always(),
        RecordingFeedback::new(),
    )
    .with_retry(no_wait());
    let mut poller = ChannelPoller::new(class(), source, eng);

    let first = poller.poll_once(at("09:00:00"));
    assert!(matches!(
        first,
        Some(ScanReport::WriteFailed { attempts: 3, .. })
    ));
    assert!(poller.poll_once(at("09:00:01")).is_none());
    assert_eq!(poller.engine().ledger().calls.get(), 3);
}

#[test]
fn test_feedback_sequence_for_a_tap() {
    let source = ScriptedSource::new([ScriptStep::Card(uid("04AA"))]);
    let mut poller = ChannelPoller::new(class(), source, engine(roster_with(&[(1, "04AA", "Tanaka")])));

    poller.poll_once(at("09:00:00"));

    assert_eq!(
        poller.engine().feedback().kinds(),
        vec![FeedbackKind::CardDetected, FeedbackKind::Success]
    );
}

#[test]
fn test_tap_recorded_then_dedup_then_out_then_unknown_card() {
    let tanaka = uid("04AA");
    let unknown = uid("FFFF");
    let roster = roster_with(&[(1, "04AA", "Tanaka")]);

    let mut class_poller = ChannelPoller::new(
        class(),
        ScriptedSource::new([
            ScriptStep::Card(tanaka.clone()),
            ScriptStep::Card(tanaka.clone()),
            ScriptStep::Absent,
            ScriptStep::Card(tanaka.clone()),
        ]),
        engine(roster.clone()),
    );

    match class_poller.poll_once(at("09:00:00")) {
        Some(ScanReport::Recorded(r)) => {
            assert_eq!(r.direction, Direction::In);
            assert_eq!(r.instructor.name, "Tanaka");
        }
        other => panic!("expected IN, got {:?}", other),
    }
    assert!(class_poller.poll_once(at("09:00:01")).is_none());
    assert!(class_poller.poll_once(at("12:00:00")).is_none());
    match class_poller.poll_once(at("18:00:00")) {
        Some(ScanReport::Recorded(r)) => assert_eq!(r.direction, Direction::Out),
        other => panic!("expected OUT, got {:?}", other),
    }

    let mut meeting_poller = ChannelPoller::new(
        meeting(),
        ScriptedSource::new([ScriptStep::Card(unknown.clone())]),
        engine(roster),
    );
    match meeting_poller.poll_once(at("18:05:00")) {
        Some(ScanReport::Unregistered { channel, uid }) => {
            assert_eq!(channel, meeting());
            assert_eq!(uid, unknown);
        }
        other => panic!("expected unregistered, got {:?}", other),
    }
    assert_eq!(meeting_poller.engine().ledger().appends, 0);

    let class_events = class_poller
        .engine()
        .ledger()
        .events_on(&class(), NaiveDate::from_ymd_opt(2025, 1, 15).unwrap())
        .unwrap();
    let dirs: Vec<Direction> = class_events.iter().map(|e| e.direction).collect();
    assert_eq!(dirs, vec![Direction::In, Direction::Out]);
}
