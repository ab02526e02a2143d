//! Attendance state machine.
//!
//! Per (channel, instructor) the state is OUT until the first accepted scan;
//! every accepted scan flips it. The state is never cached: it is read back
//! from the ledger on each scan, so corrections and other writers are
//! always taken into account.

use crate::core::feedback::{FeedbackKind, FeedbackSink};
use crate::errors::{AppError, AppResult};
use crate::models::{
    AttendanceEvent, CardUid, Channel, Direction, EventSource, Instructor, NewEvent,
};
use crate::store::{LedgerStore, RosterStore};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::thread;
use std::time::{Duration, Instant};

/// How the direction of a new scan is derived from history.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DirectionPolicy {
    /// Flip the direction of the last stored event (IN when there is none).
    #[default]
    Alternate,
    /// First event of the civil day is IN, any later one that day is OUT.
    FirstOfDay,
}

/// Bounded retry for ledger writes under contention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            backoff: Duration::from_millis(500),
        }
    }
}

/// Successful outcome of a scan, handed to the presentation layer.
#[derive(Debug, Clone, Serialize)]
pub struct AttendanceRecorded {
    pub channel: Channel,
    pub instructor: Instructor,
    pub direction: Direction,
    pub timestamp: NaiveDateTime,
    pub event_id: i64,
}

/// Append `event`, retrying transient failures up to `retry.attempts` times.
///
/// The backoff is measured from the start of the failed attempt, so time
/// spent waiting on a busy database counts toward it. Exhausting the budget
/// yields `WriteFailed`; any other error is returned as-is after the first
/// attempt.
pub fn append_with_retry<L: LedgerStore + ?Sized>(
    ledger: &mut L,
    event: &NewEvent,
    retry: RetryPolicy,
) -> AppResult<AttendanceEvent> {
    let attempts = retry.attempts.max(1);

    for attempt in 1..=attempts {
        let started = Instant::now();
        match ledger.append(event) {
            Ok(stored) => return Ok(stored),
            Err(e) if e.is_transient() => {
                let remaining = retry.backoff.saturating_sub(started.elapsed());
                if attempt < attempts && !remaining.is_zero() {
                    thread::sleep(remaining);
                }
            }
            Err(e) => return Err(e),
        }
    }

    Err(AppError::WriteFailed { attempts })
}

pub struct AttendanceEngine<R, L, F> {
    roster: R,
    ledger: L,
    feedback: F,
    policy: DirectionPolicy,
    retry: RetryPolicy,
}

impl<R, L, F> AttendanceEngine<R, L, F>
where
    R: RosterStore,
    L: LedgerStore,
    F: FeedbackSink,
{
    pub fn new(roster: R, ledger: L, feedback: F) -> Self {
        Self {
            roster,
            ledger,
            feedback,
            policy: DirectionPolicy::default(),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: DirectionPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub fn feedback(&self) -> &F {
        &self.feedback
    }

    /// Direction the next accepted scan of `instructor_id` on `channel` takes.
    pub fn next_direction(
        &self,
        channel: &Channel,
        instructor_id: i64,
        now: NaiveDateTime,
    ) -> AppResult<Direction> {
        match self.policy {
            DirectionPolicy::Alternate => {
                let last = self.ledger.last_event(channel, instructor_id)?;
                Ok(match last {
                    Some(ev) => ev.direction.flipped(),
                    None => Direction::In,
                })
            }
            DirectionPolicy::FirstOfDay => {
                let seen_today = self
                    .ledger
                    .events_on(channel, now.date())?
                    .iter()
                    .any(|ev| ev.instructor_id == instructor_id);
                Ok(if seen_today {
                    Direction::Out
                } else {
                    Direction::In
                })
            }
        }
    }

    /// Process one accepted tap of `uid` on `channel`.
    ///
    /// Duplicate suppression happens before this call (see `DedupCursor`);
    /// every call that passes the roster check writes exactly one event or
    /// fails without writing.
    pub fn handle_scan(
        &mut self,
        channel: &Channel,
        uid: &CardUid,
        now: NaiveDateTime,
    ) -> AppResult<AttendanceRecorded> {
        let result = self.try_record(channel, uid, now);

        match &result {
            Ok(_) => self.feedback.notify(FeedbackKind::Success),
            Err(_) => self.feedback.notify(FeedbackKind::Error),
        }
        result
    }

    fn try_record(
        &mut self,
        channel: &Channel,
        uid: &CardUid,
        now: NaiveDateTime,
    ) -> AppResult<AttendanceRecorded> {
        let instructor = self
            .roster
            .lookup_by_uid(uid)?
            .ok_or_else(|| AppError::UnregisteredCard(uid.to_string()))?;

        let direction = self.next_direction(channel, instructor.instructor_id, now)?;

        let event = NewEvent {
            channel: channel.clone(),
            instructor_id: instructor.instructor_id,
            card_uid: uid.clone(),
            instructor_name: instructor.name.clone(),
            direction,
            timestamp: now,
            source: EventSource::Scan,
        };
        let stored = append_with_retry(&mut self.ledger, &event, self.retry)?;

        Ok(AttendanceRecorded {
            channel: channel.clone(),
            instructor,
            direction,
            timestamp: stored.timestamp,
            event_id: stored.id,
        })
    }
}
