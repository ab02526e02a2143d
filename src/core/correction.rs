use crate::core::engine::{RetryPolicy, append_with_retry};
use crate::errors::{AppError, AppResult};
use crate::models::{AttendanceEvent, Channel, Direction, EventSource, NewEvent};
use crate::store::{LedgerStore, RosterStore};
use chrono::NaiveDateTime;

/// Administrative corrections.
///
/// History is never edited: a mistaken or missing scan is fixed by
/// appending a compensating IN/OUT at the desired time.
pub struct CorrectionLogic;

impl CorrectionLogic {
    pub fn register<R, L>(
        roster: &R,
        ledger: &mut L,
        channel: &Channel,
        instructor_id: i64,
        direction: Direction,
        at: NaiveDateTime,
        retry: RetryPolicy,
    ) -> AppResult<AttendanceEvent>
    where
        R: RosterStore + ?Sized,
        L: LedgerStore + ?Sized,
    {
        let instructor = roster
            .lookup_by_id(instructor_id)?
            .ok_or_else(|| AppError::NotFound(format!("instructor {}", instructor_id)))?;

        let event = NewEvent {
            channel: channel.clone(),
            instructor_id: instructor.instructor_id,
            card_uid: instructor.card_uid,
            instructor_name: instructor.name,
            direction,
            timestamp: at,
            source: EventSource::Correction,
        };

        append_with_retry(ledger, &event, retry)
    }
}
