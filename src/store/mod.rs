//! Storage contracts consumed by the attendance engine.
//!
//! The SQLite implementations live in `crate::db`; `MemoryRoster` is the
//! flat-file roster backing. Both sides are interchangeable behind these traits.

pub mod memory;

pub use memory::MemoryRoster;

use crate::errors::AppResult;
use crate::models::{AttendanceEvent, CardUid, Channel, Instructor, NewEvent};
use chrono::{NaiveDate, NaiveDateTime};

/// Maps card UIDs to instructors.
pub trait RosterStore {
    fn lookup_by_uid(&self, uid: &CardUid) -> AppResult<Option<Instructor>>;

    fn lookup_by_id(&self, instructor_id: i64) -> AppResult<Option<Instructor>>;

    /// Fails with `AppError::Conflict` when either the id or the UID is
    /// already registered. Both keys are re-checked at write time.
    fn register(
        &mut self,
        instructor_id: i64,
        uid: &CardUid,
        name: &str,
        created_at: NaiveDateTime,
    ) -> AppResult<Instructor>;

    /// One greater than the highest assigned id, or 1 for an empty roster.
    /// Advisory only: `register` still enforces uniqueness.
    fn next_available_id(&self) -> AppResult<i64>;

    /// All instructors ordered by id.
    fn list(&self) -> AppResult<Vec<Instructor>>;
}

/// Append-only attendance ledger, partitioned by channel.
pub trait LedgerStore {
    /// Durably append one event or fail as a whole. Write contention is
    /// reported as `AppError::TransientFailure`.
    fn append(&mut self, event: &NewEvent) -> AppResult<AttendanceEvent>;

    /// Most recent event (by timestamp, then insertion order) for the
    /// instructor on `channel`.
    fn last_event(&self, channel: &Channel, instructor_id: i64)
    -> AppResult<Option<AttendanceEvent>>;

    /// Events of `channel` whose timestamp falls on `date`, oldest first.
    fn events_on(&self, channel: &Channel, date: NaiveDate) -> AppResult<Vec<AttendanceEvent>>;
}
