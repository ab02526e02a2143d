use super::{CardUid, Channel, Direction};
use crate::utils::time::format_timestamp;
use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;

/// Where an event came from. Scans are the normal path; corrections are
/// compensating inserts made by an operator.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EventSource {
    Scan,
    Correction,
    Import,
}

impl EventSource {
    pub fn to_db_str(&self) -> &'static str {
        match self {
            EventSource::Scan => "scan",
            EventSource::Correction => "correction",
            EventSource::Import => "import",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "scan" => Some(EventSource::Scan),
            "correction" => Some(EventSource::Correction),
            "import" => Some(EventSource::Import),
            _ => None,
        }
    }
}

/// Immutable attendance fact, one row of `attendance_events`.
#[derive(Debug, Clone, Serialize)]
pub struct AttendanceEvent {
    pub id: i64,
    pub channel: Channel,
    pub instructor_id: i64,
    pub card_uid: CardUid,        // denormalized copy for audit
    pub instructor_name: String,  // denormalized copy for reporting
    pub direction: Direction,
    pub timestamp: NaiveDateTime, // civil time in the configured offset, second precision
    pub source: EventSource,
}

impl AttendanceEvent {
    pub fn date(&self) -> NaiveDate {
        self.timestamp.date()
    }

    pub fn timestamp_str(&self) -> String {
        format_timestamp(&self.timestamp)
    }
}

/// An event about to be appended; the store assigns `id`.
#[derive(Debug, Clone)]
pub struct NewEvent {
    pub channel: Channel,
    pub instructor_id: i64,
    pub card_uid: CardUid,
    pub instructor_name: String,
    pub direction: Direction,
    pub timestamp: NaiveDateTime,
    pub source: EventSource,
}

impl NewEvent {
    pub fn into_event(self, id: i64) -> AttendanceEvent {
        AttendanceEvent {
            id,
            channel: self.channel,
            instructor_id: self.instructor_id,
            card_uid: self.card_uid,
            instructor_name: self.instructor_name,
            direction: self.direction,
            timestamp: self.timestamp,
            source: self.source,
        }
    }
}
