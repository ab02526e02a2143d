use super::pool::DbPool;
use super::{classify, conversion_error};
use crate::errors::{AppError, AppResult};
use crate::models::{AttendanceEvent, CardUid, Channel, Direction, EventSource, NewEvent};
use crate::store::LedgerStore;
use crate::utils::time::{DATE_FORMAT, format_timestamp, parse_timestamp};
use chrono::NaiveDate;
use rusqlite::{OptionalExtension, Row, TransactionBehavior, params};

const SELECT_EVENT: &str = "SELECT id, channel, instructor_id, card_uid, instructor_name,
        direction, timestamp, source
 FROM attendance_events";

/// Ledger backed by the single `attendance_events` table; the channel is
/// always a bound parameter.
pub struct SqliteLedger {
    pool: DbPool,
}

impl SqliteLedger {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Events for `channel` within `[from, to]` (inclusive dates), oldest first.
    pub fn events_between(
        &self,
        channel: &Channel,
        from: NaiveDate,
        to: NaiveDate,
    ) -> AppResult<Vec<AttendanceEvent>> {
        let mut stmt = self.pool.conn.prepare_cached(&format!(
            "{SELECT_EVENT}
             WHERE channel = ?1 AND substr(timestamp, 1, 10) BETWEEN ?2 AND ?3
             ORDER BY timestamp ASC, id ASC"
        ))?;

        let rows = stmt
            .query_map(
                params![
                    channel.as_str(),
                    from.format(DATE_FORMAT).to_string(),
                    to.format(DATE_FORMAT).to_string()
                ],
                map_event,
            )
            .map_err(classify)?;

        let mut out = Vec::new();
        for r in rows {
            out.push(r.map_err(classify)?);
        }
        Ok(out)
    }
}

pub fn map_event(row: &Row) -> rusqlite::Result<AttendanceEvent> {
    let channel_str: String = row.get("channel")?;
    let channel = Channel::parse(&channel_str).map_err(|e| conversion_error(1, e))?;

    let uid_str: String = row.get("card_uid")?;
    let card_uid = CardUid::parse(&uid_str).map_err(|e| conversion_error(3, e))?;

    let dir_str: String = row.get("direction")?;
    let direction = Direction::from_db_str(&dir_str)
        .ok_or_else(|| conversion_error(5, AppError::InvalidDirection(dir_str.clone())))?;

    let ts_str: String = row.get("timestamp")?;
    let timestamp = parse_timestamp(&ts_str).map_err(|e| conversion_error(6, e))?;

    let source_str: String = row.get("source")?;
    let source = EventSource::from_db_str(&source_str)
        .ok_or_else(|| conversion_error(7, AppError::InvalidSource(source_str.clone())))?;

    Ok(AttendanceEvent {
        id: row.get("id")?,
        channel,
        instructor_id: row.get("instructor_id")?,
        card_uid,
        instructor_name: row.get("instructor_name")?,
        direction,
        timestamp,
        source,
    })
}

impl LedgerStore for SqliteLedger {
    fn append(&mut self, event: &NewEvent) -> AppResult<AttendanceEvent> {
        let id = self
            .pool
            .with_conn(|conn| {
                // IMMEDIATE takes the write lock up front: contention shows up
                // here as SQLITE_BUSY and nothing has been written yet.
                let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
                tx.execute(
                    "INSERT INTO attendance_events
                         (channel, instructor_id, card_uid, instructor_name, direction, timestamp, source)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                    params![
                        event.channel.as_str(),
                        event.instructor_id,
                        event.card_uid.as_str(),
                        event.instructor_name,
                        event.direction.to_db_str(),
                        format_timestamp(&event.timestamp),
                        event.source.to_db_str(),
                    ],
                )?;
                let id = tx.last_insert_rowid();
                tx.commit()?;
                Ok(id)
            })
            .map_err(classify)?;

        Ok(event.clone().into_event(id))
    }

    fn last_event(
        &self,
        channel: &Channel,
        instructor_id: i64,
    ) -> AppResult<Option<AttendanceEvent>> {
        let mut stmt = self.pool.conn.prepare_cached(&format!(
            "{SELECT_EVENT}
             WHERE channel = ?1 AND instructor_id = ?2
             ORDER BY timestamp DESC, id DESC
             LIMIT 1"
        ))?;

        stmt.query_row(params![channel.as_str(), instructor_id], map_event)
            .optional()
            .map_err(classify)
    }

    fn events_on(&self, channel: &Channel, date: NaiveDate) -> AppResult<Vec<AttendanceEvent>> {
        self.events_between(channel, date, date)
    }
}
