use super::pool::DbPool;
use super::{classify, conversion_error};
use crate::errors::{AppError, AppResult};
use crate::models::{CardUid, Instructor};
use crate::store::RosterStore;
use crate::utils::time::{TS_FORMAT, format_timestamp};
use chrono::NaiveDateTime;
use rusqlite::{OptionalExtension, Row, TransactionBehavior, params};

const SELECT_INSTRUCTOR: &str = "SELECT instructor_id, card_uid, name, created_at FROM instructors";

/// Roster backed by the `instructors` table.
pub struct SqliteRoster {
    pool: DbPool,
}

impl SqliteRoster {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_instructor(row: &Row) -> rusqlite::Result<Instructor> {
    let uid_str: String = row.get("card_uid")?;
    let card_uid = CardUid::parse(&uid_str).map_err(|e| conversion_error(1, e))?;

    let created_str: String = row.get("created_at")?;
    let created_at = NaiveDateTime::parse_from_str(&created_str, TS_FORMAT)
        .map_err(|_| conversion_error(3, AppError::InvalidTimestamp(created_str.clone())))?;

    Ok(Instructor {
        instructor_id: row.get("instructor_id")?,
        card_uid,
        name: row.get("name")?,
        created_at,
    })
}

impl RosterStore for SqliteRoster {
    fn lookup_by_uid(&self, uid: &CardUid) -> AppResult<Option<Instructor>> {
        let mut stmt = self
            .pool
            .conn
            .prepare_cached(&format!("{SELECT_INSTRUCTOR} WHERE card_uid = ?1"))?;
        stmt.query_row([uid.as_str()], map_instructor)
            .optional()
            .map_err(classify)
    }

    fn lookup_by_id(&self, instructor_id: i64) -> AppResult<Option<Instructor>> {
        let mut stmt = self
            .pool
            .conn
            .prepare_cached(&format!("{SELECT_INSTRUCTOR} WHERE instructor_id = ?1"))?;
        stmt.query_row([instructor_id], map_instructor)
            .optional()
            .map_err(classify)
    }

    fn register(
        &mut self,
        instructor_id: i64,
        uid: &CardUid,
        name: &str,
        created_at: NaiveDateTime,
    ) -> AppResult<Instructor> {
        if instructor_id <= 0 {
            return Err(AppError::Conflict(format!(
                "instructor id must be positive, got {}",
                instructor_id
            )));
        }

        let tx = self
            .pool
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(classify)?;

        // Two independent unique keys: check both before inserting.
        let id_taken = tx
            .query_row(
                "SELECT 1 FROM instructors WHERE instructor_id = ?1",
                [instructor_id],
                |_| Ok(()),
            )
            .optional()
            .map_err(classify)?
            .is_some();
        if id_taken {
            return Err(AppError::Conflict(format!(
                "instructor id {} is already registered",
                instructor_id
            )));
        }

        let uid_owner: Option<i64> = tx
            .query_row(
                "SELECT instructor_id FROM instructors WHERE card_uid = ?1",
                [uid.as_str()],
                |row| row.get(0),
            )
            .optional()
            .map_err(classify)?;
        if let Some(owner) = uid_owner {
            return Err(AppError::Conflict(format!(
                "card {} is already registered to instructor {}",
                uid, owner
            )));
        }

        tx.execute(
            "INSERT INTO instructors (instructor_id, card_uid, name, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![instructor_id, uid.as_str(), name, format_timestamp(&created_at)],
        )
        .map_err(|e| match e {
            rusqlite::Error::SqliteFailure(f, _)
                if f.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                AppError::Conflict(format!(
                    "instructor id {} or card {} is already registered",
                    instructor_id, uid
                ))
            }
            other => classify(other),
        })?;
        tx.commit().map_err(classify)?;

        Ok(Instructor {
            instructor_id,
            card_uid: uid.clone(),
            name: name.to_string(),
            created_at,
        })
    }

    fn next_available_id(&self) -> AppResult<i64> {
        let max: Option<i64> = self
            .pool
            .conn
            .query_row("SELECT MAX(instructor_id) FROM instructors", [], |row| {
                row.get(0)
            })
            .map_err(classify)?;
        Ok(max.map_or(1, |m| m + 1))
    }

    fn list(&self) -> AppResult<Vec<Instructor>> {
        let mut stmt = self
            .pool
            .conn
            .prepare(&format!("{SELECT_INSTRUCTOR} ORDER BY instructor_id ASC"))?;
        let rows = stmt.query_map([], map_instructor)?;

        let mut out = Vec::new();
        for r in rows {
            out.push(r?);
        }
        Ok(out)
    }
}
