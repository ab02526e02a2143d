//! Roster import from CSV.
//!
//! Accepted header: `instructor_id,card_uid,name`; `instructor_id` may be
//! missing or empty, in which case the next free id is assigned.

use crate::errors::{AppError, AppResult};
use crate::models::{CardUid, Instructor};
use crate::store::RosterStore;
use chrono::NaiveDateTime;
use serde::Deserialize;
use std::io::Read;

#[derive(Debug, Clone, Deserialize)]
pub struct RosterRow {
    #[serde(default)]
    pub instructor_id: Option<i64>,
    pub card_uid: String,
    pub name: String,
}

/// A row that could not be imported, with the 1-based CSV line number.
#[derive(Debug, Clone)]
pub struct SkippedRow {
    pub line: usize,
    pub reason: String,
}

#[derive(Debug, Clone, Default)]
pub struct ImportReport {
    pub imported: Vec<Instructor>,
    pub skipped: Vec<SkippedRow>,
}

pub struct ImportLogic;

impl ImportLogic {
    pub fn read_rows<R: Read>(reader: R) -> AppResult<Vec<RosterRow>> {
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut rows = Vec::new();
        for row in rdr.deserialize() {
            rows.push(row?);
        }
        Ok(rows)
    }

    /// Register every row. Conflicts and malformed UIDs are skipped, any
    /// other error (database failure) aborts the import.
    pub fn apply<S: RosterStore + ?Sized>(
        roster: &mut S,
        rows: &[RosterRow],
        created_at: NaiveDateTime,
    ) -> AppResult<ImportReport> {
        let mut report = ImportReport::default();

        for (idx, row) in rows.iter().enumerate() {
            // header is line 1
            let line = idx + 2;

            let uid = match CardUid::parse(&row.card_uid) {
                Ok(uid) => uid,
                Err(e) => {
                    report.skipped.push(SkippedRow {
                        line,
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            if row.name.trim().is_empty() {
                report.skipped.push(SkippedRow {
                    line,
                    reason: "empty name".to_string(),
                });
                continue;
            }

            let id = match row.instructor_id {
                Some(id) => id,
                None => roster.next_available_id()?,
            };

            match roster.register(id, &uid, row.name.trim(), created_at) {
                Ok(instructor) => report.imported.push(instructor),
                Err(AppError::Conflict(reason)) => report.skipped.push(SkippedRow { line, reason }),
                Err(e) => return Err(e),
            }
        }

        Ok(report)
    }
}
