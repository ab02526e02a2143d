use super::RosterStore;
use crate::core::import::{ImportLogic, ImportReport};
use crate::errors::{AppError, AppResult};
use crate::models::{CardUid, Instructor};
use chrono::NaiveDateTime;
use std::collections::{BTreeMap, HashMap};
use std::io::Read;

/// Roster held in memory, typically loaded from a CSV file.
#[derive(Debug, Default, Clone)]
pub struct MemoryRoster {
    by_id: BTreeMap<i64, Instructor>,
    id_by_uid: HashMap<CardUid, i64>,
}

impl MemoryRoster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a roster from CSV rows (`instructor_id,card_uid,name`, id optional).
    /// Conflicting rows are skipped and counted in the report.
    pub fn from_csv<R: Read>(
        reader: R,
        created_at: NaiveDateTime,
    ) -> AppResult<(Self, ImportReport)> {
        let rows = ImportLogic::read_rows(reader)?;
        let mut roster = Self::new();
        let report = ImportLogic::apply(&mut roster, &rows, created_at)?;
        Ok((roster, report))
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

impl RosterStore for MemoryRoster {
    fn lookup_by_uid(&self, uid: &CardUid) -> AppResult<Option<Instructor>> {
        Ok(self
            .id_by_uid
            .get(uid)
            .and_then(|id| self.by_id.get(id))
            .cloned())
    }

    fn lookup_by_id(&self, instructor_id: i64) -> AppResult<Option<Instructor>> {
        Ok(self.by_id.get(&instructor_id).cloned())
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
        if self.by_id.contains_key(&instructor_id) {
            return Err(AppError::Conflict(format!(
                "instructor id {} is already registered",
                instructor_id
            )));
        }
        if let Some(owner) = self.id_by_uid.get(uid) {
            return Err(AppError::Conflict(format!(
                "card {} is already registered to instructor {}",
                uid, owner
            )));
        }

        let instructor = Instructor {
            instructor_id,
            card_uid: uid.clone(),
            name: name.to_string(),
            created_at,
        };
        self.id_by_uid.insert(uid.clone(), instructor_id);
        self.by_id.insert(instructor_id, instructor.clone());
        Ok(instructor)
    }

    fn next_available_id(&self) -> AppResult<i64> {
        Ok(self.by_id.keys().next_back().map_or(1, |max| max + 1))
    }

    fn list(&self) -> AppResult<Vec<Instructor>> {
        Ok(self.by_id.values().cloned().collect())
    }
}
