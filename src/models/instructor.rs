use super::CardUid;
use chrono::NaiveDateTime;
use serde::Serialize;

/// Roster entry. Created once at registration and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Instructor {
    pub instructor_id: i64,  // ⇔ instructors.instructor_id (UNIQUE, > 0)
    pub card_uid: CardUid,   // ⇔ instructors.card_uid (UNIQUE)
    pub name: String,        // ⇔ instructors.name
    pub created_at: NaiveDateTime,
}
