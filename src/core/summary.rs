use crate::models::{AttendanceEvent, Direction};
use chrono::NaiveTime;
use serde::Serialize;
use std::collections::BTreeMap;

/// One instructor's day on one channel.
#[derive(Debug, Clone, Serialize)]
pub struct InstructorDay {
    pub instructor_id: i64,
    pub name: String,
    /// Direction of the last event of the day: IN means still clocked in.
    pub status: Direction,
    pub last_time: NaiveTime,
    pub sequence: Vec<(Direction, NaiveTime)>,
}

impl InstructorDay {
    /// `IN 09:00 / OUT 18:00`
    pub fn sequence_str(&self) -> String {
        self.sequence
            .iter()
            .map(|(d, t)| format!("{} {}", d.to_db_str(), t.format("%H:%M")))
            .collect::<Vec<_>>()
            .join(" / ")
    }
}

/// Group a day's events (oldest first) per instructor, ordered by id.
pub fn daily_summary(events: &[AttendanceEvent]) -> Vec<InstructorDay> {
    let mut days: BTreeMap<i64, InstructorDay> = BTreeMap::new();

    for ev in events {
        let time = ev.timestamp.time();
        let day = days
            .entry(ev.instructor_id)
            .or_insert_with(|| InstructorDay {
                instructor_id: ev.instructor_id,
                name: ev.instructor_name.clone(),
                status: ev.direction,
                last_time: time,
                sequence: Vec::new(),
            });
        day.status = ev.direction;
        day.last_time = time;
        day.sequence.push((ev.direction, time));
    }

    days.into_values().collect()
}
