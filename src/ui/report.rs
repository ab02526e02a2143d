//! Rendering of scan outcomes, shared by `scan` and `monitor`.

use crate::core::engine::AttendanceRecorded;
use crate::core::monitor::ScanReport;
use crate::ui::messages::{error, info, success, warning};
use crate::utils::colors::{RESET, color_for_direction};
use crate::utils::time::format_timestamp;

pub fn show_recorded(r: &AttendanceRecorded) {
    success(format!(
        "[{}] {}{}{} #{} {} at {}",
        r.channel,
        color_for_direction(r.direction),
        r.direction.to_db_str(),
        RESET,
        r.instructor.instructor_id,
        r.instructor.name,
        format_timestamp(&r.timestamp)
    ));
}

pub fn show_report(report: &ScanReport) {
    match report {
        ScanReport::Recorded(r) => show_recorded(r),
        ScanReport::Unregistered { channel, uid } => {
            error(format!("[{}] Unregistered card {}", channel, uid))
        }
        ScanReport::WriteFailed {
            channel,
            uid,
            attempts,
        } => error(format!(
            "[{}] Card {} NOT recorded after {} attempts, please tap again",
            channel, uid, attempts
        )),
        ScanReport::Failed {
            channel,
            uid,
            message,
        } => error(format!("[{}] Card {} NOT recorded: {}", channel, uid, message)),
        ScanReport::SourceUnavailable { channel, reason } => {
            warning(format!("[{}] Reader unavailable: {}", channel, reason))
        }
        ScanReport::Stopped { channel } => info(format!("[{}] Reader stopped", channel)),
    }
}

/// `(operation, target, message)` for the internal log, if the outcome is worth keeping.
pub fn audit_entry(report: &ScanReport) -> Option<(&'static str, String, String)> {
    match report {
        ScanReport::Recorded(r) => Some((
            "scan",
            r.channel.to_string(),
            format!(
                "{} #{} {} ({}) at {}",
                r.direction.to_db_str(),
                r.instructor.instructor_id,
                r.instructor.name,
                r.instructor.card_uid,
                format_timestamp(&r.timestamp)
            ),
        )),
        ScanReport::Unregistered { channel, uid } => Some((
            "unregistered",
            channel.to_string(),
            format!("card {}", uid),
        )),
        ScanReport::WriteFailed {
            channel,
            uid,
            attempts,
        } => Some((
            "write_failed",
            channel.to_string(),
            format!("card {} after {} attempts", uid, attempts),
        )),
        ScanReport::Failed {
            channel,
            uid,
            message,
        } => Some((
            "scan_error",
            channel.to_string(),
            format!("card {}: {}", uid, message),
        )),
        ScanReport::SourceUnavailable { channel, reason } => {
            Some(("monitor", channel.to_string(), format!("reader unavailable: {}", reason)))
        }
        ScanReport::Stopped { .. } => None,
    }
}
