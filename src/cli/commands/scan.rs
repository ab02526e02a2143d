use super::{open_ledger, open_pool, open_roster, resolve_time};
use crate::cli::parser::Commands;
use crate::config::Config;
use crate::core::engine::AttendanceEngine;
use crate::core::feedback::BellFeedback;
use crate::core::monitor::ScanReport;
use crate::db::log;
use crate::errors::{AppError, AppResult};
use crate::models::{CardUid, Channel};
use crate::ui::report::{audit_entry, show_recorded};

/// One tap, outside the polling loop (scripts, keyboard-wedge readers).
pub fn handle(cmd: &Commands, cfg: &Config) -> AppResult<()> {
    if let Commands::Scan { uid, channel, at } = cmd {
        let channel = Channel::parse(channel)?;
        let uid = CardUid::parse(uid)?;
        let now = resolve_time(at.as_ref(), cfg)?;

        let pool = open_pool(cfg)?;
        let mut engine = AttendanceEngine::new(
            open_roster(cfg)?,
            open_ledger(cfg)?,
            BellFeedback::new(cfg.sound),
        )
        .with_policy(cfg.direction_policy)
        .with_retry(cfg.retry_policy());

        let result = engine.handle_scan(&channel, &uid, now);

        let report = match &result {
            Ok(recorded) => ScanReport::Recorded(recorded.clone()),
            Err(AppError::UnregisteredCard(_)) => ScanReport::Unregistered {
                channel: channel.clone(),
                uid: uid.clone(),
            },
            Err(AppError::WriteFailed { attempts }) => ScanReport::WriteFailed {
                channel: channel.clone(),
                uid: uid.clone(),
                attempts: *attempts,
            },
            Err(e) => ScanReport::Failed {
                channel: channel.clone(),
                uid: uid.clone(),
                message: e.to_string(),
            },
        };
        if let Some((op, target, message)) = audit_entry(&report) {
            log::ktlog_lenient(&pool.conn, op, &target, &message);
        }

        show_recorded(&result?);
    }

    Ok(())
}
