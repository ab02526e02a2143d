use super::{open_ledger, open_pool, open_roster, resolve_time};
use crate::cli::parser::Commands;
use crate::config::Config;
use crate::core::correction::CorrectionLogic;
use crate::db::log;
use crate::errors::{AppError, AppResult};
use crate::models::{Channel, Direction};
use crate::ui::messages::success;

pub fn handle(cmd: &Commands, cfg: &Config) -> AppResult<()> {
    if let Commands::Correct {
        id,
        direction,
        channel,
        at,
    } = cmd
    {
        let channel = Channel::parse(channel)?;
        let dir = Direction::from_input(direction)
            .ok_or_else(|| AppError::InvalidDirection(direction.to_string()))?;
        let at = resolve_time(at.as_ref(), cfg)?;

        let pool = open_pool(cfg)?;
        let roster = open_roster(cfg)?;
        let mut ledger = open_ledger(cfg)?;

        let event = CorrectionLogic::register(
            &roster,
            &mut ledger,
            &channel,
            *id,
            dir,
            at,
            cfg.retry_policy(),
        )?;

        let message = format!(
            "{} #{} {} at {}",
            event.direction.to_db_str(),
            event.instructor_id,
            event.instructor_name,
            event.timestamp_str()
        );
        log::ktlog_lenient(&pool.conn, "correct", channel.as_str(), &message);
        success(format!("[{}] Correction registered: {}", channel, message));
    }

    Ok(())
}
