use super::{open_pool, open_roster, resolve_time};
use crate::cli::parser::Commands;
use crate::config::Config;
use crate::db::log;
use crate::errors::AppResult;
use crate::models::CardUid;
use crate::store::RosterStore;
use crate::ui::messages::success;

/// Register a card for an instructor.
pub fn handle(cmd: &Commands, cfg: &Config) -> AppResult<()> {
    if let Commands::Register { uid, name, id } = cmd {
        let uid = CardUid::parse(uid)?;
        let pool = open_pool(cfg)?;
        let mut roster = open_roster(cfg)?;

        let instructor_id = match id {
            Some(id) => *id,
            None => roster.next_available_id()?,
        };
        let now = resolve_time(None, cfg)?;

        let instructor = roster.register(instructor_id, &uid, name.trim(), now)?;

        log::ktlog_lenient(
            &pool.conn,
            "register",
            &instructor.instructor_id.to_string(),
            &format!("{} ({})", instructor.name, instructor.card_uid),
        );

        success(format!(
            "Registered #{} {} with card {}",
            instructor.instructor_id, instructor.name, instructor.card_uid
        ));
    }

    Ok(())
}
