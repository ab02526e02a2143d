use super::{open_pool, open_roster};
use crate::cli::parser::Commands;
use crate::config::Config;
use crate::errors::AppResult;
use crate::store::RosterStore;
use crate::ui::messages::info;
use crate::utils::table::Table;
use crate::utils::time::format_timestamp;

pub fn handle(cmd: &Commands, cfg: &Config) -> AppResult<()> {
    match cmd {
        Commands::Instructors => {
            open_pool(cfg)?;
            let roster = open_roster(cfg)?;
            let instructors = roster.list()?;

            if instructors.is_empty() {
                info("No instructors registered.");
                return Ok(());
            }

            let mut table = Table::new(["ID", "Card UID", "Name", "Registered"]);
            for i in &instructors {
                table.add_row(vec![
                    i.instructor_id.to_string(),
                    i.card_uid.to_string(),
                    i.name.clone(),
                    format_timestamp(&i.created_at),
                ]);
            }
            print!("{}", table.render());
            info(format!("{} instructor(s) registered", instructors.len()));
        }
        Commands::NextId => {
            open_pool(cfg)?;
            let roster = open_roster(cfg)?;
            println!("{}", roster.next_available_id()?);
        }
        _ => {}
    }

    Ok(())
}
