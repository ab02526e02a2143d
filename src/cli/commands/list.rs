use super::{open_ledger, open_pool};
use crate::cli::parser::Commands;
use crate::config::Config;
use crate::core::summary::daily_summary;
use crate::errors::AppResult;
use crate::models::Channel;
use crate::store::LedgerStore;
use crate::ui::messages::{header, info};
use crate::utils::colors::{CYAN, GREY, RESET, color_for_direction};
use crate::utils::table::Table;
use crate::utils::time::{parse_date, today_in};

pub fn handle(cmd: &Commands, cfg: &Config) -> AppResult<()> {
    if let Commands::List {
        channel,
        date,
        summary,
        json,
    } = cmd
    {
        let channel = Channel::parse(channel)?;
        let day = match date {
            Some(d) => parse_date(d)?,
            None => today_in(&cfg.offset()?),
        };

        open_pool(cfg)?;
        let ledger = open_ledger(cfg)?;
        let events = ledger.events_on(&channel, day)?;

        if *json {
            println!("{}", serde_json::to_string_pretty(&events)?);
            return Ok(());
        }

        header(format!("{} • {}", channel, day));

        if events.is_empty() {
            info(format!("No events on {} for channel '{}'.", day, channel));
            return Ok(());
        }

        if *summary {
            let days = daily_summary(&events);
            let mut table = Table::new(["ID", "Name", "Status", "Last", "Sequence"]);
            for d in &days {
                let status = if d.status.is_in() { "present" } else { "left" };
                table.add_row(vec![
                    d.instructor_id.to_string(),
                    d.name.clone(),
                    status.to_string(),
                    d.last_time.format("%H:%M:%S").to_string(),
                    d.sequence_str(),
                ]);
            }
            print!("{}", table.render());
            let present = days.iter().filter(|d| d.status.is_in()).count();
            info(format!(
                "{} instructor(s) scanned, {}{}{} still clocked in",
                days.len(),
                CYAN,
                present,
                RESET
            ));
            return Ok(());
        }

        for ev in &events {
            println!(
                "{:>6}  {}  {}{:<3}{}  #{:<4} {}  {}{}{}",
                ev.id,
                ev.timestamp_str(),
                color_for_direction(ev.direction),
                ev.direction.to_db_str(),
                RESET,
                ev.instructor_id,
                ev.instructor_name,
                GREY,
                ev.source.to_db_str(),
                RESET
            );
        }
        let ins = events.iter().filter(|e| e.direction.is_in()).count();
        info(format!(
            "{} event(s): {} IN, {} OUT",
            events.len(),
            ins,
            events.len() - ins
        ));
    }

    Ok(())
}
