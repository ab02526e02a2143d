use crate::db::pool::DbPool;
use crate::errors::AppResult;
use ansi_term::Colour;
use regex::Regex;
use std::sync::LazyLock;

static ANSI: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\x1B\[[0-9;]*[mK]").expect("valid ANSI pattern"));

const OP_WIDTH_MAX: usize = 48;

fn strip_ansi(s: &str) -> String {
    ANSI.replace_all(s, "").into_owned()
}

/// Colour of an audit operation.
fn color_for_operation(op: &str) -> Colour {
    match op {
        "scan" | "register" => Colour::Green,
        "correct" => Colour::Yellow,
        "unregistered" | "write_failed" | "scan_error" => Colour::Red,
        "import" => Colour::Blue,
        "migration_applied" => Colour::Purple,
        "init" | "monitor" => Colour::RGB(255, 153, 51),
        _ => Colour::White,
    }
}

pub struct LogLogic;

impl LogLogic {
    pub fn print_log(pool: &mut DbPool, limit: Option<usize>) -> AppResult<()> {
        let mut stmt = pool.conn.prepare_cached(
            "SELECT id, date, operation, target, message FROM log
             ORDER BY id DESC LIMIT ?1",
        )?;
        let limit = limit.map_or(-1, |l| l as i64);

        let rows = stmt.query_map([limit], |row| {
            let id: i64 = row.get(0)?;
            let raw_date: String = row.get(1)?;
            let operation: String = row.get(2)?;
            let target: Option<String> = row.get(3)?;
            let message: String = row.get(4)?;

            let date = chrono::DateTime::parse_from_rfc3339(&raw_date)
                .map(|dt| dt.format("%FT%T%:z").to_string())
                .unwrap_or(raw_date);

            Ok((id, date, operation, target.unwrap_or_default(), message))
        })?;

        let mut entries = Vec::new();
        for r in rows {
            entries.push(r?);
        }
        entries.reverse();

        if entries.is_empty() {
            println!("📜 Internal log is empty.");
            return Ok(());
        }

        let id_w = entries
            .iter()
            .map(|(id, ..)| id.to_string().len())
            .max()
            .unwrap_or(1);
        let date_w = entries
            .iter()
            .map(|(_, date, ..)| date.len())
            .max()
            .unwrap_or(10);

        println!("📜 Internal log:\n");

        for (id, date, operation, target, message) in entries {
            let color = color_for_operation(&operation);

            let mut label = color.paint(operation.as_str()).to_string();
            if !target.is_empty() {
                label.push_str(&format!(" ({})", target));
            }

            let visible = strip_ansi(&label);
            let label = if visible.chars().count() > OP_WIDTH_MAX {
                let cut: String = visible.chars().take(OP_WIDTH_MAX - 3).collect();
                match cut.split_once(' ') {
                    Some((op, rest)) => format!("{} {}...", color.paint(op), rest),
                    None => format!("{}...", color.paint(cut.as_str())),
                }
            } else {
                label
            };

            let padding = " ".repeat(OP_WIDTH_MAX.saturating_sub(strip_ansi(&label).chars().count()));

            println!(
                "{:>id_w$}: {:<date_w$} | {}{} => {}",
                id,
                date,
                label,
                padding,
                message,
                id_w = id_w,
                date_w = date_w
            );
        }

        Ok(())
    }
}
