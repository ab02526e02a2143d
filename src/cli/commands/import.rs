use super::{open_pool, open_roster, resolve_time};
use crate::cli::parser::Commands;
use crate::config::Config;
use crate::core::import::ImportLogic;
use crate::db::log;
use crate::errors::AppResult;
use crate::ui::messages::{success, warning};
use std::fs::File;

pub fn handle(cmd: &Commands, cfg: &Config) -> AppResult<()> {
    if let Commands::Import { file } = cmd {
        let rows = ImportLogic::read_rows(File::open(file)?)?;

        let pool = open_pool(cfg)?;
        let mut roster = open_roster(cfg)?;
        let now = resolve_time(None, cfg)?;

        let report = ImportLogic::apply(&mut roster, &rows, now)?;

        for skipped in &report.skipped {
            warning(format!("line {}: skipped ({})", skipped.line, skipped.reason));
        }

        let summary = format!(
            "{} imported, {} skipped from {}",
            report.imported.len(),
            report.skipped.len(),
            file
        );
        log::ktlog_lenient(&pool.conn, "import", file, &summary);
        success(summary);
    }

    Ok(())
}
