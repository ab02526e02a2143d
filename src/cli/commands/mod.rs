pub mod config;
pub mod correct;
pub mod import;
pub mod init;
pub mod instructors;
pub mod list;
pub mod log;
pub mod monitor;
pub mod register;
pub mod scan;

use crate::config::Config;
use crate::db::initialize::init_db;
use crate::db::pool::DbPool;
use crate::db::{SqliteLedger, SqliteRoster};
use crate::errors::AppResult;
use crate::utils::time::{now_in, parse_timestamp};
use chrono::NaiveDateTime;

/// Open the configured database and bring its schema up to date.
pub(crate) fn open_pool(cfg: &Config) -> AppResult<DbPool> {
    let pool = DbPool::with_busy_timeout(&cfg.database, cfg.busy_timeout())?;
    init_db(&pool.conn)?;
    Ok(pool)
}

/// Extra connections for the stores; the schema is already migrated.
pub(crate) fn open_roster(cfg: &Config) -> AppResult<SqliteRoster> {
    Ok(SqliteRoster::new(DbPool::with_busy_timeout(
        &cfg.database,
        cfg.busy_timeout(),
    )?))
}

pub(crate) fn open_ledger(cfg: &Config) -> AppResult<SqliteLedger> {
    Ok(SqliteLedger::new(DbPool::with_busy_timeout(
        &cfg.database,
        cfg.busy_timeout(),
    )?))
}

/// `--at` value, or the current time in the configured offset.
pub(crate) fn resolve_time(at: Option<&String>, cfg: &Config) -> AppResult<NaiveDateTime> {
    match at {
        Some(s) => parse_timestamp(s),
        None => Ok(now_in(&cfg.offset()?)),
    }
}
