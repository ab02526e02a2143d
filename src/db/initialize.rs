use crate::db::migrate::run_pending_migrations;
use crate::errors::AppResult;
use rusqlite::Connection;

/// Prepare a database file for the terminal.
///
/// WAL lets the listing commands read while a reader thread holds the
/// write lock; writers still serialize and contend as `SQLITE_BUSY`.
/// Schema creation and upgrades are left to the migration engine.
pub fn init_db(conn: &Connection) -> AppResult<()> {
    let _mode: String =
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;

    run_pending_migrations(conn)?;
    Ok(())
}
