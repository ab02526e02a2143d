use crate::db::log::ktlog;
use crate::errors::{AppError, AppResult};
use crate::ui::messages::{success, warning};
use rusqlite::{Connection, OptionalExtension};

const UID_NORMALIZE_SQL: &str =
    "UPPER(REPLACE(REPLACE(REPLACE(card_uid, ' ', ''), ':', ''), '-', ''))";

/// Ensure that the `log` table exists; migrations record themselves there.
fn ensure_log_table(conn: &Connection) -> AppResult<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS log (
            id        INTEGER PRIMARY KEY AUTOINCREMENT,
            date      TEXT NOT NULL,
            operation TEXT NOT NULL,
            target    TEXT DEFAULT '',
            message   TEXT NOT NULL
        );
        "#,
    )?;
    Ok(())
}

/// Roster table. Both `instructor_id` and `card_uid` are unique keys.
fn create_instructors_table(conn: &Connection) -> AppResult<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS instructors (
            id            INTEGER PRIMARY KEY AUTOINCREMENT,
            instructor_id INTEGER UNIQUE NOT NULL CHECK(instructor_id > 0),
            card_uid      TEXT UNIQUE NOT NULL,
            name          TEXT NOT NULL,
            created_at    TEXT NOT NULL
        );
        "#,
    )?;
    Ok(())
}

/// Append-only ledger shared by every channel.
fn create_events_table(conn: &Connection) -> AppResult<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS attendance_events (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            channel         TEXT NOT NULL,
            instructor_id   INTEGER NOT NULL,
            card_uid        TEXT NOT NULL,
            instructor_name TEXT NOT NULL DEFAULT '',
            direction       TEXT NOT NULL CHECK(direction IN ('IN','OUT')),
            timestamp       TEXT NOT NULL,
            source          TEXT NOT NULL DEFAULT 'scan'
        );

        CREATE INDEX IF NOT EXISTS idx_events_channel_instructor_ts
            ON attendance_events(channel, instructor_id, timestamp);
        CREATE INDEX IF NOT EXISTS idx_events_channel_ts
            ON attendance_events(channel, timestamp);
        "#,
    )?;
    Ok(())
}

fn table_exists(conn: &Connection, name: &str) -> AppResult<bool> {
    let exists: Option<String> = conn
        .query_row(
            "SELECT name FROM sqlite_master WHERE type='table' AND name=?1",
            [name],
            |row| row.get(0),
        )
        .optional()?;
    Ok(exists.is_some())
}

fn is_applied(conn: &Connection, version: &str) -> AppResult<bool> {
    let found = conn
        .query_row(
            "SELECT 1 FROM log
             WHERE operation = 'migration_applied' AND target = ?1
             LIMIT 1",
            [version],
            |_| Ok(()),
        )
        .optional()?;
    Ok(found.is_some())
}

/// Run `apply` inside one transaction and mark `version` as applied.
/// Already-applied versions are skipped.
fn apply_once<F>(conn: &Connection, version: &str, message: &str, apply: F) -> AppResult<bool>
where
    F: FnOnce(&Connection) -> AppResult<()>,
{
    if is_applied(conn, version)? {
        return Ok(false);
    }

    conn.execute_batch("BEGIN IMMEDIATE")?;
    let result = apply(conn).and_then(|_| ktlog(conn, "migration_applied", version, message));

    match result {
        Ok(()) => {
            conn.execute_batch("COMMIT")?;
            success(format!("Migration applied: {} → {}", version, message));
            Ok(true)
        }
        Err(e) => {
            let _ = conn.execute_batch("ROLLBACK");
            Err(AppError::Migration(format!("{}: {}", version, e)))
        }
    }
}

/// Roster UIDs written by older releases kept the reader's spaced format.
fn migrate_normalize_roster_uids(conn: &Connection) -> AppResult<()> {
    apply_once(
        conn,
        "20250301_0001_normalize_card_uids",
        "normalized instructors.card_uid to plain uppercase hex",
        |c| {
            c.execute(
                &format!("UPDATE instructors SET card_uid = {UID_NORMALIZE_SQL}"),
                [],
            )?;
            Ok(())
        },
    )?;
    Ok(())
}

fn table_columns(conn: &Connection, table: &str) -> AppResult<Vec<String>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", table))?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>("name"))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(names)
}

/// Fold one legacy per-channel table into `attendance_events`.
///
/// Older files carry `instructor_id` and `instructor_name` on each row;
/// the oldest ones only have the card UID. Missing values are looked up in
/// the roster by normalized UID. Rows whose card is not in the roster are
/// left behind and counted in the log.
fn fold_legacy_table(conn: &Connection, table: &'static str, channel: &'static str) -> AppResult<()> {
    if !table_exists(conn, table)? {
        return Ok(());
    }

    let columns = table_columns(conn, table)?;
    let has = |name: &str| columns.iter().any(|c| c == name);
    let legacy_id = if has("instructor_id") { "t.instructor_id" } else { "NULL" };
    let legacy_name = if has("instructor_name") { "t.instructor_name" } else { "NULL" };

    let version = format!("20250301_0002_fold_{}", table);
    let message = format!("copied {} into attendance_events as channel '{}'", table, channel);
    let mut skipped: i64 = 0;

    let applied = apply_once(conn, &version, &message, |c| {
        // `table` is one of two compile-time names, never user input.
        let sql = format!(
            "INSERT INTO attendance_events
                 (channel, instructor_id, card_uid, instructor_name, direction, timestamp, source)
             SELECT ?1, f.instructor_id, f.card_uid, f.instructor_name, f.direction, f.timestamp, 'import'
             FROM (
                 SELECT COALESCE({legacy_id},
                                 (SELECT i.instructor_id FROM instructors i
                                   WHERE i.card_uid = {uid})) AS instructor_id,
                        {uid} AS card_uid,
                        COALESCE({legacy_name},
                                 (SELECT i.name FROM instructors i
                                   WHERE i.card_uid = {uid}), '') AS instructor_name,
                        t.record_type AS direction,
                        t.timestamp AS timestamp,
                        t.id AS legacy_id
                 FROM {table} t
             ) f
             WHERE f.instructor_id IS NOT NULL AND f.instructor_id > 0
             ORDER BY f.timestamp ASC, f.legacy_id ASC",
            uid = UID_NORMALIZE_SQL.replace("card_uid", "t.card_uid"),
        );
        let copied = c.execute(&sql, [channel])? as i64;

        let total: i64 = c.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
            row.get(0)
        })?;
        skipped = total - copied;
        if skipped > 0 {
            ktlog(
                c,
                "migration_skipped",
                &version,
                &format!("{} row(s) of {} have no known instructor", skipped, table),
            )?;
        }
        Ok(())
    })?;

    if applied {
        if skipped > 0 {
            warning(format!(
                "{} row(s) of '{}' have no registered instructor and were not imported.",
                skipped, table
            ));
        }
        warning(format!(
            "Legacy table '{}' was imported; it is kept untouched for reference.",
            table
        ));
    }
    Ok(())
}

/// Public entry point: run all pending migrations.
///
/// Invoked by db::initialize::init_db() and by every command that opens the DB.
pub fn run_pending_migrations(conn: &Connection) -> AppResult<()> {
    ensure_log_table(conn)?;
    create_instructors_table(conn)?;
    create_events_table(conn)?;

    migrate_normalize_roster_uids(conn)?;
    fold_legacy_table(conn, "time_records", "class")?;
    fold_legacy_table(conn, "meeting_records", "meeting")?;

    Ok(())
}
