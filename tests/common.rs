#![allow(dead_code)]
use assert_cmd::{Command, cargo_bin_cmd};
use chrono::NaiveDateTime;
use kintouch::db::initialize::init_db;
use kintouch::db::pool::DbPool;
use kintouch::models::{CardUid, Channel};
use std::env;
use std::fs;
use std::path::PathBuf;

/// Binary under test, with its config directory redirected to the temp dir.
pub fn kt() -> Command {
    let mut cmd = cargo_bin_cmd!("kintouch");
    cmd.env("KINTOUCH_HOME", test_home());
    cmd
}

pub fn test_home() -> PathBuf {
    let mut path: PathBuf = env::temp_dir();
    path.push("kintouch_test_home");
    path
}

/// Create a unique test DB path inside the system temp dir and remove any existing file
pub fn setup_test_db(name: &str) -> String {
    let mut path: PathBuf = env::temp_dir();
    path.push(format!("{}_kintouch.sqlite", name));
    let db_path = path.to_string_lossy().to_string();
    fs::remove_file(&db_path).ok();
    for suffix in ["-journal", "-wal", "-shm"] {
        fs::remove_file(format!("{}{}", db_path, suffix)).ok();
    }
    db_path
}

/// Create a temporary output file path inside tempdir and ensure it's removed
pub fn temp_out(name: &str, ext: &str) -> String {
    let mut path: PathBuf = env::temp_dir();
    path.push(format!("{}_out.{}", name, ext));
    let p = path.to_string_lossy().to_string();
    fs::remove_file(&p).ok();
    p
}

/// Fresh, migrated database opened through the library.
pub fn open_test_pool(name: &str) -> (String, DbPool) {
    let db_path = setup_test_db(name);
    let pool = DbPool::new(&db_path).expect("open db");
    init_db(&pool.conn).expect("init db");
    (db_path, pool)
}

/// `--db <path> --test init`
pub fn init_cli_db(db_path: &str) {
    kt().args(["--db", db_path, "--test", "init"])
        .assert()
        .success();
}

/// Init the DB and register two instructors through the CLI.
pub fn init_db_with_roster(db_path: &str) {
    init_cli_db(db_path);

    kt().args(["--db", db_path, "register", "04 12 34", "Alice", "--id", "1"])
        .assert()
        .success();

    kt().args(["--db", db_path, "register", "04:AB:CD", "Bob", "--id", "2"])
        .assert()
        .success();
}

pub fn uid(raw: &str) -> CardUid {
    CardUid::parse(raw).expect("valid uid")
}

pub fn ts(raw: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").expect("valid timestamp")
}

pub fn class() -> Channel {
    Channel::class()
}

pub fn meeting() -> Channel {
    Channel::meeting()
}
