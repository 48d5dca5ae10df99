// Copyright 2023 Remi Bernotavicius

use diesel::prelude::Connection as _;
use diesel::RunQueryDsl as _;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use std::path::Path;

pub mod models;
pub mod schema;

pub type Connection = diesel::sqlite::SqliteConnection;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!();

/// How long a connection waits on another writer (another user's planning run) before giving up.
const BUSY_TIMEOUT_MS: u32 = 5_000;

fn open(url: &str) -> crate::Result<Connection> {
    let mut connection = Connection::establish(url)?;
    diesel::sql_query("PRAGMA foreign_keys = ON").execute(&mut connection)?;
    diesel::sql_query(format!("PRAGMA busy_timeout = {BUSY_TIMEOUT_MS}")).execute(&mut connection)?;
    connection.run_pending_migrations(MIGRATIONS)?;
    Ok(connection)
}

pub fn establish_connection(path: impl AsRef<Path>) -> crate::Result<Connection> {
    let path = path.as_ref();
    let url = path
        .to_str()
        .ok_or_else(|| format!("database path {} is not valid UTF-8", path.display()))?;
    open(url)
}

/// A private database that disappears with the connection.
pub fn establish_in_memory() -> crate::Result<Connection> {
    open(":memory:")
}

#[test]
fn migrations() {
    let mut conn = establish_in_memory().unwrap();
    conn.revert_all_migrations(MIGRATIONS).unwrap();
    conn.run_pending_migrations(MIGRATIONS).unwrap();
    assert!(!conn.has_pending_migration(MIGRATIONS).unwrap());
}
