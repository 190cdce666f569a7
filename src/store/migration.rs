//! Schema and index creation.

use rusqlite::Connection;
use tracing::debug;

use crate::error::Result;

/// Create tables and secondary indexes. Idempotent.
pub fn migrate(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS businesses (
            id          TEXT PRIMARY KEY,
            owner_id    TEXT NOT NULL,
            active      INTEGER NOT NULL DEFAULT 1,
            timezone    TEXT NOT NULL DEFAULT 'UTC',
            deleted     INTEGER NOT NULL DEFAULT 0,
            suspended   INTEGER NOT NULL DEFAULT 0,
            helpers     TEXT NOT NULL DEFAULT '[]'
        );

        CREATE TABLE IF NOT EXISTS services (
            id               TEXT PRIMARY KEY,
            business_id      TEXT NOT NULL,
            name             TEXT NOT NULL,
            duration_minutes INTEGER NOT NULL,
            price            REAL NOT NULL,
            allowed_genders  TEXT NOT NULL DEFAULT '[]',
            deleted          INTEGER NOT NULL DEFAULT 0
        );
        CREATE INDEX IF NOT EXISTS idx_services_business
            ON services(business_id);

        CREATE TABLE IF NOT EXISTS users (
            id                    TEXT PRIMARY KEY,
            push_token            TEXT,
            receive_notifications INTEGER NOT NULL DEFAULT 1,
            gender                TEXT NOT NULL,
            active                INTEGER NOT NULL DEFAULT 1,
            deleted               INTEGER NOT NULL DEFAULT 0,
            suspended             INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS manual_customers (
            id          TEXT PRIMARY KEY,
            business_id TEXT NOT NULL,
            name        TEXT NOT NULL,
            phone       TEXT NOT NULL,
            gender      TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_manual_business
            ON manual_customers(business_id);

        CREATE TABLE IF NOT EXISTS queue_entries (
            id                     TEXT PRIMARY KEY,
            business_id            TEXT NOT NULL,
            helper_id              TEXT NOT NULL,
            user_type              TEXT NOT NULL,
            user_id                TEXT NOT NULL,
            service_id             TEXT NOT NULL,
            gender                 TEXT NOT NULL,
            preference             TEXT NOT NULL,
            joining_position       INTEGER NOT NULL,
            current_position       INTEGER NOT NULL,
            joining_time           INTEGER NOT NULL,
            created_at             INTEGER NOT NULL,
            est_service_start_time INTEGER NOT NULL,
            est_wait               INTEGER NOT NULL,
            added_time             INTEGER NOT NULL DEFAULT 0,
            status                 TEXT NOT NULL,
            total                  REAL NOT NULL,
            rating                 INTEGER,
            notes                  TEXT,
            history                TEXT NOT NULL DEFAULT '[]'
        );
        CREATE INDEX IF NOT EXISTS idx_entries_business_status
            ON queue_entries(business_id, status);
        CREATE INDEX IF NOT EXISTS idx_entries_helper_status
            ON queue_entries(helper_id, status);
        CREATE INDEX IF NOT EXISTS idx_entries_helper_position
            ON queue_entries(helper_id, current_position);
        CREATE INDEX IF NOT EXISTS idx_entries_joining_time
            ON queue_entries(joining_time);
        CREATE INDEX IF NOT EXISTS idx_entries_user
            ON queue_entries(user_type, user_id);",
    )?;

    debug!("store migrations applied");
    Ok(())
}
