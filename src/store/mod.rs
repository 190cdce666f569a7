//! SQLite-backed store for businesses, services, customers, and queue
//! entries.
//!
//! Embedded persistence with:
//! - WAL mode for durability
//! - explicit multi-record transactions for every write path
//! - secondary indexes on (business, status), (helper, status),
//!   (helper, position), and joining time
//!
//! Module organization:
//! - `migration.rs` - schema and index creation
//! - `businesses.rs` - business documents with embedded helper lists
//! - `services.rs` - service catalog
//! - `customers.rs` - registered users and manual customers
//! - `entries.rs` - queue entries and lane queries

mod migration;

pub mod businesses;
pub mod customers;
pub mod entries;
pub mod services;


use std::path::PathBuf;

use parking_lot::Mutex;
use rusqlite::{Connection, Transaction, TransactionBehavior};
use tracing::info;

use crate::error::Result;

/// Store configuration.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Database location; `:memory:` keeps everything in-process.
    pub uri: String,
    /// Enable WAL mode (recommended for on-disk databases).
    pub wal_mode: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            uri: "lineup.db".to_string(),
            wal_mode: true,
        }
    }
}

impl StoreConfig {
    pub fn in_memory() -> Self {
        Self {
            uri: ":memory:".to_string(),
            wal_mode: false,
        }
    }
}

/// Transactional key-addressed store shared by all engine workers.
pub struct Store {
    /// Database connection (protected by Mutex for thread safety).
    conn: Mutex<Connection>,
    pub path: PathBuf,
}

impl Store {
    /// Open (or create) the store and apply pragmas.
    pub fn open(config: StoreConfig) -> Result<Self> {
        let in_memory = config.uri == ":memory:";
        if !in_memory {
            if let Some(parent) = PathBuf::from(&config.uri).parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent).ok();
                }
            }
        }

        let conn = if in_memory {
            Connection::open_in_memory()
        } else {
            Connection::open(&config.uri)
        }?;

        conn.execute_batch(&format!(
            "PRAGMA journal_mode = {};
             PRAGMA synchronous = NORMAL;
             PRAGMA foreign_keys = ON;
             PRAGMA busy_timeout = 5000;
             PRAGMA temp_store = MEMORY;",
            if config.wal_mode && !in_memory {
                "WAL"
            } else {
                "MEMORY"
            },
        ))?;

        info!(uri = %config.uri, "store opened");

        Ok(Self {
            conn: Mutex::new(conn),
            path: PathBuf::from(config.uri),
        })
    }

    /// Run schema migrations.
    pub fn migrate(&self) -> Result<()> {
        let conn = self.conn.lock();
        migration::migrate(&conn)
    }

    /// Run `f` inside a single immediate transaction. The transaction
    /// commits only when `f` returns Ok; any error rolls everything back.
    pub fn with_tx<T>(&self, f: impl FnOnce(&Transaction) -> Result<T>) -> Result<T> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let out = f(&tx)?;
        tx.commit()?;
        Ok(out)
    }

    /// Run `f` against the raw connection for snapshot reads. Positions
    /// observed here may be briefly stale relative to an in-flight
    /// transaction.
    pub fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let conn = self.conn.lock();
        f(&conn)
    }
}
