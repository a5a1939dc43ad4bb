//! Database connection and operations

use chrono::Utc;
use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension};
use std::path::Path;
use std::sync::Arc;

use crate::migrations::run_migrations;
use crate::Result;

/// Item count and byte usage of one store in the synced area.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AreaUsage {
    pub items: usize,
    pub bytes: usize,
}

pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;

        // WAL mode so a second context can read while one writes
        let _: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;

        run_migrations(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        run_migrations(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn with_connection<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.conn.lock();
        f(&conn)
    }

    // === Synced area ===

    pub fn get_sync_entry(&self, store: &str, key: &str) -> Result<Option<String>> {
        self.with_connection(|conn| {
            let value = conn
                .query_row(
                    "SELECT value FROM sync_entries WHERE store = ?1 AND key = ?2",
                    [store, key],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(value)
        })
    }

    /// Runs `check` against the usage of `store` without `key`, then writes
    /// the entry, all under one connection lock. Nothing is written if
    /// `check` fails.
    pub fn put_sync_entry_checked<F>(
        &self,
        store: &str,
        key: &str,
        value: &str,
        check: F,
    ) -> Result<()>
    where
        F: FnOnce(AreaUsage) -> Result<()>,
    {
        self.with_connection(|conn| {
            check(usage_excluding(conn, store, key)?)?;
            insert_sync_entry(conn, store, key, value)
        })
    }

    pub fn delete_sync_entry(&self, store: &str, key: &str) -> Result<()> {
        self.with_connection(|conn| {
            conn.execute(
                "DELETE FROM sync_entries WHERE store = ?1 AND key = ?2",
                [store, key],
            )?;
            Ok(())
        })
    }

    /// Usage of `store` not counting `key`, so a write can be checked against
    /// the quota as if it replaced the current entry.
    pub fn sync_usage_excluding(&self, store: &str, key: &str) -> Result<AreaUsage> {
        self.with_connection(|conn| usage_excluding(conn, store, key))
    }

    // === Local area ===

    pub fn get_local_entry(&self, store: &str, key: &str) -> Result<Option<Vec<u8>>> {
        self.with_connection(|conn| {
            let value = conn
                .query_row(
                    "SELECT value FROM local_entries WHERE store = ?1 AND key = ?2",
                    [store, key],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(value)
        })
    }

    pub fn put_local_entry(&self, store: &str, key: &str, value: &[u8]) -> Result<()> {
        let updated_at = Utc::now().to_rfc3339();
        self.with_connection(|conn| {
            conn.execute(
                "INSERT OR REPLACE INTO local_entries (store, key, value, updated_at)
                 VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![store, key, value, updated_at],
            )?;
            Ok(())
        })
    }

    pub fn delete_local_entry(&self, store: &str, key: &str) -> Result<()> {
        self.with_connection(|conn| {
            conn.execute(
                "DELETE FROM local_entries WHERE store = ?1 AND key = ?2",
                [store, key],
            )?;
            Ok(())
        })
    }
}

fn insert_sync_entry(conn: &Connection, store: &str, key: &str, value: &str) -> Result<()> {
    let updated_at = Utc::now().to_rfc3339();
    conn.execute(
        "INSERT OR REPLACE INTO sync_entries (store, key, value, updated_at)
         VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![store, key, value, updated_at],
    )?;
    Ok(())
}

fn usage_excluding(conn: &Connection, store: &str, key: &str) -> Result<AreaUsage> {
    let (items, bytes): (i64, i64) = conn.query_row(
        "SELECT COUNT(*),
                COALESCE(SUM(LENGTH(CAST(key AS BLOB)) + LENGTH(CAST(value AS BLOB))), 0)
         FROM sync_entries WHERE store = ?1 AND key != ?2",
        [store, key],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;
    Ok(AreaUsage {
        items: items.max(0) as usize,
        bytes: bytes.max(0) as usize,
    })
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self {
            conn: Arc::clone(&self.conn),
        }
    }
}
