// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]
//! SQLite persistence for givehub.
//!
//! [`Store`] owns one `rusqlite` connection. Every operation that writes more
//! than one row runs inside a single transaction, and every permission rule
//! that depends on the hierarchy is evaluated against the database here so
//! the HTTP layer only has to authenticate.

use std::path::Path;

use givehub_model::{now_unix, CommissionStatus, DonationStatus, UserId};
use rusqlite::Connection;

mod certificates;
mod commissions;
mod dashboards;
mod donations;
mod error;
mod rows;
mod schema;
mod surveys;
mod targets;
mod users;

pub use certificates::Certificate;
pub use donations::{Completion, DEFAULT_HIGHLIGHTS, MAX_HIGHLIGHTS};
pub use error::StoreError;
pub use schema::SCHEMA_VERSION;
pub use targets::Division;

pub const CRATE_NAME: &str = "givehub-store";
pub const DEFAULT_PAGE_LIMIT: u32 = 50;
pub const MAX_PAGE_LIMIT: u32 = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: u32,
    pub offset: u32,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            limit: DEFAULT_PAGE_LIMIT,
            offset: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DonationFilter {
    pub status: Option<DonationStatus>,
    pub referrer: Option<UserId>,
    pub page: Page,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommissionFilter {
    pub status: Option<CommissionStatus>,
    pub beneficiary: Option<UserId>,
    pub page: Page,
}

pub struct Store {
    conn: Connection,
    clock: fn() -> i64,
}

impl Store {
    /// Opens (creating if needed) the database at `path` and migrates it.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let mut conn = Connection::open(path)?;
        schema::apply_connection_pragmas(&conn, true)?;
        schema::migrate(&mut conn)?;
        Ok(Self {
            conn,
            clock: now_unix,
        })
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        let mut conn = Connection::open_in_memory()?;
        schema::apply_connection_pragmas(&conn, false)?;
        schema::migrate(&mut conn)?;
        Ok(Self {
            conn,
            clock: now_unix,
        })
    }

    /// Replaces the wall clock, mainly so tests can pin timestamps.
    pub fn set_clock(&mut self, clock: fn() -> i64) {
        self.clock = clock;
    }

    pub(crate) fn now(&self) -> i64 {
        (self.clock)()
    }

    pub fn schema_version(&self) -> Result<i64, StoreError> {
        schema::user_version(&self.conn)
    }

    /// Cheap round trip used by readiness probes.
    pub fn ping(&self) -> Result<(), StoreError> {
        self.conn.query_row("SELECT 1", [], |_| Ok(()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_database_reports_current_schema_version() {
        let store = Store::open_in_memory().expect("store");
        assert_eq!(store.schema_version().expect("version"), SCHEMA_VERSION);
        store.ping().expect("ping");
    }

    #[test]
    fn reopening_a_file_database_keeps_the_schema() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("givehub.sqlite");
        drop(Store::open(&path).expect("first open"));
        let store = Store::open(&path).expect("second open");
        assert_eq!(store.schema_version().expect("version"), SCHEMA_VERSION);
    }

    #[test]
    fn newer_schema_is_refused() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("givehub.sqlite");
        {
            let conn = Connection::open(&path).expect("conn");
            conn.execute_batch("PRAGMA user_version=99;").expect("bump");
        }
        assert!(matches!(Store::open(&path), Err(StoreError::Corrupt(_))));
    }
}
