// SPDX-License-Identifier: Apache-2.0

use rusqlite::Connection;

use crate::StoreError;

pub const SCHEMA_VERSION: i64 = 1;

const SCHEMA_V1: &str = "
CREATE TABLE IF NOT EXISTS users (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  name TEXT NOT NULL,
  email TEXT NOT NULL UNIQUE,
  phone TEXT NOT NULL,
  role TEXT NOT NULL,
  parent_id INTEGER REFERENCES users(id),
  referral_code TEXT NOT NULL UNIQUE,
  token_digest TEXT NOT NULL UNIQUE,
  active INTEGER NOT NULL DEFAULT 1,
  created_at INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_users_parent ON users(parent_id);

CREATE TABLE IF NOT EXISTS donations (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  donor_name TEXT NOT NULL,
  donor_email TEXT NOT NULL,
  donor_phone TEXT NOT NULL,
  donor_pan TEXT,
  amount INTEGER NOT NULL CHECK (amount > 0),
  currency TEXT NOT NULL,
  referral_code TEXT,
  referrer_id INTEGER REFERENCES users(id),
  message TEXT,
  display_publicly INTEGER NOT NULL DEFAULT 0,
  status TEXT NOT NULL,
  payment_reference TEXT,
  created_at INTEGER NOT NULL,
  completed_at INTEGER
);
CREATE INDEX IF NOT EXISTS idx_donations_referrer ON donations(referrer_id, status);
CREATE INDEX IF NOT EXISTS idx_donations_status ON donations(status, completed_at);

CREATE TABLE IF NOT EXISTS commission_logs (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  donation_id INTEGER NOT NULL REFERENCES donations(id),
  beneficiary_id INTEGER NOT NULL REFERENCES users(id),
  depth INTEGER NOT NULL,
  rate_bps INTEGER NOT NULL,
  amount INTEGER NOT NULL,
  status TEXT NOT NULL,
  payment_reference TEXT,
  note TEXT,
  created_at INTEGER NOT NULL,
  updated_at INTEGER NOT NULL,
  UNIQUE (donation_id, beneficiary_id)
);
CREATE INDEX IF NOT EXISTS idx_commissions_beneficiary ON commission_logs(beneficiary_id, status);

CREATE TABLE IF NOT EXISTS targets (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  user_id INTEGER NOT NULL REFERENCES users(id),
  assigned_by INTEGER NOT NULL REFERENCES users(id),
  parent_target_id INTEGER REFERENCES targets(id),
  title TEXT NOT NULL,
  amount INTEGER NOT NULL CHECK (amount > 0),
  period_start INTEGER NOT NULL,
  period_end INTEGER NOT NULL CHECK (period_end > period_start),
  created_at INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_targets_user ON targets(user_id);
CREATE UNIQUE INDEX IF NOT EXISTS idx_targets_child
  ON targets(parent_target_id, user_id) WHERE parent_target_id IS NOT NULL;

CREATE TABLE IF NOT EXISTS survey_forms (
  slug TEXT PRIMARY KEY,
  title TEXT NOT NULL,
  fields_json TEXT NOT NULL,
  active INTEGER NOT NULL DEFAULT 1,
  created_at INTEGER NOT NULL
) WITHOUT ROWID;

CREATE TABLE IF NOT EXISTS survey_submissions (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  form_slug TEXT NOT NULL REFERENCES survey_forms(slug),
  answers_json TEXT NOT NULL,
  referrer_id INTEGER REFERENCES users(id),
  submitted_at INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_submissions_form ON survey_submissions(form_slug, referrer_id);

CREATE TABLE IF NOT EXISTS certificates (
  number TEXT PRIMARY KEY,
  donation_id INTEGER NOT NULL UNIQUE REFERENCES donations(id),
  content_hash TEXT NOT NULL,
  organization TEXT NOT NULL,
  issued_at INTEGER NOT NULL
) WITHOUT ROWID;
";

pub(crate) fn apply_connection_pragmas(conn: &Connection, file_backed: bool) -> Result<(), StoreError> {
    conn.execute_batch("PRAGMA foreign_keys=ON; PRAGMA busy_timeout=5000;")?;
    if file_backed {
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
    }
    Ok(())
}

pub(crate) fn user_version(conn: &Connection) -> Result<i64, StoreError> {
    Ok(conn.query_row("PRAGMA user_version", [], |row| row.get(0))?)
}

/// Creates or upgrades the schema. Newer databases are refused.
pub(crate) fn migrate(conn: &mut Connection) -> Result<(), StoreError> {
    let current = user_version(conn)?;
    if current > SCHEMA_VERSION {
        return Err(StoreError::Corrupt(format!(
            "database schema version {current} is newer than supported {SCHEMA_VERSION}"
        )));
    }
    if current == SCHEMA_VERSION {
        return Ok(());
    }
    let tx = conn.transaction()?;
    tx.execute_batch(SCHEMA_V1)?;
    tx.execute_batch(&format!("PRAGMA user_version={SCHEMA_VERSION};"))?;
    tx.commit()?;
    tracing::info!(from = current, to = SCHEMA_VERSION, "database schema migrated");
    Ok(())
}
