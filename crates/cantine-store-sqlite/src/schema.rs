//! SQL schema for the Cantine SQLite store.
//!
//! Executed at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS consumers (
    id          TEXT PRIMARY KEY,
    name        TEXT NOT NULL,
    department  TEXT,
    created_at  TEXT NOT NULL    -- RFC 3339 UTC, fixed width
);

-- At most one row per consumer and day; no row means absent.
CREATE TABLE IF NOT EXISTS presences (
    id          TEXT PRIMARY KEY,
    consumer_id TEXT NOT NULL REFERENCES consumers(id) ON DELETE CASCADE,
    date        TEXT NOT NULL,   -- YYYY-MM-DD
    is_present  INTEGER NOT NULL DEFAULT 1,
    created_at  TEXT NOT NULL,
    UNIQUE (consumer_id, date)
);

-- Consumptions are never updated, only inserted or deleted.
CREATE TABLE IF NOT EXISTS consumptions (
    id          TEXT PRIMARY KEY,
    consumer_id TEXT NOT NULL REFERENCES consumers(id) ON DELETE CASCADE,
    amount      INTEGER NOT NULL,
    date        TEXT NOT NULL,
    created_at  TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS consumers_name_idx        ON consumers(name);
CREATE INDEX IF NOT EXISTS presences_date_idx        ON presences(date);
CREATE INDEX IF NOT EXISTS consumptions_date_idx     ON consumptions(date);
CREATE INDEX IF NOT EXISTS consumptions_consumer_idx ON consumptions(consumer_id);

PRAGMA user_version = 1;
";
