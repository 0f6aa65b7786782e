//! SQL schema for the Tripbox SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS users (
    user_id                 TEXT PRIMARY KEY,
    forwarding_address      TEXT NOT NULL UNIQUE COLLATE NOCASE,
    -- Only ever changed through a conditional decrement or an increment.
    credits                 INTEGER NOT NULL DEFAULT 0 CHECK (credits >= 0),
    subscription_expires_at TEXT,            -- RFC 3339 UTC or NULL
    created_at              TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS trips (
    trip_id     TEXT PRIMARY KEY,
    user_id     TEXT NOT NULL REFERENCES users(user_id),
    name        TEXT NOT NULL,
    start_date  TEXT NOT NULL,               -- YYYY-MM-DD
    end_date    TEXT NOT NULL,               -- YYYY-MM-DD
    is_archived INTEGER NOT NULL DEFAULT 0,
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS documents (
    document_id    TEXT PRIMARY KEY,
    user_id        TEXT NOT NULL REFERENCES users(user_id),
    trip_id        TEXT REFERENCES trips(trip_id),   -- NULL = inbox
    category       TEXT NOT NULL,
    document_type  TEXT NOT NULL,
    title          TEXT NOT NULL,
    subtitle       TEXT,
    details_json   TEXT NOT NULL DEFAULT '{}',
    document_date  TEXT,                     -- YYYY-MM-DDTHH:MM:SS local
    file_url       TEXT,
    file_name      TEXT,
    file_mime_type TEXT,
    source         TEXT NOT NULL,            -- 'upload' | 'email' | 'camera'
    email_subject  TEXT,
    fingerprint    TEXT NOT NULL,
    is_read        INTEGER NOT NULL DEFAULT 0,
    created_at     TEXT NOT NULL,
    updated_at     TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS trips_user_start_idx      ON trips(user_id, start_date);
CREATE INDEX IF NOT EXISTS documents_fingerprint_idx ON documents(user_id, fingerprint);
CREATE INDEX IF NOT EXISTS documents_trip_idx        ON documents(trip_id);
CREATE INDEX IF NOT EXISTS documents_created_idx     ON documents(user_id, created_at);

PRAGMA user_version = 1;
";
