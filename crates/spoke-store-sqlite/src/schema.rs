//! SQL schema for the Spoke SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- One row per document. No DELETE is ever issued against this table;
-- AUTOINCREMENT keeps `seq` from being reused.
CREATE TABLE IF NOT EXISTS documents (
    seq         INTEGER PRIMARY KEY AUTOINCREMENT,
    collection  TEXT NOT NULL,
    doc_id      TEXT NOT NULL,
    data        TEXT NOT NULL,   -- JSON object, without the id
    created_at  TEXT NOT NULL,   -- RFC 3339 UTC; server-assigned
    updated_at  TEXT NOT NULL,
    UNIQUE (collection, doc_id)
);

CREATE TABLE IF NOT EXISTS accounts (
    uid           TEXT PRIMARY KEY,
    email         TEXT NOT NULL UNIQUE,
    display_name  TEXT,
    password_hash TEXT NOT NULL,   -- argon2 PHC string
    created_at    TEXT NOT NULL
);

-- Bearer sessions; only the SHA-256 of the token is stored.
CREATE TABLE IF NOT EXISTS sessions (
    token_hash  TEXT PRIMARY KEY,
    uid         TEXT NOT NULL REFERENCES accounts(uid),
    created_at  TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS documents_collection_idx ON documents(collection);
CREATE INDEX IF NOT EXISTS sessions_uid_idx         ON sessions(uid);

PRAGMA user_version = 1;
";
