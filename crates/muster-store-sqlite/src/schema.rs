//! SQL schema for the Muster SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE ... IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS roles (
    role_id    INTEGER PRIMARY KEY AUTOINCREMENT,
    name       TEXT    NOT NULL UNIQUE,
    is_unique  INTEGER NOT NULL DEFAULT 0,
    is_staff   INTEGER NOT NULL DEFAULT 0,
    role_type  TEXT    NOT NULL,   -- RoleType::as_str()
    rank       INTEGER NOT NULL DEFAULT 0 CHECK (rank >= 0)
);

CREATE TABLE IF NOT EXISTS identities (
    identity_id    INTEGER PRIMARY KEY AUTOINCREMENT,
    public_id      TEXT    NOT NULL UNIQUE,
    username       TEXT    NOT NULL UNIQUE,
    email          TEXT    NOT NULL UNIQUE COLLATE NOCASE,
    password_hash  TEXT    NOT NULL,
    first_name     TEXT    NOT NULL,
    last_name      TEXT    NOT NULL,
    -- Referenced roles cannot be deleted.
    role_id        INTEGER REFERENCES roles(role_id) ON DELETE RESTRICT,
    approved       INTEGER NOT NULL DEFAULT 0,
    active         INTEGER NOT NULL DEFAULT 1,
    is_staff       INTEGER NOT NULL DEFAULT 0,
    is_superuser   INTEGER NOT NULL DEFAULT 0,
    email_verified INTEGER NOT NULL DEFAULT 0,
    date_joined    TEXT    NOT NULL    -- RFC 3339 UTC
);

-- Only hashes of session tokens are stored.
CREATE TABLE IF NOT EXISTS sessions (
    token_hash  TEXT    PRIMARY KEY,
    identity_id INTEGER NOT NULL REFERENCES identities(identity_id) ON DELETE CASCADE,
    created_at  TEXT    NOT NULL,
    expires_at  TEXT    NOT NULL
);

CREATE TABLE IF NOT EXISTS email_verifications (
    token_hash  TEXT    PRIMARY KEY,
    identity_id INTEGER NOT NULL REFERENCES identities(identity_id) ON DELETE CASCADE,
    created_at  TEXT    NOT NULL
);

CREATE INDEX IF NOT EXISTS identities_role_idx     ON identities(role_id);
CREATE INDEX IF NOT EXISTS identities_approved_idx ON identities(approved);
CREATE INDEX IF NOT EXISTS sessions_expiry_idx     ON sessions(expires_at);

PRAGMA user_version = 1;
";
