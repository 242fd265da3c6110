//! SQL schema for the Vitrine SQLite backend.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- Auth-level principals. Password hashes are argon2 PHC strings.
CREATE TABLE IF NOT EXISTS accounts (
    user_id       TEXT PRIMARY KEY,
    email         TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,
    created_at    TEXT NOT NULL
);

-- Bearer tokens are never stored raw; only their SHA-256 hex digest.
CREATE TABLE IF NOT EXISTS sessions (
    token_hash TEXT PRIMARY KEY,
    user_id    TEXT NOT NULL REFERENCES accounts(user_id) ON DELETE CASCADE,
    created_at TEXT NOT NULL,
    expires_at TEXT NOT NULL
);

-- One profile per account; cascades away with the account.
CREATE TABLE IF NOT EXISTS profiles (
    user_id    TEXT PRIMARY KEY REFERENCES accounts(user_id) ON DELETE CASCADE,
    name       TEXT NOT NULL,
    email      TEXT NOT NULL,
    role       TEXT NOT NULL,   -- 'admin' | 'curator' | 'researcher' | 'viewer'
    department TEXT,
    is_active  INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL,
    last_login TEXT
);

CREATE TABLE IF NOT EXISTS artifacts (
    id                 TEXT PRIMARY KEY,
    accession_number   TEXT NOT NULL,
    title              TEXT NOT NULL,
    description        TEXT NOT NULL,
    category           TEXT NOT NULL,
    period             TEXT NOT NULL,
    culture            TEXT NOT NULL,
    material           TEXT NOT NULL,
    dimensions         TEXT NOT NULL,   -- JSON {height_cm, width_cm, depth_cm, weight_kg}
    condition          TEXT NOT NULL,
    location           TEXT NOT NULL,   -- 'vitrine' | 'warehouse'
    image_url          TEXT,
    vitrine_image_url  TEXT,
    provenance         TEXT NOT NULL,
    acquisition_date   TEXT NOT NULL,   -- ISO 8601 date
    acquisition_method TEXT NOT NULL,
    estimated_value    REAL,
    exhibition_history TEXT NOT NULL DEFAULT '[]',
    conservation_notes TEXT NOT NULL DEFAULT '',
    tags               TEXT NOT NULL DEFAULT '[]',
    created_at         TEXT NOT NULL,
    updated_at         TEXT NOT NULL,
    created_by         TEXT NOT NULL,
    last_edited_by     TEXT NOT NULL
);

-- Audit rows are strictly append-only and outlive their artifact,
-- so artifact_id carries no foreign key.
CREATE TABLE IF NOT EXISTS artifact_history (
    id          TEXT PRIMARY KEY,
    artifact_id TEXT NOT NULL,
    action      TEXT NOT NULL,   -- 'created' | 'updated' | 'deleted'
    changes     TEXT NOT NULL,   -- JSON map: field -> {old, new}
    edited_by   TEXT NOT NULL,
    edited_at   TEXT NOT NULL,
    notes       TEXT
);

-- Reports die with their artifact; only the audit trail outlives it.
CREATE TABLE IF NOT EXISTS reports (
    id              TEXT PRIMARY KEY,
    artifact_id     TEXT NOT NULL REFERENCES artifacts(id) ON DELETE CASCADE,
    artifact_title  TEXT NOT NULL,
    report_type     TEXT NOT NULL,
    title           TEXT NOT NULL,
    content         TEXT NOT NULL,
    findings        TEXT,
    recommendations TEXT,
    priority        TEXT NOT NULL,
    status          TEXT NOT NULL DEFAULT 'draft',
    created_by      TEXT NOT NULL,
    created_at      TEXT NOT NULL,
    updated_at      TEXT NOT NULL,
    reviewed_by     TEXT,
    reviewed_at     TEXT
);

CREATE INDEX IF NOT EXISTS sessions_user_idx    ON sessions(user_id);
CREATE INDEX IF NOT EXISTS profiles_created_idx ON profiles(created_at);
CREATE INDEX IF NOT EXISTS artifacts_created_idx ON artifacts(created_at);
CREATE INDEX IF NOT EXISTS history_artifact_idx ON artifact_history(artifact_id);
CREATE INDEX IF NOT EXISTS reports_artifact_idx ON reports(artifact_id);

PRAGMA user_version = 1;
";
