//! SQL schema definitions.

/// Complete schema for the v1 database.
pub const SCHEMA_V1: &str = r#"
-- ============================================================
-- Drops
-- ============================================================

CREATE TABLE IF NOT EXISTS drops (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    url_hash TEXT NOT NULL UNIQUE CHECK (length(url_hash) = 32),
    ciphertext TEXT NOT NULL,
    created_at INTEGER NOT NULL,
    expires_at INTEGER NOT NULL CHECK (expires_at > created_at),
    accessed INTEGER NOT NULL DEFAULT 0,
    access_count INTEGER NOT NULL DEFAULT 0 CHECK (access_count >= 0),
    decrypted_at INTEGER,
    access_ip TEXT,
    access_city TEXT,
    access_country TEXT
);

CREATE INDEX IF NOT EXISTS idx_drops_expires ON drops(expires_at);

-- ============================================================
-- Invariants
-- ============================================================

CREATE TRIGGER IF NOT EXISTS drops_redaction_irreversible
BEFORE UPDATE OF ciphertext ON drops
WHEN OLD.ciphertext = '' AND NEW.ciphertext <> ''
BEGIN
    SELECT RAISE(ABORT, 'redacted ciphertext cannot be repopulated');
END;

CREATE TRIGGER IF NOT EXISTS drops_identity_immutable
BEFORE UPDATE ON drops
WHEN NEW.id IS NOT OLD.id
  OR NEW.url_hash IS NOT OLD.url_hash
  OR NEW.created_at IS NOT OLD.created_at
  OR NEW.expires_at IS NOT OLD.expires_at
BEGIN
    SELECT RAISE(ABORT, 'drop identity and expiry are immutable');
END;

CREATE TRIGGER IF NOT EXISTS drops_access_monotonic
BEFORE UPDATE ON drops
WHEN NEW.access_count < OLD.access_count
  OR (OLD.accessed = 1 AND NEW.accessed = 0)
BEGIN
    SELECT RAISE(ABORT, 'access tracking cannot move backwards');
END;

CREATE TRIGGER IF NOT EXISTS drops_decryption_write_once
BEFORE UPDATE ON drops
WHEN OLD.decrypted_at IS NOT NULL
 AND (NEW.decrypted_at IS NOT OLD.decrypted_at
   OR NEW.access_ip IS NOT OLD.access_ip
   OR NEW.access_city IS NOT OLD.access_city
   OR NEW.access_country IS NOT OLD.access_country)
BEGIN
    SELECT RAISE(ABORT, 'decryption stamp is write-once');
END;
"#;
