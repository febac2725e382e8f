//! SQL migration definitions for the LeadScout record database.
//!
//! Migrations are applied in order on database open. Each migration has a
//! version number and a batch of SQL statements.

/// A database migration with a version and SQL statements.
pub(crate) struct Migration {
    pub version: u32,
    pub description: &'static str,
    pub sql: &'static str,
}

/// All migrations, in ascending version order.
pub(crate) fn all_migrations() -> Vec<Migration> {
    vec![
        Migration {
            version: 1,
            description: "Initial schema: contractors",
            sql: r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_migrations (
    version    INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- One row per registry business
CREATE TABLE IF NOT EXISTS contractors (
    id                        INTEGER PRIMARY KEY AUTOINCREMENT,
    business_name             TEXT NOT NULL,
    license_number            TEXT,
    phone                     TEXT,
    address                   TEXT,
    principal_name            TEXT,
    city                      TEXT,
    state                     TEXT,

    website_url               TEXT,
    website_status            TEXT NOT NULL DEFAULT 'unattempted',
    website_confidence        REAL,
    classification_confidence REAL,
    confidence_score          REAL,
    mailer_category           TEXT,
    residential_focus         INTEGER,

    processing_status         TEXT NOT NULL DEFAULT 'pending',
    review_status             TEXT,
    error_message             TEXT,
    processing_attempts       INTEGER NOT NULL DEFAULT 0,
    last_processed            TEXT,
    provenance_json           TEXT,

    created_at                TEXT NOT NULL,
    updated_at                TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_contractors_processing ON contractors(processing_status);
CREATE INDEX IF NOT EXISTS idx_contractors_review ON contractors(review_status);

INSERT INTO schema_migrations (version) VALUES (1);
"#,
        },
        Migration {
            version: 2,
            description: "Crawled content hash for change detection",
            sql: r#"
ALTER TABLE contractors ADD COLUMN website_content_hash TEXT;

INSERT INTO schema_migrations (version) VALUES (2);
"#,
        },
    ]
}
