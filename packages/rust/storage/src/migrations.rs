//! SQL migration definitions for the company store.
//!
//! Migrations are applied in order on database open. Each migration records
//! its own version in `schema_migrations`.

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
            description: "Initial schema: companies, company_aliases, job_company_links",
            sql: r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_migrations (
    version   INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- One row per company. Resolved companies are keyed by canonical domain,
-- unresolved ones by 'unresolved:<normalized name>'.
CREATE TABLE IF NOT EXISTS companies (
    record_key        TEXT PRIMARY KEY,
    id                TEXT NOT NULL,
    name              TEXT NOT NULL,
    normalized_name   TEXT NOT NULL,
    domain            TEXT UNIQUE,
    website           TEXT,
    title             TEXT,
    description       TEXT,
    logo_url          TEXT,
    logo_path         TEXT,
    industry          TEXT NOT NULL,
    last_updated      TEXT NOT NULL,
    status            TEXT NOT NULL,
    source            TEXT NOT NULL,
    interactive_ready INTEGER NOT NULL DEFAULT 0,
    created_at        TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_companies_normalized_name ON companies(normalized_name);

-- Every name that ever resolved to a domain
CREATE TABLE IF NOT EXISTS company_aliases (
    alias      TEXT PRIMARY KEY,
    domain     TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_company_aliases_domain ON company_aliases(domain);

-- Job posting <-> company join table
CREATE TABLE IF NOT EXISTS job_company_links (
    job_id          TEXT NOT NULL,
    company_domain  TEXT NOT NULL,
    job_title       TEXT,
    job_description TEXT,
    link_source     TEXT NOT NULL,
    created_at      TEXT NOT NULL,
    PRIMARY KEY (job_id, company_domain)
);

CREATE INDEX IF NOT EXISTS idx_job_company_links_domain ON job_company_links(company_domain);

INSERT INTO schema_migrations (version) VALUES (1);
"#,
        },
    ]
}
