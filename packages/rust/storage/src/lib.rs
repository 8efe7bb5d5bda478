//! libSQL storage layer for company records.
//!
//! The [`Storage`] struct wraps an embedded libSQL database holding:
//! - `companies`: one row per company, keyed by canonical domain (or an
//!   `unresolved:` key for placeholders)
//! - `company_aliases`: every name spelling that resolved to a domain
//! - `job_company_links`: the job posting ↔ company join table
//!
//! **Access rules:**
//! - Enrichment runs: read-write via [`Storage::open`]; writes are serialized
//!   by a store-wide lock and each upsert is one transaction
//! - Reporting/consumers: read-only via [`Storage::open_readonly`]

mod migrations;

use std::path::Path;

use chrono::{DateTime, Utc};
use companyintel_shared::{
    CompanyIntelError, CompanyRecord, CompanyStatus, JobCompanyLink, RecordSource, Result,
    normalize_name, unresolved_key,
};
use libsql::{Connection, Database, params};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};
use uuid::Uuid;

/// Columns selected for a [`CompanyRecord`], in [`row_to_record`] order.
const RECORD_COLUMNS: &str = "name, domain, website, title, description, logo_url, logo_path, \
                              industry, last_updated, status, source, interactive_ready";

/// Same columns, qualified with the `c` alias.
const RECORD_COLUMNS_C: &str = "c.name, c.domain, c.website, c.title, c.description, c.logo_url, \
                                c.logo_path, c.industry, c.last_updated, c.status, c.source, \
                                c.interactive_ready";

const LINK_COLUMNS: &str =
    "job_id, company_domain, job_title, job_description, link_source, created_at";

fn storage_err(e: impl std::fmt::Display) -> CompanyIntelError {
    CompanyIntelError::Storage(e.to_string())
}

/// Primary storage handle wrapping a libSQL database.
pub struct Storage {
    #[allow(dead_code)]
    db: Database,
    conn: Connection,
    readonly: bool,
    write_lock: Mutex<()>,
}

impl Storage {
    /// Open or create a database at `path` in read-write mode.
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| CompanyIntelError::io(parent, e))?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(storage_err)?;
        let conn = db.connect().map_err(storage_err)?;

        let storage = Self {
            db,
            conn,
            readonly: false,
            write_lock: Mutex::new(()),
        };
        storage.run_migrations().await?;
        Ok(storage)
    }

    /// Open an existing database at `path` in read-only mode.
    pub async fn open_readonly(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(CompanyIntelError::Storage(format!(
                "database not found: {}",
                path.display()
            )));
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(storage_err)?;
        let conn = db.connect().map_err(storage_err)?;

        Ok(Self {
            db,
            conn,
            readonly: true,
            write_lock: Mutex::new(()),
        })
    }

    /// Run pending schema migrations.
    async fn run_migrations(&self) -> Result<()> {
        let current_version = self.get_schema_version().await;

        for migration in migrations::all_migrations() {
            if migration.version > current_version {
                info!(
                    version = migration.version,
                    description = migration.description,
                    "applying migration"
                );
                self.conn.execute_batch(migration.sql).await.map_err(|e| {
                    CompanyIntelError::Storage(format!(
                        "migration v{} failed: {e}",
                        migration.version
                    ))
                })?;
            }
        }
        Ok(())
    }

    /// Current schema version, or 0 if no migrations have been applied.
    async fn get_schema_version(&self) -> u32 {
        let result = self
            .conn
            .query("SELECT MAX(version) FROM schema_migrations", params![])
            .await;

        match result {
            Ok(mut rows) => {
                if let Ok(Some(row)) = rows.next().await {
                    row.get::<u32>(0).unwrap_or(0)
                } else {
                    0
                }
            }
            Err(_) => 0, // Table doesn't exist yet
        }
    }

    fn check_writable(&self) -> Result<()> {
        if self.readonly {
            return Err(CompanyIntelError::Storage(
                "database is opened in read-only mode".into(),
            ));
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Freshness lookups
    // -----------------------------------------------------------------------

    /// The record for `name` if it is active and younger than `window` at `now`.
    ///
    /// `name` matches case-insensitively through the alias table, so any
    /// spelling that ever resolved to a domain finds that domain's record.
    pub async fn get_fresh(
        &self,
        name: &str,
        window: chrono::Duration,
        now: DateTime<Utc>,
    ) -> Result<Option<CompanyRecord>> {
        let record = self.find_by_alias(name).await?;
        Ok(record.filter(|r| r.is_fresh(now, window)))
    }

    /// The record for `domain` if it is active and younger than `window` at `now`.
    pub async fn get_fresh_by_domain(
        &self,
        domain: &str,
        window: chrono::Duration,
        now: DateTime<Utc>,
    ) -> Result<Option<CompanyRecord>> {
        let record = self.get(domain).await?;
        Ok(record.filter(|r| r.is_fresh(now, window)))
    }

    /// Record keyed by canonical `domain`, fresh or not.
    pub async fn get(&self, domain: &str) -> Result<Option<CompanyRecord>> {
        let sql = format!("SELECT {RECORD_COLUMNS} FROM companies WHERE domain = ?1");
        let mut rows = self
            .conn
            .query(&sql, params![domain.trim().to_lowercase()])
            .await
            .map_err(storage_err)?;

        match rows.next().await.map_err(storage_err)? {
            Some(row) => Ok(Some(row_to_record(&row)?)),
            None => Ok(None),
        }
    }

    /// Latest record for a name: the aliased domain's record, else its placeholder.
    pub async fn find_by_name(&self, name: &str) -> Result<Option<CompanyRecord>> {
        if let Some(record) = self.find_by_alias(name).await? {
            return Ok(Some(record));
        }

        let sql = format!("SELECT {RECORD_COLUMNS} FROM companies WHERE record_key = ?1");
        let mut rows = self
            .conn
            .query(&sql, params![unresolved_key(name)])
            .await
            .map_err(storage_err)?;

        match rows.next().await.map_err(storage_err)? {
            Some(row) => Ok(Some(row_to_record(&row)?)),
            None => Ok(None),
        }
    }

    async fn find_by_alias(&self, name: &str) -> Result<Option<CompanyRecord>> {
        let sql = format!(
            "SELECT {RECORD_COLUMNS_C} FROM companies c
             JOIN company_aliases a ON a.domain = c.domain
             WHERE a.alias = ?1"
        );
        let mut rows = self
            .conn
            .query(&sql, params![normalize_name(name)])
            .await
            .map_err(storage_err)?;

        match rows.next().await.map_err(storage_err)? {
            Some(row) => Ok(Some(row_to_record(&row)?)),
            None => Ok(None),
        }
    }

    // -----------------------------------------------------------------------
    // Writes
    // -----------------------------------------------------------------------

    /// Register `name` as another spelling of `domain`.
    pub async fn add_alias(&self, name: &str, domain: &str) -> Result<()> {
        self.check_writable()?;
        let _guard = self.write_lock.lock().await;
        self.conn
            .execute(
                "INSERT INTO company_aliases (alias, domain, created_at)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(alias) DO UPDATE SET domain = excluded.domain",
                params![
                    normalize_name(name),
                    domain.trim().to_lowercase(),
                    Utc::now().to_rfc3339()
                ],
            )
            .await
            .map_err(storage_err)?;
        Ok(())
    }

    /// Insert or update a record by its key.
    ///
    /// For a resolved record this also registers the name as an alias of the
    /// domain and removes that name's placeholder row, all in one transaction.
    #[instrument(skip_all, fields(key = %record.record_key()))]
    pub async fn upsert(&self, record: &CompanyRecord) -> Result<()> {
        self.check_writable()?;
        let _guard = self.write_lock.lock().await;

        let now = Utc::now().to_rfc3339();
        let normalized = normalize_name(&record.name);
        let tx = self.conn.transaction().await.map_err(storage_err)?;

        tx.execute(
            "INSERT INTO companies (record_key, id, name, normalized_name, domain, website,
                title, description, logo_url, logo_path, industry, last_updated, status,
                source, interactive_ready, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)
             ON CONFLICT(record_key) DO UPDATE SET
               name = excluded.name,
               normalized_name = excluded.normalized_name,
               website = excluded.website,
               title = excluded.title,
               description = excluded.description,
               logo_url = excluded.logo_url,
               logo_path = excluded.logo_path,
               industry = excluded.industry,
               last_updated = excluded.last_updated,
               status = excluded.status,
               source = excluded.source,
               interactive_ready = excluded.interactive_ready",
            params![
                record.record_key(),
                Uuid::now_v7().to_string(),
                record.name.as_str(),
                normalized.as_str(),
                record.domain.as_deref(),
                record.website.as_deref(),
                record.title.as_deref(),
                record.description.as_deref(),
                record.logo_url.as_deref(),
                record.logo_path.as_deref(),
                record.industry.as_str(),
                record.last_updated.to_rfc3339(),
                record.status.as_str(),
                record.source.as_str(),
                i64::from(record.interactive_ready),
                now.as_str(),
            ],
        )
        .await
        .map_err(storage_err)?;

        if let Some(domain) = record.domain.as_deref() {
            tx.execute(
                "INSERT INTO company_aliases (alias, domain, created_at)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(alias) DO UPDATE SET domain = excluded.domain",
                params![normalized.as_str(), domain, now.as_str()],
            )
            .await
            .map_err(storage_err)?;

            tx.execute(
                "DELETE FROM companies WHERE record_key = ?1",
                params![unresolved_key(&record.name)],
            )
            .await
            .map_err(storage_err)?;
        }

        tx.commit().await.map_err(storage_err)?;
        debug!(status = record.status.as_str(), "record upserted");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Listing and export
    // -----------------------------------------------------------------------

    /// Every record, ordered by name.
    pub async fn list_all(&self) -> Result<Vec<CompanyRecord>> {
        let sql =
            format!("SELECT {RECORD_COLUMNS} FROM companies ORDER BY normalized_name, record_key");
        let mut rows = self.conn.query(&sql, params![]).await.map_err(storage_err)?;

        let mut records = Vec::new();
        while let Some(row) = rows.next().await.map_err(storage_err)? {
            records.push(row_to_record(&row)?);
        }
        Ok(records)
    }

    pub async fn count(&self) -> Result<u64> {
        let mut rows = self
            .conn
            .query("SELECT COUNT(*) FROM companies", params![])
            .await
            .map_err(storage_err)?;
        match rows.next().await.map_err(storage_err)? {
            Some(row) => Ok(row.get::<i64>(0).map_err(storage_err)?.max(0) as u64),
            None => Ok(0),
        }
    }

    /// Rewrite the JSON mirror at `path` with every current record.
    ///
    /// The file is written to a sibling temp file and renamed into place.
    /// Returns the number of records written.
    #[instrument(skip_all, fields(path = %path.display()))]
    pub async fn export_all(&self, path: &Path) -> Result<usize> {
        let records = self.list_all().await?;
        let json = serde_json::to_string_pretty(&records)
            .map_err(|e| CompanyIntelError::parse(format!("failed to serialize export: {e}")))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| CompanyIntelError::io(parent, e))?;
        }

        let tmp = path.with_extension(format!("json.tmp-{}", Uuid::now_v7()));
        std::fs::write(&tmp, json).map_err(|e| CompanyIntelError::io(&tmp, e))?;
        std::fs::rename(&tmp, path).map_err(|e| {
            let _ = std::fs::remove_file(&tmp);
            CompanyIntelError::io(path, e)
        })?;

        info!(records = records.len(), "export written");
        Ok(records.len())
    }

    // -----------------------------------------------------------------------
    // Job ↔ company links
    // -----------------------------------------------------------------------

    /// Insert or update a link, keyed by `(job_id, company_domain)`.
    ///
    /// `created_at` of an existing link is preserved.
    pub async fn link(&self, link: &JobCompanyLink) -> Result<()> {
        self.check_writable()?;
        let job_id = link.job_id.trim();
        let domain = link.company_domain.trim().to_lowercase();
        if job_id.is_empty() || domain.is_empty() {
            return Err(CompanyIntelError::validation(
                "job_id and company_domain must be non-empty",
            ));
        }

        let _guard = self.write_lock.lock().await;
        self.conn
            .execute(
                "INSERT INTO job_company_links
                   (job_id, company_domain, job_title, job_description, link_source, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(job_id, company_domain) DO UPDATE SET
                   job_title = excluded.job_title,
                   job_description = excluded.job_description,
                   link_source = excluded.link_source",
                params![
                    job_id,
                    domain.as_str(),
                    link.job_title.as_deref(),
                    link.job_description.as_deref(),
                    link.link_source.as_str(),
                    link.created_at.to_rfc3339(),
                ],
            )
            .await
            .map_err(storage_err)?;
        Ok(())
    }

    /// Links for every job attached to `domain`.
    pub async fn jobs_for(&self, domain: &str) -> Result<Vec<JobCompanyLink>> {
        let sql = format!(
            "SELECT {LINK_COLUMNS} FROM job_company_links
             WHERE company_domain = ?1 ORDER BY created_at, job_id"
        );
        self.query_links(&sql, domain.trim().to_lowercase()).await
    }

    /// Links for every company attached to `job_id`.
    pub async fn companies_for(&self, job_id: &str) -> Result<Vec<JobCompanyLink>> {
        let sql = format!(
            "SELECT {LINK_COLUMNS} FROM job_company_links
             WHERE job_id = ?1 ORDER BY created_at, company_domain"
        );
        self.query_links(&sql, job_id.trim().to_string()).await
    }

    async fn query_links(&self, sql: &str, key: String) -> Result<Vec<JobCompanyLink>> {
        let mut rows = self
            .conn
            .query(sql, params![key])
            .await
            .map_err(storage_err)?;

        let mut links = Vec::new();
        while let Some(row) = rows.next().await.map_err(storage_err)? {
            links.push(row_to_link(&row)?);
        }
        Ok(links)
    }
}

// ---------------------------------------------------------------------------
// Row mapping
// ---------------------------------------------------------------------------

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    chrono::DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| CompanyIntelError::Storage(format!("invalid date: {e}")))
}

/// Convert a database row (in [`RECORD_COLUMNS`] order) to a [`CompanyRecord`].
fn row_to_record(row: &libsql::Row) -> Result<CompanyRecord> {
    let status: String = row.get(9).map_err(storage_err)?;
    let source: String = row.get(10).map_err(storage_err)?;
    let last_updated: String = row.get(8).map_err(storage_err)?;

    Ok(CompanyRecord {
        name: row.get::<String>(0).map_err(storage_err)?,
        domain: row.get::<String>(1).ok(),
        website: row.get::<String>(2).ok(),
        title: row.get::<String>(3).ok(),
        description: row.get::<String>(4).ok(),
        logo_url: row.get::<String>(5).ok(),
        logo_path: row.get::<String>(6).ok(),
        industry: row.get::<String>(7).map_err(storage_err)?,
        last_updated: parse_timestamp(&last_updated)?,
        status: status.parse::<CompanyStatus>().map_err(CompanyIntelError::Storage)?,
        source: source.parse::<RecordSource>().map_err(CompanyIntelError::Storage)?,
        interactive_ready: row.get::<i64>(11).map_err(storage_err)? != 0,
    })
}

/// Convert a database row (in [`LINK_COLUMNS`] order) to a [`JobCompanyLink`].
fn row_to_link(row: &libsql::Row) -> Result<JobCompanyLink> {
    let created_at: String = row.get(5).map_err(storage_err)?;
    Ok(JobCompanyLink {
        job_id: row.get::<String>(0).map_err(storage_err)?,
        company_domain: row.get::<String>(1).map_err(storage_err)?,
        job_title: row.get::<String>(2).ok(),
        job_description: row.get::<String>(3).ok(),
        link_source: row.get::<String>(4).map_err(storage_err)?,
        created_at: parse_timestamp(&created_at)?,
    })
}
