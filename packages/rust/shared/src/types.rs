//! Core domain types: company records and job/company links.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// CompanyStatus / RecordSource
// ---------------------------------------------------------------------------

/// Whether a company's official site could be resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompanyStatus {
    Active,
    Unresolved,
}

impl CompanyStatus {
    /// Storage representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Unresolved => "unresolved",
        }
    }
}

impl std::str::FromStr for CompanyStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "unresolved" => Ok(Self::Unresolved),
            other => Err(format!("unknown company status: {other}")),
        }
    }
}

/// Where a record's data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordSource {
    WebEnrichment,
    Placeholder,
}

impl RecordSource {
    /// Storage representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WebEnrichment => "web_enrichment",
            Self::Placeholder => "placeholder",
        }
    }
}

impl std::str::FromStr for RecordSource {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "web_enrichment" => Ok(Self::WebEnrichment),
            "placeholder" => Ok(Self::Placeholder),
            other => Err(format!("unknown record source: {other}")),
        }
    }
}

// ---------------------------------------------------------------------------
// CompanyRecord
// ---------------------------------------------------------------------------

/// One enriched company, as persisted and exported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyRecord {
    /// Company name as supplied by the caller.
    pub name: String,
    /// Canonical domain (lower-cased host, `www.` stripped). `None` when unresolved.
    pub domain: Option<String>,
    /// Resolved website URL.
    pub website: Option<String>,
    /// Page title of the website.
    pub title: Option<String>,
    /// Meta/OG/Twitter description.
    pub description: Option<String>,
    /// Absolute URL of the selected logo.
    pub logo_url: Option<String>,
    /// Local path of the downloaded logo asset.
    pub logo_path: Option<String>,
    /// Inferred industry label.
    pub industry: String,
    /// When this record was last (re-)enriched.
    pub last_updated: DateTime<Utc>,
    pub status: CompanyStatus,
    pub source: RecordSource,
    /// Title and a local logo are both present.
    pub interactive_ready: bool,
}

impl CompanyRecord {
    /// A structurally complete record for a company whose site did not resolve.
    pub fn placeholder(name: &str, industry: &str, now: DateTime<Utc>) -> Self {
        Self {
            name: name.trim().to_string(),
            domain: None,
            website: None,
            title: None,
            description: None,
            logo_url: None,
            logo_path: None,
            industry: industry.to_string(),
            last_updated: now,
            status: CompanyStatus::Unresolved,
            source: RecordSource::Placeholder,
            interactive_ready: false,
        }
    }

    /// Storage key: the canonical domain, or a name-scoped key for placeholders.
    pub fn record_key(&self) -> String {
        match &self.domain {
            Some(domain) => domain.clone(),
            None => unresolved_key(&self.name),
        }
    }

    /// Whether the record may be served from cache at `now`.
    ///
    /// Unresolved records are never fresh.
    pub fn is_fresh(&self, now: DateTime<Utc>, window: chrono::Duration) -> bool {
        self.status == CompanyStatus::Active && now - self.last_updated < window
    }
}

/// Storage key used for an unresolved company name.
pub fn unresolved_key(name: &str) -> String {
    format!("unresolved:{}", normalize_name(name))
}

/// Lookup form of a company name: trimmed, inner whitespace collapsed, lower-cased.
pub fn normalize_name(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

// ---------------------------------------------------------------------------
// JobCompanyLink
// ---------------------------------------------------------------------------

/// Many-to-many link between an external job posting and a company domain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobCompanyLink {
    pub job_id: String,
    pub company_domain: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_description: Option<String>,
    /// Who created the link (e.g. `manual`, `import`).
    pub link_source: String,
    pub created_at: DateTime<Utc>,
}
