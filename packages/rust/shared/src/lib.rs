//! Shared types, error model, and configuration for the enrichment engine.
//!
//! This crate is the foundation depended on by all other crates in the workspace.
//! It provides:
//! - [`CompanyIntelError`]: the unified error type
//! - Domain types ([`CompanyRecord`], [`JobCompanyLink`], status/source enums)
//! - Configuration ([`AppConfig`], [`EnrichConfig`], [`FetchConfig`], config loading)
//! - Canonical-domain and slug helpers

pub mod config;
pub mod domain;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, DefaultsConfig, EnrichConfig, FetchConfig, HttpConfig, IndustryEntry, RobotsConfig,
    SearchConfig, config_dir, config_file_path, default_industries, expand_home, init_config,
    load_config, load_config_from, validate_config,
};
pub use domain::{LEGAL_SUFFIXES, canonical_domain, host_matches, is_legal_suffix, slugify_company};
pub use error::{CompanyIntelError, Result};
pub use types::{
    CompanyRecord, CompanyStatus, JobCompanyLink, RecordSource, normalize_name, unresolved_key,
};
