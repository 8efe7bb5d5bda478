//! Shared state for enrichment runs.

use std::sync::Arc;

use companyintel_discovery::SearchResolver;
use companyintel_extract::IndustryClassifier;
use companyintel_fetch::{Clock, DomainLocks, HttpClient};
use companyintel_shared::{EnrichConfig, Result};
use companyintel_storage::Storage;
use tracing::info;

/// Everything one enrichment needs: the HTTP client (which owns the robots
/// cache), the per-domain lock map, the record store, and the static
/// resolver/classifier configuration.
///
/// Built once per process (or per test) and shared behind an `Arc` by the
/// concurrent batch driver.
pub struct EnrichContext {
    pub config: EnrichConfig,
    pub client: HttpClient,
    pub store: Storage,
    pub locks: DomainLocks,
    pub resolver: SearchResolver,
    pub classifier: IndustryClassifier,
}

impl EnrichContext {
    /// Assemble a context from an already-built client and store.
    pub fn new(config: EnrichConfig, client: HttpClient, store: Storage) -> Result<Self> {
        let resolver = SearchResolver::from_config(&config)?;
        let classifier = IndustryClassifier::from_config(&config);
        Ok(Self {
            config,
            client,
            store,
            locks: DomainLocks::new(),
            resolver,
            classifier,
        })
    }

    /// Build the HTTP client and open the database named by `config`.
    pub async fn open(config: EnrichConfig) -> Result<Self> {
        let client = HttpClient::new(&config.fetch)?;
        let store = Storage::open(&config.db_path).await?;
        info!(db = %config.db_path.display(), "enrichment context ready");
        Self::new(config, client, store)
    }

    pub fn clock(&self) -> Arc<dyn Clock> {
        self.client.clock()
    }
}
