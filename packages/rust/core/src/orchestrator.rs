//! Single-company enrichment.
//!
//! One company moves through a fixed sequence of states:
//!
//! ```text
//! not_started → cache_check ─fresh─────────────────────────────→ done
//!                    └─stale/missing→ resolving ─no site──→ persisting → done
//!                                        └─site→ fetching ─failed→ persisting → done
//!                                                   └─ok→ extracting → classifying → persisting → done
//! ```
//!
//! Network and content failures never surface as errors: they end in a
//! placeholder record. Only storage failures (and a blank name) are returned
//! as `Err`.

use std::fmt;

use companyintel_extract::extract_signals;
use companyintel_shared::{
    CompanyIntelError, CompanyRecord, CompanyStatus, RecordSource, Result, canonical_domain,
};
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::assets::download_logo;
use crate::context::EnrichContext;

/// Characters of visible body text handed to the classifier.
const LEADING_TEXT_CHARS: usize = 2000;

/// Enrichment state of one company.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnrichState {
    NotStarted,
    CacheCheck,
    Resolving,
    Fetching,
    Extracting,
    Classifying,
    Persisting,
    Done,
}

impl EnrichState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotStarted => "not_started",
            Self::CacheCheck => "cache_check",
            Self::Resolving => "resolving",
            Self::Fetching => "fetching",
            Self::Extracting => "extracting",
            Self::Classifying => "classifying",
            Self::Persisting => "persisting",
            Self::Done => "done",
        }
    }
}

impl fmt::Display for EnrichState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tracks the current state and logs each transition.
struct StateTracker(EnrichState);

impl StateTracker {
    fn advance(&mut self, next: EnrichState) {
        debug!(from = %self.0, to = %next, "state transition");
        self.0 = next;
    }
}

/// A finished enrichment.
#[derive(Debug, Clone)]
pub struct Enrichment {
    pub record: CompanyRecord,
    /// The record came from the store without fetching the site.
    pub cached: bool,
    /// At least one network request was made.
    pub network: bool,
}

/// Enrich one company by name.
pub async fn enrich(ctx: &EnrichContext, name: &str) -> Result<CompanyRecord> {
    Ok(enrich_detailed(ctx, name, None).await?.record)
}

/// Enrich one company whose website is already known; search is skipped.
pub async fn enrich_with_hint(ctx: &EnrichContext, name: &str, site: &Url) -> Result<CompanyRecord> {
    Ok(enrich_detailed(ctx, name, Some(site)).await?.record)
}

/// Enrich one company, reporting whether the cache or the network was used.
#[instrument(skip_all, fields(company = %name.trim()))]
pub async fn enrich_detailed(
    ctx: &EnrichContext,
    name: &str,
    hint: Option<&Url>,
) -> Result<Enrichment> {
    let name = name.trim();
    if name.is_empty() {
        return Err(CompanyIntelError::validation("company name is blank"));
    }

    let clock = ctx.clock();
    let window = ctx.config.freshness_window();
    let mut state = StateTracker(EnrichState::NotStarted);

    state.advance(EnrichState::CacheCheck);
    if let Some(record) = ctx.store.get_fresh(name, window, clock.now()).await? {
        state.advance(EnrichState::Done);
        info!(domain = ?record.domain, "served from cache");
        return Ok(Enrichment {
            record,
            cached: true,
            network: false,
        });
    }

    state.advance(EnrichState::Resolving);
    let site = match hint {
        Some(url) => Some(url.clone()),
        None => ctx.resolver.resolve_official_site(&ctx.client, name).await,
    };
    let Some((site, domain)) = site.and_then(|s| canonical_domain(&s).map(|d| (s, d))) else {
        return persist_placeholder(ctx, name, &mut state, "no official site").await;
    };

    let guard = ctx.locks.acquire(&domain).await;

    // Another request may have enriched this domain while we waited.
    if let Some(record) = ctx
        .store
        .get_fresh_by_domain(&domain, window, clock.now())
        .await?
    {
        ctx.store.add_alias(name, &domain).await?;
        ctx.locks.release(guard);
        state.advance(EnrichState::Done);
        info!(%domain, "domain already fresh");
        return Ok(Enrichment {
            record,
            cached: true,
            network: true,
        });
    }

    state.advance(EnrichState::Fetching);
    let Some(doc) = ctx.client.fetch(&site).await else {
        ctx.locks.release(guard);
        return persist_placeholder(ctx, name, &mut state, "homepage fetch failed").await;
    };

    state.advance(EnrichState::Extracting);
    let signals = extract_signals(&doc.body, &doc.url, LEADING_TEXT_CHARS);
    let logo_path = match &signals.logo {
        Some(logo) => download_logo(&ctx.client, logo, name, &ctx.config.assets_dir).await,
        None => None,
    };

    state.advance(EnrichState::Classifying);
    let industry = ctx.classifier.classify(&signals.classifier_text());

    state.advance(EnrichState::Persisting);
    let interactive_ready =
        signals.title.as_deref().is_some_and(|t| !t.is_empty()) && logo_path.is_some();
    let record = CompanyRecord {
        name: name.to_string(),
        domain: Some(domain),
        website: Some(doc.url.to_string()),
        title: signals.title,
        description: signals.description,
        logo_url: signals.logo.map(|l| l.url.to_string()),
        logo_path: logo_path.map(|p| p.to_string_lossy().into_owned()),
        industry,
        last_updated: clock.now(),
        status: CompanyStatus::Active,
        source: RecordSource::WebEnrichment,
        interactive_ready,
    };
    ctx.store.upsert(&record).await?;
    ctx.locks.release(guard);

    state.advance(EnrichState::Done);
    info!(
        domain = ?record.domain,
        industry = %record.industry,
        interactive_ready = record.interactive_ready,
        "company enriched"
    );
    Ok(Enrichment {
        record,
        cached: false,
        network: true,
    })
}

async fn persist_placeholder(
    ctx: &EnrichContext,
    name: &str,
    state: &mut StateTracker,
    reason: &str,
) -> Result<Enrichment> {
    state.advance(EnrichState::Persisting);
    let record =
        CompanyRecord::placeholder(name, &ctx.config.default_industry, ctx.clock().now());
    ctx.store.upsert(&record).await?;

    state.advance(EnrichState::Done);
    warn!(reason, "company unresolved, placeholder stored");
    Ok(Enrichment {
        record,
        cached: false,
        network: true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Fixture, SITE_TITLE};
    use std::time::Duration;
    use wiremock::matchers::path;
    use wiremock::{Mock, ResponseTemplate};

    #[tokio::test]
    async fn enriches_company_from_mock_site() {
        let fx = Fixture::new().await;
        fx.mount_site(1, 1).await;

        let record = enrich(&fx.ctx, "Acme Rockets Ltd").await.unwrap();

        assert_eq!(record.name, "Acme Rockets Ltd");
        assert_eq!(record.domain.as_deref(), Some("acme-rockets.example"));
        assert_eq!(record.title.as_deref(), Some(SITE_TITLE));
        assert_eq!(
            record.description.as_deref(),
            Some("Acme Rockets builds reusable rockets for orbital launch.")
        );
        assert_eq!(
            record.logo_url.as_deref(),
            Some(fx.site_url("/static/apple-touch-icon.png").as_str())
        );
        let logo_path = record.logo_path.clone().expect("logo downloaded");
        assert!(logo_path.ends_with("Acme-Rockets.png"), "{logo_path}");
        assert!(std::path::Path::new(&logo_path).exists());
        assert_eq!(record.industry, "Aerospace");
        assert_eq!(record.status, CompanyStatus::Active);
        assert_eq!(record.source, RecordSource::WebEnrichment);
        assert!(record.interactive_ready);

        let stored = fx.ctx.store.get("acme-rockets.example").await.unwrap();
        assert_eq!(stored, Some(record));
    }

    #[tokio::test]
    async fn second_call_within_window_is_served_from_cache() {
        let fx = Fixture::new().await;
        fx.mount_site(1, 1).await;

        let first = enrich(&fx.ctx, "Acme Rockets Ltd").await.unwrap();
        let sent = fx.ctx.client.requests_sent();

        fx.clock.advance(chrono::Duration::days(29));
        let second = enrich_detailed(&fx.ctx, "Acme Rockets Ltd", None).await.unwrap();

        assert_eq!(fx.ctx.client.requests_sent(), sent);
        assert!(second.cached);
        assert!(!second.network);
        assert_eq!(second.record, first);
    }

    #[tokio::test]
    async fn stale_record_is_re_resolved() {
        let fx = Fixture::new().await;
        fx.mount_site(2, 2).await;

        let first = enrich(&fx.ctx, "Acme Rockets Ltd").await.unwrap();
        let sent = fx.ctx.client.requests_sent();

        fx.clock.advance(chrono::Duration::days(31));
        let second = enrich_detailed(&fx.ctx, "Acme Rockets Ltd", None).await.unwrap();

        assert!(!second.cached);
        assert!(fx.ctx.client.requests_sent() > sent);
        assert!(second.record.last_updated > first.last_updated);
        assert_eq!(fx.ctx.store.list_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn no_search_result_yields_placeholder() {
        let fx = Fixture::new().await;
        fx.mount_empty_search().await;

        let record = enrich(&fx.ctx, "Ghost Widgets Ltd").await.unwrap();

        assert_eq!(record.status, CompanyStatus::Unresolved);
        assert_eq!(record.source, RecordSource::Placeholder);
        assert!(record.domain.is_none());
        assert!(record.website.is_none());
        assert_eq!(record.industry, "Other");
        assert!(!record.interactive_ready);

        let stored = fx.ctx.store.find_by_name("ghost widgets ltd").await.unwrap();
        assert_eq!(stored, Some(record));
    }

    #[tokio::test]
    async fn placeholders_are_always_retried() {
        let fx = Fixture::new().await;
        Mock::given(path("/html/"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<p>No results.</p>"))
            .expect(2)
            .mount(&fx.server)
            .await;

        enrich(&fx.ctx, "Ghost Widgets Ltd").await.unwrap();
        enrich(&fx.ctx, "Ghost Widgets Ltd").await.unwrap();
        assert_eq!(fx.ctx.store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn robots_disallowed_site_is_never_requested() {
        let fx = Fixture::with_robots(Some("User-agent: *\nDisallow: /private\n")).await;
        let target = fx.site_url("/private/");
        fx.mount_search_to(&target, 1).await;
        Mock::given(path("/private/"))
            .respond_with(ResponseTemplate::new(200).set_body_string("secret"))
            .expect(0)
            .mount(&fx.server)
            .await;

        let record = enrich(&fx.ctx, "Acme Rockets Ltd").await.unwrap();
        assert_eq!(record.status, CompanyStatus::Unresolved);
        assert!(record.domain.is_none());
    }

    #[tokio::test]
    async fn hint_skips_search() {
        let fx = Fixture::new().await;
        fx.mount_search(0).await;
        fx.mount_home(1, Duration::ZERO).await;
        fx.mount_logo().await;

        let site = Url::parse(&fx.site_url("/")).unwrap();
        let record = enrich_with_hint(&fx.ctx, "Acme Rockets", &site).await.unwrap();
        assert_eq!(record.domain.as_deref(), Some("acme-rockets.example"));
        assert_eq!(record.status, CompanyStatus::Active);
    }

    #[tokio::test]
    async fn logo_failure_keeps_the_record() {
        let fx = Fixture::new().await;
        fx.mount_search(1).await;
        fx.mount_home(1, Duration::ZERO).await;
        Mock::given(path("/static/apple-touch-icon.png"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&fx.server)
            .await;

        let record = enrich(&fx.ctx, "Acme Rockets Ltd").await.unwrap();
        assert_eq!(record.status, CompanyStatus::Active);
        assert_eq!(record.title.as_deref(), Some(SITE_TITLE));
        assert!(record.logo_url.is_some());
        assert!(record.logo_path.is_none());
        assert!(!record.interactive_ready);
    }

    #[tokio::test]
    async fn new_spelling_reuses_fresh_domain_record() {
        let fx = Fixture::new().await;
        fx.mount_site(2, 1).await;

        enrich(&fx.ctx, "Acme Rockets Ltd").await.unwrap();
        let other = enrich_detailed(&fx.ctx, "Acme Rockets", None).await.unwrap();
        assert!(other.cached);
        assert_eq!(other.record.name, "Acme Rockets Ltd");

        // The new spelling is now an alias: no search on the next call.
        let sent = fx.ctx.client.requests_sent();
        enrich(&fx.ctx, "acme rockets").await.unwrap();
        assert_eq!(fx.ctx.client.requests_sent(), sent);
    }

    #[tokio::test]
    async fn blank_name_is_rejected() {
        let fx = Fixture::new().await;
        let err = enrich(&fx.ctx, "   ").await.unwrap_err();
        assert!(matches!(err, CompanyIntelError::Validation { .. }));
        assert_eq!(fx.ctx.client.requests_sent(), 0);
    }

    #[test]
    fn state_names() {
        assert_eq!(EnrichState::CacheCheck.to_string(), "cache_check");
        assert_eq!(EnrichState::NotStarted.as_str(), "not_started");
    }
}
