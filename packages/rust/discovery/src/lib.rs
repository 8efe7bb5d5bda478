//! Official-site resolution through a static-HTML web search surface.
//!
//! One query per company (`"<name> official site"`); the first organic result
//! whose host is neither the search engine itself nor on the disallow-list
//! (social, video, encyclopedia and review platforms) is taken as the
//! company's canonical website.

mod results;

use companyintel_fetch::HttpClient;
use companyintel_shared::{CompanyIntelError, EnrichConfig, Result, host_matches};
use tracing::{debug, info, instrument, warn};
use url::Url;

pub use results::{parse_result_links, unwrap_redirect};

/// Suffix appended to the company name in the search query.
const QUERY_SUFFIX: &str = "official site";

// ---------------------------------------------------------------------------
// SearchResolver
// ---------------------------------------------------------------------------

/// Resolves a company name to its official website.
#[derive(Debug, Clone)]
pub struct SearchResolver {
    endpoint: Url,
    disallowed_hosts: Vec<String>,
}

impl SearchResolver {
    pub fn new(endpoint: &str, disallowed_hosts: Vec<String>) -> Result<Self> {
        let endpoint = Url::parse(endpoint).map_err(|e| {
            CompanyIntelError::config(format!("invalid search endpoint '{endpoint}': {e}"))
        })?;
        if endpoint.host_str().is_none() {
            return Err(CompanyIntelError::config(format!(
                "search endpoint has no host: {endpoint}"
            )));
        }
        Ok(Self {
            endpoint,
            disallowed_hosts,
        })
    }

    pub fn from_config(config: &EnrichConfig) -> Result<Self> {
        Self::new(&config.search_endpoint, config.disallowed_hosts.clone())
    }

    /// The query URL for `name`.
    pub fn query_url(&self, name: &str) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("q", &format!("{} {QUERY_SUFFIX}", name.trim()));
        url
    }

    /// First acceptable result link for `name`, or `None`.
    ///
    /// Never fails: HTTP errors, robots denials and empty pages all yield `None`.
    #[instrument(skip_all, fields(company = %name))]
    pub async fn resolve_official_site(&self, client: &HttpClient, name: &str) -> Option<Url> {
        let query = self.query_url(name);
        let Some(page) = client.fetch(&query).await else {
            warn!("search request failed");
            return None;
        };

        let links = parse_result_links(&page.body, &page.url);
        debug!(candidates = links.len(), "search results parsed");

        let site = links.into_iter().find(|link| self.is_acceptable(link));
        match &site {
            Some(url) => info!(site = %url, "official site resolved"),
            None => info!("no acceptable search result"),
        }
        site
    }

    /// Whether a result link may be taken as an official site.
    pub fn is_acceptable(&self, link: &Url) -> bool {
        let Some(host) = link.host_str() else {
            return false;
        };
        if let Some(search_host) = self.endpoint.host_str() {
            // html.duckduckgo.com also owns links to duckduckgo.com.
            if host_matches(host, search_host) || host_matches(search_host, host) {
                return false;
            }
        }
        !self
            .disallowed_hosts
            .iter()
            .any(|blocked| host_matches(host, blocked))
    }
}
