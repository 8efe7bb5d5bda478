//! Politeness-aware HTTP client.
//!
//! Every request is checked against the host's robots.txt, retried with
//! bounded exponential backoff on 429/5xx and transport errors, and bounded
//! by a per-attempt timeout. Redirects are followed by hand so each hop gets
//! its own robots check. The public `fetch*` methods never fail: they log
//! and return `None` so a single bad host cannot stall a batch.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use reqwest::{Client, Response, header};
use tracing::{debug, instrument, warn};
use url::Url;

use companyintel_shared::{CompanyIntelError, FetchConfig, Result};

use crate::retry::{Clock, RetryPolicy, SystemClock};
use crate::robots::RobotsCache;

/// Maximum number of redirects followed per request.
pub(crate) const MAX_REDIRECTS: usize = 5;

/// A successfully fetched HTML (or text) document.
#[derive(Debug, Clone)]
pub struct FetchedDocument {
    /// Final URL after redirects.
    pub url: Url,
    pub status: u16,
    pub body: String,
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Builder for [`HttpClient`].
pub struct HttpClientBuilder {
    config: FetchConfig,
    policy: Option<RetryPolicy>,
    clock: Arc<dyn Clock>,
    resolve: Vec<(String, SocketAddr)>,
}

impl HttpClientBuilder {
    /// Override the retry policy derived from the config.
    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = Some(policy);
        self
    }

    /// Clock used for backoff sleeps.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Pin `host` to `addr`, bypassing DNS (mock servers behind real-looking hosts).
    pub fn resolve(mut self, host: impl Into<String>, addr: SocketAddr) -> Self {
        self.resolve.push((host.into(), addr));
        self
    }

    pub fn build(self) -> Result<HttpClient> {
        let mut builder = Client::builder()
            .user_agent(self.config.user_agent.as_str())
            .redirect(reqwest::redirect::Policy::none())
            .timeout(self.config.timeout);

        for (host, addr) in &self.resolve {
            builder = builder.resolve(host, *addr);
        }

        let client = builder.build().map_err(|e| {
            CompanyIntelError::Network(format!("failed to build HTTP client: {e}"))
        })?;

        Ok(HttpClient {
            client,
            robots: RobotsCache::new(
                self.config.user_agent.clone(),
                self.config.robots_fail_open,
            ),
            policy: self
                .policy
                .unwrap_or_else(|| RetryPolicy::from(&self.config)),
            clock: self.clock,
            max_response_bytes: self.config.max_response_bytes,
            requests: AtomicU64::new(0),
        })
    }
}

// ---------------------------------------------------------------------------
// HttpClient
// ---------------------------------------------------------------------------

/// Bounded-retry, robots-checked HTTP client.
pub struct HttpClient {
    client: Client,
    robots: RobotsCache,
    policy: RetryPolicy,
    clock: Arc<dyn Clock>,
    max_response_bytes: u64,
    requests: AtomicU64,
}

impl HttpClient {
    pub fn new(config: &FetchConfig) -> Result<Self> {
        Self::builder(config).build()
    }

    pub fn builder(config: &FetchConfig) -> HttpClientBuilder {
        HttpClientBuilder {
            config: config.clone(),
            policy: None,
            clock: Arc::new(SystemClock),
            resolve: Vec::new(),
        }
    }

    /// Fetch a text document. `None` on robots denial or any network/content failure.
    pub async fn fetch(&self, url: &Url) -> Option<FetchedDocument> {
        match self.try_fetch(url).await {
            Ok(doc) => Some(doc),
            Err(e) => {
                warn!(%url, error = %e, "fetch failed");
                None
            }
        }
    }

    /// Fetch raw bytes (logo assets). `None` on any failure.
    pub async fn fetch_bytes(&self, url: &Url) -> Option<Vec<u8>> {
        match self.try_fetch_bytes(url).await {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                warn!(%url, error = %e, "asset fetch failed");
                None
            }
        }
    }

    /// Fetch a text document, reporting why it failed.
    #[instrument(skip_all, fields(url = %url))]
    pub async fn try_fetch(&self, url: &Url) -> Result<FetchedDocument> {
        let response = self.send_checked(url).await?;
        let final_url = response.url().clone();
        let status = response.status().as_u16();

        let bytes = self.read_body(url, response).await?;
        let body = String::from_utf8_lossy(&bytes).into_owned();

        debug!(status, bytes = body.len(), "document fetched");
        Ok(FetchedDocument {
            url: final_url,
            status,
            body,
        })
    }

    /// Fetch raw bytes, reporting why it failed.
    #[instrument(skip_all, fields(url = %url))]
    pub async fn try_fetch_bytes(&self, url: &Url) -> Result<Vec<u8>> {
        let response = self.send_checked(url).await?;
        let bytes = self.read_body(url, response).await?;

        if bytes.is_empty() {
            return Err(CompanyIntelError::Network(format!("{url}: empty body")));
        }
        Ok(bytes)
    }

    /// Whether robots.txt allows `url` (fetching the rules on first use).
    pub async fn allowed(&self, url: &Url) -> bool {
        self.robots.allow(&self.client, url).await
    }

    /// Number of page/asset/search request attempts sent so far.
    pub fn requests_sent(&self) -> u64 {
        self.requests.load(Ordering::SeqCst)
    }

    pub fn robots(&self) -> &RobotsCache {
        &self.robots
    }

    pub fn clock(&self) -> Arc<dyn Clock> {
        self.clock.clone()
    }

    /// Scheme and robots checks, then the retry loop, once per redirect hop.
    async fn send_checked(&self, url: &Url) -> Result<Response> {
        let mut current = url.clone();

        for hop in 0..=MAX_REDIRECTS {
            if current.scheme() != "http" && current.scheme() != "https" {
                return Err(CompanyIntelError::validation(format!(
                    "unsupported scheme: {current}"
                )));
            }

            if !self.allowed(&current).await {
                return Err(CompanyIntelError::Network(format!(
                    "{current}: disallowed by robots.txt"
                )));
            }

            let response = self.send_with_retry(&current).await?;

            if response.status().is_redirection() {
                let next = redirect_location(&current, &response).ok_or_else(|| {
                    CompanyIntelError::Network(format!(
                        "{current}: HTTP {} without a usable Location",
                        response.status()
                    ))
                })?;
                debug!(hop, from = %current, to = %next, "following redirect");
                current = next;
                continue;
            }

            if let Some(len) = response.content_length() {
                self.check_size(url, len)?;
            }
            return Ok(response);
        }

        Err(CompanyIntelError::Network(format!(
            "{url}: more than {MAX_REDIRECTS} redirects"
        )))
    }

    /// Read the body chunk by chunk, stopping as soon as it exceeds the ceiling.
    async fn read_body(&self, url: &Url, mut response: Response) -> Result<Vec<u8>> {
        let mut body = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| CompanyIntelError::Network(format!("{url}: body read failed: {e}")))?
        {
            body.extend_from_slice(&chunk);
            self.check_size(url, body.len() as u64)?;
        }
        Ok(body)
    }

    async fn send_with_retry(&self, url: &Url) -> Result<Response> {
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            self.requests.fetch_add(1, Ordering::SeqCst);

            let (reason, retry_after) = match self.client.get(url.as_str()).send().await {
                Ok(response)
                    if response.status().is_success() || response.status().is_redirection() =>
                {
                    return Ok(response);
                }
                Ok(response) if self.policy.is_retryable(response.status().as_u16()) => (
                    format!("HTTP {}", response.status()),
                    retry_after(&response),
                ),
                Ok(response) => {
                    return Err(CompanyIntelError::Network(format!(
                        "{url}: HTTP {}",
                        response.status()
                    )));
                }
                Err(e) => (e.to_string(), None),
            };

            if attempt >= self.policy.max_attempts {
                return Err(CompanyIntelError::Network(format!(
                    "{url}: giving up after {attempt} attempts: {reason}"
                )));
            }

            let delay = self.policy.delay_with_hint(attempt, retry_after);
            debug!(attempt, %reason, delay_ms = delay.as_millis(), "retrying request");
            self.clock.sleep(delay).await;
        }
    }

    fn check_size(&self, url: &Url, len: u64) -> Result<()> {
        if len > self.max_response_bytes {
            return Err(CompanyIntelError::validation(format!(
                "{url}: response too large ({len} bytes, max {})",
                self.max_response_bytes
            )));
        }
        Ok(())
    }
}

/// Target of a 3xx response, resolved against the URL that produced it.
pub(crate) fn redirect_location(base: &Url, response: &Response) -> Option<Url> {
    let location = response.headers().get(header::LOCATION)?.to_str().ok()?;
    base.join(location.trim()).ok()
}

/// `Retry-After` in delta-seconds form.
fn retry_after(response: &Response) -> Option<Duration> {
    response
        .headers()
        .get(header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}
