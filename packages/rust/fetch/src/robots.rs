//! robots.txt parsing and the per-host policy cache.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, info, warn};
use url::Url;

use crate::client::{MAX_REDIRECTS, redirect_location};

// ---------------------------------------------------------------------------
// RobotsTxt
// ---------------------------------------------------------------------------

/// Parsed robots.txt rules.
#[derive(Debug, Clone, Default)]
pub struct RobotsTxt {
    groups: Vec<Group>,
}

/// One `User-agent` group and its rules.
#[derive(Debug, Clone, Default)]
struct Group {
    /// Lower-cased agent tokens (`*` for the default group).
    agents: Vec<String>,
    rules: Vec<Rule>,
    crawl_delay: Option<f64>,
}

#[derive(Debug, Clone)]
struct Rule {
    allow: bool,
    pattern: String,
}

impl RobotsTxt {
    /// Parse robots.txt content. Unknown directives are ignored.
    pub fn parse(content: &str) -> Self {
        let mut groups: Vec<Group> = Vec::new();
        let mut current = Group::default();
        // Consecutive User-agent lines share one group.
        let mut collecting_agents = false;

        for line in content.lines() {
            let line = line.split('#').next().unwrap_or("").trim();
            if line.is_empty() {
                continue;
            }

            let Some((directive, value)) = line.split_once(':') else {
                continue;
            };
            let directive = directive.trim().to_lowercase();
            let value = value.trim();

            match directive.as_str() {
                "user-agent" => {
                    if !collecting_agents && !current.agents.is_empty() {
                        groups.push(std::mem::take(&mut current));
                    }
                    current.agents.push(value.to_lowercase());
                    collecting_agents = true;
                }
                "allow" | "disallow" => {
                    collecting_agents = false;
                    if current.agents.is_empty() || value.is_empty() {
                        continue;
                    }
                    current.rules.push(Rule {
                        allow: directive == "allow",
                        pattern: value.to_string(),
                    });
                }
                "crawl-delay" => {
                    collecting_agents = false;
                    if let Ok(delay) = value.parse::<f64>() {
                        current.crawl_delay = Some(delay);
                    }
                }
                _ => {}
            }
        }

        if !current.agents.is_empty() {
            groups.push(current);
        }

        Self { groups }
    }

    /// Check whether `path` (path plus optional query) is allowed for `user_agent`.
    ///
    /// The most specific group wins (a named agent over `*`); within it the
    /// longest matching pattern wins and `Allow` wins ties.
    pub fn is_allowed(&self, user_agent: &str, path: &str) -> bool {
        let Some(group) = self.group_for(user_agent) else {
            return true;
        };

        let mut best: Option<(usize, bool)> = None;
        for rule in &group.rules {
            if !pattern_matches(&rule.pattern, path) {
                continue;
            }
            let len = rule.pattern.len();
            best = match best {
                Some((best_len, best_allow)) if best_len > len => Some((best_len, best_allow)),
                Some((best_len, best_allow)) if best_len == len => {
                    Some((best_len, best_allow || rule.allow))
                }
                _ => Some((len, rule.allow)),
            };
        }

        best.is_none_or(|(_, allow)| allow)
    }

    /// Crawl delay declared for `user_agent`'s group.
    pub fn crawl_delay(&self, user_agent: &str) -> Option<Duration> {
        self.group_for(user_agent)
            .and_then(|g| g.crawl_delay)
            .filter(|d| d.is_finite() && *d >= 0.0)
            .map(Duration::from_secs_f64)
    }

    fn group_for(&self, user_agent: &str) -> Option<&Group> {
        let token = agent_token(user_agent);
        self.groups
            .iter()
            .find(|g| g.agents.iter().any(|a| a != "*" && token.contains(a.as_str())))
            .or_else(|| self.groups.iter().find(|g| g.agents.iter().any(|a| a == "*")))
    }
}

/// Product token of a User-Agent string, lower-cased (`CompanyIntelBot/0.1 (...)` → `companyintelbot`).
fn agent_token(user_agent: &str) -> String {
    user_agent
        .split(['/', ' '])
        .next()
        .unwrap_or(user_agent)
        .to_lowercase()
}

/// Prefix match supporting `*` wildcards and a trailing `$` anchor.
fn pattern_matches(pattern: &str, path: &str) -> bool {
    let (pattern, anchored) = match pattern.strip_suffix('$') {
        Some(p) => (p, true),
        None => (pattern, false),
    };

    let mut parts = pattern.split('*');
    let first = parts.next().unwrap_or("");
    if !path.starts_with(first) {
        return false;
    }
    let mut pos = first.len();
    let rest: Vec<&str> = parts.collect();

    for (i, part) in rest.iter().enumerate() {
        if part.is_empty() {
            if i == rest.len() - 1 {
                // Trailing `*` matches everything left.
                return true;
            }
            continue;
        }
        // The final segment of an anchored pattern must sit at the very end.
        if anchored && i == rest.len() - 1 {
            return path.len() >= pos + part.len() && path.ends_with(part);
        }
        match path[pos..].find(part) {
            Some(found) => pos += found + part.len(),
            None => return false,
        }
    }

    !anchored || pos == path.len()
}

// ---------------------------------------------------------------------------
// RobotsCache
// ---------------------------------------------------------------------------

/// Per-host robots.txt rules, fetched lazily once per process lifetime.
///
/// `None` in a slot means the fetch failed; the fail policy decides.
pub struct RobotsCache {
    entries: Mutex<HashMap<String, Arc<OnceCell<Option<Arc<RobotsTxt>>>>>>,
    user_agent: String,
    fail_open: bool,
}

impl RobotsCache {
    pub fn new(user_agent: impl Into<String>, fail_open: bool) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            user_agent: user_agent.into(),
            fail_open,
        }
    }

    /// Whether `url` may be fetched. Fetches `{scheme}://{host}/robots.txt` on
    /// first use for the host; concurrent first uses share one fetch.
    pub async fn allow(&self, client: &Client, url: &Url) -> bool {
        let Some(key) = host_key(url) else {
            return false;
        };

        let cell = {
            let mut entries = self.entries.lock().await;
            entries.entry(key.clone()).or_default().clone()
        };

        let rules = cell
            .get_or_init(|| fetch_robots(client, url, &self.user_agent))
            .await;

        let mut path = url.path().to_string();
        if let Some(query) = url.query() {
            path.push('?');
            path.push_str(query);
        }

        match rules {
            Some(robots) => {
                let allowed = robots.is_allowed(&self.user_agent, &path);
                if !allowed {
                    info!(host = %key, %path, "robots.txt disallows path");
                }
                allowed
            }
            None => {
                if !self.fail_open {
                    warn!(host = %key, "robots.txt unavailable, failing closed");
                }
                self.fail_open
            }
        }
    }

    /// Crawl delay advertised for our agent on `url`'s host, if already cached.
    pub async fn crawl_delay(&self, url: &Url) -> Option<Duration> {
        let key = host_key(url)?;
        let cell = self.entries.lock().await.get(&key).cloned()?;
        cell.get()?.as_ref()?.crawl_delay(&self.user_agent)
    }

    /// Number of hosts with a cached (or in-flight) entry.
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

/// Cache key: host plus explicit port.
fn host_key(url: &Url) -> Option<String> {
    let host = url.host_str()?.to_lowercase();
    Some(match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host,
    })
}

/// Fetch and parse robots.txt for `url`'s origin.
///
/// A 4xx means "no rules" (allow all); transport errors and 5xx are failures.
async fn fetch_robots(client: &Client, url: &Url, user_agent: &str) -> Option<Arc<RobotsTxt>> {
    let mut robots_url = url.clone();
    robots_url.set_path("/robots.txt");
    robots_url.set_query(None);
    robots_url.set_fragment(None);

    debug!(url = %robots_url, "fetching robots.txt");

    let mut target = robots_url.clone();
    let mut hops = 0;
    let response = loop {
        let response = match client
            .get(target.as_str())
            .header(reqwest::header::USER_AGENT, user_agent)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!(url = %target, error = %e, "robots.txt fetch failed");
                return None;
            }
        };

        if !response.status().is_redirection() || hops == MAX_REDIRECTS {
            break response;
        }
        let Some(next) = redirect_location(&target, &response) else {
            break response;
        };
        hops += 1;
        target = next;
    };

    let status = response.status();
    if status.is_client_error() {
        debug!(url = %robots_url, %status, "no robots.txt, allowing all");
        return Some(Arc::new(RobotsTxt::default()));
    }
    if !status.is_success() {
        warn!(url = %robots_url, %status, "robots.txt fetch failed");
        return None;
    }

    match response.text().await {
        Ok(body) => Some(Arc::new(RobotsTxt::parse(&body))),
        Err(e) => {
            warn!(url = %robots_url, error = %e, "robots.txt body read failed");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const AGENT: &str = "CompanyIntelBot/0.1 (+company enrichment)";

    #[test]
    fn parse_basic() {
        let robots = RobotsTxt::parse(
            r#"
User-agent: *
Disallow: /private/
Disallow: /admin/
Allow: /public/
Crawl-delay: 2
"#,
        );

        assert!(robots.is_allowed(AGENT, "/public/page"));
        assert!(!robots.is_allowed(AGENT, "/private/page"));
        assert!(!robots.is_allowed(AGENT, "/admin/"));
        assert!(robots.is_allowed(AGENT, "/other/page"));
        assert_eq!(robots.crawl_delay(AGENT), Some(Duration::from_secs(2)));
    }

    #[test]
    fn named_group_beats_wildcard() {
        let robots = RobotsTxt::parse(
            r#"
User-agent: *
Disallow: /

User-agent: companyintelbot
Disallow: /secret
"#,
        );

        assert!(robots.is_allowed(AGENT, "/page"));
        assert!(!robots.is_allowed(AGENT, "/secret/x"));
        assert!(!robots.is_allowed("OtherBot/1.0", "/page"));
    }

    #[test]
    fn shared_group_for_consecutive_agents() {
        let robots = RobotsTxt::parse(
            r#"
User-agent: googlebot
User-agent: companyintelbot
Disallow: /tmp
"#,
        );
        assert!(!robots.is_allowed(AGENT, "/tmp/file"));
        assert!(robots.is_allowed("Mozilla/5.0", "/tmp/file"));
    }

    #[test]
    fn longest_match_wins() {
        let robots = RobotsTxt::parse(
            r#"
User-agent: *
Disallow: /private/
Allow: /private/public/
"#,
        );
        assert!(!robots.is_allowed(AGENT, "/private/secret"));
        assert!(robots.is_allowed(AGENT, "/private/public/page"));
    }

    #[test]
    fn empty_disallow_allows_all() {
        let robots = RobotsTxt::parse("User-agent: *\nDisallow:\n");
        assert!(robots.is_allowed(AGENT, "/anything"));
    }

    #[test]
    fn wildcards_and_anchors() {
        let robots = RobotsTxt::parse(
            r#"
User-agent: *
Disallow: /*.pdf$
Disallow: /search*q=
"#,
        );
        assert!(!robots.is_allowed(AGENT, "/files/report.pdf"));
        assert!(robots.is_allowed(AGENT, "/files/report.pdf.html"));
        assert!(!robots.is_allowed(AGENT, "/search?q=acme"));
        assert!(robots.is_allowed(AGENT, "/search"));
    }

    #[test]
    fn comments_are_ignored() {
        let robots = RobotsTxt::parse("# hi\nUser-agent: * # everyone\nDisallow: /x # no\n");
        assert!(!robots.is_allowed(AGENT, "/x"));
    }

    #[tokio::test]
    async fn cache_fetches_once_per_host() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/robots.txt"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /private\n"),
            )
            .expect(1)
            .mount(&server)
            .await;

        let cache = RobotsCache::new(AGENT, true);
        let client = Client::new();
        let base = Url::parse(&server.uri()).unwrap();

        assert!(cache.allow(&client, &base.join("/about").unwrap()).await);
        assert!(!cache.allow(&client, &base.join("/private/x").unwrap()).await);
        assert!(cache.allow(&client, &base.join("/").unwrap()).await);
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn missing_robots_allows_all() {
        let server = MockServer::start().await;
        Mock::given(path("/robots.txt"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let cache = RobotsCache::new(AGENT, false);
        let url = Url::parse(&format!("{}/anything", server.uri())).unwrap();
        assert!(cache.allow(&Client::new(), &url).await);
    }

    #[tokio::test]
    async fn server_error_applies_fail_policy() {
        let server = MockServer::start().await;
        Mock::given(path("/robots.txt"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let url = Url::parse(&format!("{}/page", server.uri())).unwrap();
        let client = Client::new();

        let open = RobotsCache::new(AGENT, true);
        assert!(open.allow(&client, &url).await);

        let closed = RobotsCache::new(AGENT, false);
        assert!(!closed.allow(&client, &url).await);
    }

    #[tokio::test]
    async fn redirected_robots_rules_still_apply() {
        let server = MockServer::start().await;
        Mock::given(path("/robots.txt"))
            .respond_with(ResponseTemplate::new(301).insert_header("location", "/rules.txt"))
            .mount(&server)
            .await;
        Mock::given(path("/rules.txt"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /private\n"),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .unwrap();
        let cache = RobotsCache::new(AGENT, true);
        let base = Url::parse(&server.uri()).unwrap();

        assert!(!cache.allow(&client, &base.join("/private/x").unwrap()).await);
        assert!(cache.allow(&client, &base.join("/about").unwrap()).await);
    }

    #[tokio::test]
    async fn unreachable_host_fails_open_by_default() {
        // Port 9 (discard) on localhost is almost never listening.
        let url = Url::parse("http://127.0.0.1:9/page").unwrap();
        let cache = RobotsCache::new(AGENT, true);
        assert!(cache.allow(&Client::new(), &url).await);
    }
}
