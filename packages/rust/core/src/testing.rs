//! Mock company website + search surface shared by the orchestrator and batch tests.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use companyintel_fetch::{HttpClient, ManualClock};
use companyintel_shared::{AppConfig, EnrichConfig};
use companyintel_storage::Storage;
use uuid::Uuid;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::context::EnrichContext;

/// Host the mock company site is served under (pinned to the mock server).
pub const SITE_HOST: &str = "acme-rockets.example";

pub const SITE_TITLE: &str = "Acme Rockets | Reusable Orbital Launch";

pub const SITE_HTML: &str = r#"<!DOCTYPE html>
<html>
<head>
  <title>Acme Rockets | Reusable Orbital Launch</title>
  <meta name="description" content="Acme Rockets builds reusable rockets for orbital launch.">
  <meta property="og:image" content="/static/social-card.jpg">
  <link rel="apple-touch-icon" href="/static/apple-touch-icon.png">
</head>
<body>
  <header><img src="/static/logo.svg" alt="Acme logo"></header>
  <h1>Acme Rockets</h1>
  <p>Reusable launch vehicles for satellite operators.</p>
  <script>window.analytics = {};</script>
</body>
</html>"#;

pub struct Fixture {
    pub server: MockServer,
    pub clock: Arc<ManualClock>,
    pub ctx: Arc<EnrichContext>,
    pub dir: PathBuf,
}

impl Fixture {
    /// Mock server with no robots rules.
    pub async fn new() -> Self {
        Self::with_robots(None).await
    }

    /// Mock server serving `robots` as robots.txt (404 when `None`).
    pub async fn with_robots(robots: Option<&str>) -> Self {
        let server = MockServer::start().await;
        let robots_response = match robots {
            Some(body) => ResponseTemplate::new(200).set_body_string(body),
            None => ResponseTemplate::new(404),
        };
        Mock::given(path("/robots.txt"))
            .respond_with(robots_response)
            .mount(&server)
            .await;

        let dir = std::env::temp_dir().join(format!("ci_core_{}", Uuid::now_v7()));
        let mut config = EnrichConfig::from(&AppConfig::default());
        config.db_path = dir.join("companyintel.db");
        config.export_path = dir.join("companies.json");
        config.assets_dir = dir.join("logos");
        config.search_endpoint = format!("{}/html/", server.uri());
        config.polite_sleep = Duration::from_secs(1);
        config.fetch.max_retries = 0;

        let clock = Arc::new(ManualClock::default());
        let client = HttpClient::builder(&config.fetch)
            .clock(clock.clone())
            .resolve(SITE_HOST, *server.address())
            .build()
            .expect("client");
        let store = Storage::open(&config.db_path).await.expect("store");
        let ctx = Arc::new(EnrichContext::new(config, client, store).expect("context"));

        Self {
            server,
            clock,
            ctx,
            dir,
        }
    }

    /// Absolute URL on the mock company site.
    pub fn site_url(&self, path: &str) -> String {
        format!("http://{SITE_HOST}:{}{path}", self.server.address().port())
    }

    /// Search results page listing a social profile, then `target`.
    pub async fn mount_search_to(&self, target: &str, expected: u64) {
        let body = format!(
            r#"<html><body>
              <div class="result"><a class="result__a" href="https://www.linkedin.com/company/acme-rockets">Acme Rockets | LinkedIn</a></div>
              <div class="result"><a class="result__a" href="{target}">Acme Rockets</a></div>
            </body></html>"#
        );
        Mock::given(method("GET"))
            .and(path("/html/"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .expect(expected)
            .mount(&self.server)
            .await;
    }

    /// Search results pointing at the site's homepage.
    pub async fn mount_search(&self, expected: u64) {
        let target = self.site_url("/");
        self.mount_search_to(&target, expected).await;
    }

    /// Search results page with no results.
    pub async fn mount_empty_search(&self) {
        Mock::given(path("/html/"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string("<html><body>No results.</body></html>"),
            )
            .mount(&self.server)
            .await;
    }

    pub async fn mount_home(&self, expected: u64, delay: Duration) {
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/html; charset=utf-8")
                    .set_body_string(SITE_HTML)
                    .set_delay(delay),
            )
            .expect(expected)
            .mount(&self.server)
            .await;
    }

    pub async fn mount_logo(&self) {
        Mock::given(path("/static/apple-touch-icon.png"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"\x89PNG\r\n".to_vec()))
            .mount(&self.server)
            .await;
    }

    /// Search, homepage (fetched `home_hits` times) and logo.
    pub async fn mount_site(&self, search_hits: u64, home_hits: u64) {
        self.mount_search(search_hits).await;
        self.mount_home(home_hits, Duration::ZERO).await;
        self.mount_logo().await;
    }
}
