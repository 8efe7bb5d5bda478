//! Logo asset download.

use std::path::{Path, PathBuf};

use companyintel_extract::LogoCandidate;
use companyintel_fetch::HttpClient;
use companyintel_shared::{CompanyIntelError, Result, slugify_company};
use tracing::{debug, instrument, warn};
use uuid::Uuid;

/// Local file name for a company's logo: `<Slug>.<ext>`.
pub fn logo_file_name(company: &str, ext: &str) -> String {
    format!("{}.{}", slugify_company(company), ext)
}

/// Download `logo` into `assets_dir`, named after the company.
///
/// Returns the written path, or `None` on any failure (robots denial, HTTP
/// error, empty body, write error). Failures are logged, never propagated.
#[instrument(skip_all, fields(company = %company, url = %logo.url))]
pub async fn download_logo(
    client: &HttpClient,
    logo: &LogoCandidate,
    company: &str,
    assets_dir: &Path,
) -> Option<PathBuf> {
    let bytes = client.fetch_bytes(&logo.url).await?;
    let path = assets_dir.join(logo_file_name(company, &logo.ext));

    match write_atomic(&path, &bytes) {
        Ok(()) => {
            debug!(path = %path.display(), bytes = bytes.len(), "logo saved");
            Some(path)
        }
        Err(e) => {
            warn!(error = %e, "failed to save logo");
            None
        }
    }
}

/// Write `bytes` to a sibling temp file, then rename it over `path`.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| CompanyIntelError::validation(format!("no parent dir: {}", path.display())))?;
    std::fs::create_dir_all(parent).map_err(|e| CompanyIntelError::io(parent, e))?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp = parent.join(format!(".{file_name}.tmp-{}", Uuid::now_v7()));

    std::fs::write(&tmp, bytes).map_err(|e| CompanyIntelError::io(&tmp, e))?;
    std::fs::rename(&tmp, path).map_err(|e| {
        let _ = std::fs::remove_file(&tmp);
        CompanyIntelError::io(path, e)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use companyintel_shared::FetchConfig;
    use url::Url;
    use wiremock::matchers::path;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn temp_dir() -> PathBuf {
        std::env::temp_dir().join(format!("ci_assets_{}", Uuid::now_v7()))
    }

    fn client() -> HttpClient {
        HttpClient::new(&FetchConfig {
            max_retries: 0,
            ..FetchConfig::default()
        })
        .unwrap()
    }

    async fn server() -> MockServer {
        let server = MockServer::start().await;
        Mock::given(path("/robots.txt"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        server
    }

    #[test]
    fn file_name_uses_slug_and_extension() {
        assert_eq!(logo_file_name("Acme Rockets Ltd", "png"), "Acme-Rockets.png");
        assert_eq!(logo_file_name("Initech GmbH", "svg"), "Initech.svg");
    }

    #[test]
    fn atomic_write_replaces_file() {
        let dir = temp_dir();
        let path = dir.join("Acme.png");
        write_atomic(&path, b"first").unwrap();
        write_atomic(&path, b"second").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"second");
        assert_eq!(std::fs::read_dir(&dir).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn downloads_into_assets_dir() {
        let server = server().await;
        Mock::given(path("/logo.png"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"\x89PNG".to_vec()))
            .expect(1)
            .mount(&server)
            .await;

        let dir = temp_dir();
        let logo = LogoCandidate {
            url: Url::parse(&format!("{}/logo.png", server.uri())).unwrap(),
            ext: "png".into(),
        };
        let path = download_logo(&client(), &logo, "Acme Rockets Ltd", &dir)
            .await
            .expect("downloaded");
        assert_eq!(path, dir.join("Acme-Rockets.png"));
        assert_eq!(std::fs::read(&path).unwrap(), b"\x89PNG");
    }

    #[tokio::test]
    async fn http_failure_yields_none() {
        let server = server().await;
        Mock::given(path("/logo.png"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let dir = temp_dir();
        let logo = LogoCandidate {
            url: Url::parse(&format!("{}/logo.png", server.uri())).unwrap(),
            ext: "png".into(),
        };
        assert!(download_logo(&client(), &logo, "Acme", &dir).await.is_none());
        assert!(!dir.join("Acme.png").exists());
    }
}
