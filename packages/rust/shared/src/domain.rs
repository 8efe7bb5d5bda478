//! Canonical-domain and filesystem-slug helpers.

use url::Url;

/// Legal-entity suffixes recognized in company names (matched case-sensitively
/// after stripping a trailing `.`).
pub const LEGAL_SUFFIXES: &[&str] = &[
    "Ltd", "Limited", "Inc", "Incorporated", "Corp", "Corporation", "LLC", "LLP", "LP", "GmbH",
    "AG", "PLC", "Plc", "SA", "SAS", "BV", "NV", "Pty", "Co", "Company", "Group", "Holdings",
];

/// Canonical domain of a URL: lower-cased host with a leading `www.` stripped.
///
/// Ports are not part of the domain. Returns `None` for host-less URLs.
pub fn canonical_domain(url: &Url) -> Option<String> {
    let host = url.host_str()?.trim_end_matches('.').to_lowercase();
    if host.is_empty() {
        return None;
    }
    Some(host.strip_prefix("www.").unwrap_or(&host).to_string())
}

/// Whether `host` equals `blocked` or is a subdomain of it.
pub fn host_matches(host: &str, blocked: &str) -> bool {
    let host = host.trim_end_matches('.').to_lowercase();
    let blocked = blocked.trim_end_matches('.').to_lowercase();
    host == blocked || host.ends_with(&format!(".{blocked}"))
}

/// Filesystem-safe slug of a company name, keeping case.
///
/// `"Acme Rockets Ltd"` → `"Acme-Rockets"`. Trailing legal-entity suffixes are
/// dropped, non-alphanumeric runs collapse to a single `-`.
pub fn slugify_company(name: &str) -> String {
    let mut words: Vec<&str> = name
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();

    while words.len() > 1 && words.last().is_some_and(|w| is_legal_suffix(w)) {
        words.pop();
    }

    if words.is_empty() {
        "company".to_string()
    } else {
        words.join("-")
    }
}

/// Whether a single token is a legal-entity suffix (`Ltd.`, `Inc`, ...).
pub fn is_legal_suffix(token: &str) -> bool {
    let token = token.trim_end_matches('.');
    LEGAL_SUFFIXES.contains(&token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_domain_strips_www_and_case() {
        let url = Url::parse("https://WWW.Acme-Rockets.Example/about").unwrap();
        assert_eq!(canonical_domain(&url).as_deref(), Some("acme-rockets.example"));
    }

    #[test]
    fn canonical_domain_ignores_port() {
        let url = Url::parse("http://acme-rockets.example:8080/").unwrap();
        assert_eq!(canonical_domain(&url).as_deref(), Some("acme-rockets.example"));
    }

    #[test]
    fn canonical_domain_keeps_other_subdomains() {
        let url = Url::parse("https://shop.acme.example").unwrap();
        assert_eq!(canonical_domain(&url).as_deref(), Some("shop.acme.example"));
    }

    #[test]
    fn canonical_domain_none_for_hostless() {
        let url = Url::parse("mailto:hello@acme.example").unwrap();
        assert_eq!(canonical_domain(&url), None);
    }

    #[test]
    fn host_matches_subdomains() {
        assert!(host_matches("www.linkedin.com", "linkedin.com"));
        assert!(host_matches("linkedin.com", "linkedin.com"));
        assert!(!host_matches("notlinkedin.com", "linkedin.com"));
    }

    #[test]
    fn slug_drops_legal_suffix() {
        assert_eq!(slugify_company("Acme Rockets Ltd"), "Acme-Rockets");
        assert_eq!(slugify_company("Acme Rockets Ltd."), "Acme-Rockets");
        assert_eq!(slugify_company("Widget, Inc."), "Widget");
        assert_eq!(slugify_company("Deutsche Bahn AG"), "Deutsche-Bahn");
    }

    #[test]
    fn slug_is_filesystem_safe() {
        assert_eq!(slugify_company("../../etc/passwd"), "etc-passwd");
        assert_eq!(slugify_company("Ünïcode & Sons"), "n-code-Sons");
        assert_eq!(slugify_company("   "), "company");
    }

    #[test]
    fn slug_keeps_lone_suffix_word() {
        assert_eq!(slugify_company("Group"), "Group");
    }
}
