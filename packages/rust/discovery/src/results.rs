//! Search results page parsing.
//!
//! The static HTML surface marks organic results with `a.result__a` and wraps
//! targets in a redirect (`/l/?uddg=<encoded target>`). Pages without the
//! result class fall back to every `a[href]` in document order.

use std::sync::LazyLock;

use scraper::{Html, Selector};
use url::Url;

static RESULT_LINK: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a.result__a[href]").expect("valid selector"));

static ANY_LINK: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("valid selector"));

/// Every result link on the page, absolute and unwrapped, in document order.
///
/// Only `http`/`https` targets are returned.
pub fn parse_result_links(html: &str, page_url: &Url) -> Vec<Url> {
    let doc = Html::parse_document(html);

    let mut anchors: Vec<&str> = doc
        .select(&RESULT_LINK)
        .filter_map(|a| a.value().attr("href"))
        .collect();
    if anchors.is_empty() {
        anchors = doc
            .select(&ANY_LINK)
            .filter_map(|a| a.value().attr("href"))
            .collect();
    }

    anchors
        .into_iter()
        .filter_map(|href| page_url.join(href.trim()).ok())
        .map(unwrap_redirect)
        .filter(|url| matches!(url.scheme(), "http" | "https"))
        .collect()
}

/// Unwrap `.../l/?uddg=<target>`; other URLs pass through unchanged.
pub fn unwrap_redirect(url: Url) -> Url {
    if !url.path().ends_with("/l/") {
        return url;
    }
    url.query_pairs()
        .find(|(key, _)| key == "uddg")
        .and_then(|(_, target)| Url::parse(&target).ok())
        .unwrap_or(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page() -> Url {
        Url::parse("https://html.duckduckgo.com/html/?q=acme").unwrap()
    }

    #[test]
    fn result_class_links_win() {
        let html = r#"
            <a href="https://html.duckduckgo.com/settings">Settings</a>
            <div class="result"><a class="result__a" href="https://acme.example/">Acme</a></div>
            <div class="result"><a class="result__a" href="https://other.example/">Other</a></div>
        "#;
        let links = parse_result_links(html, &page());
        assert_eq!(
            links,
            vec![
                Url::parse("https://acme.example/").unwrap(),
                Url::parse("https://other.example/").unwrap()
            ]
        );
    }

    #[test]
    fn redirect_links_are_unwrapped() {
        let html = r#"<a class="result__a"
            href="//duckduckgo.com/l/?uddg=https%3A%2F%2Fwww.acme.example%2Fabout&rut=abc">Acme</a>"#;
        let links = parse_result_links(html, &page());
        assert_eq!(links[0].as_str(), "https://www.acme.example/about");
    }

    #[test]
    fn falls_back_to_plain_anchors() {
        let html = r#"<p><a href="/relative">Rel</a> <a href="mailto:x@y.z">Mail</a></p>"#;
        let links = parse_result_links(html, &page());
        assert_eq!(links, vec![Url::parse("https://html.duckduckgo.com/relative").unwrap()]);
    }

    #[test]
    fn redirect_without_target_passes_through() {
        let url = Url::parse("https://duckduckgo.com/l/?foo=bar").unwrap();
        assert_eq!(unwrap_redirect(url.clone()), url);
    }

    #[test]
    fn empty_page_has_no_links() {
        assert!(parse_result_links("<html><body>No results.</body></html>", &page()).is_empty());
    }
}
