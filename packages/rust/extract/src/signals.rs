//! Identity signals from a company homepage: title, description, logo, and
//! the leading body text fed to the industry classifier.

use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};
use tracing::debug;
use url::Url;

/// Image extensions recognized in logo URLs.
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "svg", "webp", "ico", "avif"];

/// Extension used when the URL does not reveal one.
pub const DEFAULT_IMAGE_EXTENSION: &str = "png";

/// `<link rel>` values treated as site icons, compared case-insensitively.
const ICON_RELS: &[&str] = &[
    "apple-touch-icon",
    "apple-touch-icon-precomposed",
    "icon",
    "shortcut icon",
    "mask-icon",
];

/// Containers scanned for `<img>` logos, in priority order.
const IMG_SCOPES: &[&str] = &[
    r#"[class*="logo"]"#,
    "header",
    r#".navbar-brand, [class*="nav-brand"], [class*="brand"]"#,
];

static TITLE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("title").expect("valid selector"));
static META: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("meta[content]").expect("valid selector"));
static ICON_LINK: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("link[rel][href]").expect("valid selector"));
static IMG: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("img[src]").expect("valid selector"));
static BODY: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("body").expect("valid selector"));
static SCOPES: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    IMG_SCOPES
        .iter()
        .map(|s| Selector::parse(s).expect("valid selector"))
        .collect()
});

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// A selected logo: absolute URL and file extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogoCandidate {
    pub url: Url,
    pub ext: String,
}

/// Everything extracted from one page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageSignals {
    pub title: Option<String>,
    pub description: Option<String>,
    pub logo: Option<LogoCandidate>,
    /// Visible body text, whitespace-collapsed and truncated.
    pub leading_text: String,
}

impl PageSignals {
    /// Title, description and leading text joined for classification.
    pub fn classifier_text(&self) -> String {
        [
            self.title.as_deref().unwrap_or(""),
            self.description.as_deref().unwrap_or(""),
            self.leading_text.as_str(),
        ]
        .join(" ")
    }
}

/// Parse `html` once and extract every signal.
///
/// Malformed markup never fails; missing signals come back as `None`.
pub fn extract_signals(html: &str, base_url: &Url, max_text_chars: usize) -> PageSignals {
    let doc = Html::parse_document(html);
    let (title, description) = title_description(&doc);
    PageSignals {
        title,
        description,
        logo: logo(&doc, base_url),
        leading_text: leading_text(&doc, max_text_chars),
    }
}

// ---------------------------------------------------------------------------
// Title / description
// ---------------------------------------------------------------------------

/// `(title, description)`, each the first non-empty source in order.
///
/// Title: `<title>`, then `og:title`. Description: meta description, then
/// `og:description`, then `twitter:description`.
pub fn title_description(doc: &Html) -> (Option<String>, Option<String>) {
    let title = doc
        .select(&TITLE)
        .map(|t| collapse_whitespace(&t.text().collect::<String>()))
        .find(|t| !t.is_empty())
        .or_else(|| meta_content(doc, "og:title"));

    let description = ["description", "og:description", "twitter:description"]
        .into_iter()
        .find_map(|key| meta_content(doc, key));

    (title, description)
}

/// First non-empty `content` of a `<meta>` whose `name` or `property` equals `key`.
fn meta_content(doc: &Html, key: &str) -> Option<String> {
    doc.select(&META).find_map(|meta| {
        let el = meta.value();
        let matches = ["name", "property"]
            .into_iter()
            .filter_map(|attr| el.attr(attr))
            .any(|v| v.trim().eq_ignore_ascii_case(key));
        if !matches {
            return None;
        }
        let content = collapse_whitespace(el.attr("content").unwrap_or(""));
        (!content.is_empty()).then_some(content)
    })
}

// ---------------------------------------------------------------------------
// Logo
// ---------------------------------------------------------------------------

/// Logo by strict priority: icon `<link>`s, then `og:image`, then logo-ish
/// `<img>` elements in logo containers, the header, and brand containers.
///
/// Only candidates passing [`is_logo_like`] are accepted; the first one wins.
pub fn logo(doc: &Html, base_url: &Url) -> Option<LogoCandidate> {
    let icon_links = doc.select(&ICON_LINK).filter_map(|link| {
        let rel = link.value().attr("rel")?;
        let rel = rel.split_whitespace().collect::<Vec<_>>().join(" ");
        ICON_RELS
            .iter()
            .any(|r| rel.eq_ignore_ascii_case(r))
            .then(|| link.value().attr("href"))
            .flatten()
    });

    let og_image = ["og:image", "og:image:url"]
        .into_iter()
        .filter_map(|key| meta_content(doc, key));

    let scoped_imgs = SCOPES.iter().flat_map(|scope| {
        doc.select(scope).flat_map(|container| {
            let own = container
                .value()
                .name()
                .eq_ignore_ascii_case("img")
                .then_some(container);
            own.into_iter().chain(container.select(&IMG))
        })
    });
    let img_srcs = scoped_imgs
        .filter(|img| mentions_logo(img))
        .filter_map(|img| img.value().attr("src"));

    icon_links
        .map(str::to_string)
        .chain(og_image)
        .chain(img_srcs.map(str::to_string))
        .filter_map(|href| base_url.join(href.trim()).ok())
        .filter(|url| matches!(url.scheme(), "http" | "https"))
        .find(|url| {
            let accepted = is_logo_like(url);
            if !accepted {
                debug!(%url, "logo candidate rejected");
            }
            accepted
        })
        .map(|url| {
            debug!(%url, "logo selected");
            LogoCandidate {
                ext: image_extension(&url).to_string(),
                url,
            }
        })
}

fn mentions_logo(img: &ElementRef<'_>) -> bool {
    ["alt", "src", "class"]
        .into_iter()
        .filter_map(|attr| img.value().attr(attr))
        .any(|v| v.to_ascii_lowercase().contains("logo"))
}

/// Known image extension on the path, or "logo"/"brand" anywhere in the URL.
pub fn is_logo_like(url: &Url) -> bool {
    if path_extension(url).is_some() {
        return true;
    }
    let lower = url.as_str().to_ascii_lowercase();
    lower.contains("logo") || lower.contains("brand")
}

/// Image extension from the URL path, `png` when none is recognized.
pub fn image_extension(url: &Url) -> &'static str {
    path_extension(url).unwrap_or(DEFAULT_IMAGE_EXTENSION)
}

fn path_extension(url: &Url) -> Option<&'static str> {
    let last = url.path_segments()?.next_back()?;
    let (_, ext) = last.rsplit_once('.')?;
    let ext = ext.to_ascii_lowercase();
    IMAGE_EXTENSIONS.iter().copied().find(|known| *known == ext)
}

// ---------------------------------------------------------------------------
// Leading text
// ---------------------------------------------------------------------------

/// First visible body text, script/style/noscript removed, at most `max_chars`.
pub fn leading_text(doc: &Html, max_chars: usize) -> String {
    let root = doc
        .select(&BODY)
        .next()
        .unwrap_or_else(|| doc.root_element());

    let mut out = String::new();
    let mut count = 0usize;

    'outer: for node in root.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node.ancestors().any(|a| {
            a.value().as_element().is_some_and(|e| {
                matches!(e.name(), "script" | "style" | "noscript" | "template")
            })
        });
        if hidden {
            continue;
        }

        for word in text.split_whitespace() {
            if !out.is_empty() {
                if count >= max_chars {
                    break 'outer;
                }
                out.push(' ');
                count += 1;
            }
            for c in word.chars() {
                if count >= max_chars {
                    break 'outer;
                }
                out.push(c);
                count += 1;
            }
        }
    }

    out.trim_end().to_string()
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
