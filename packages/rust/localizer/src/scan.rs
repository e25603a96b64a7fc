//! Discovery of remote asset references inside a document.
//!
//! [`AssetMatcher`] holds the compiled patterns for font-service stylesheets and
//! knows how to recognise each kind of reference. [`AssetMatcher::scan`] lists
//! them without touching the document; the localizer uses the same predicates
//! while mutating.

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

use offliner_markup::{Document, NodeId};
use offliner_shared::{AssetKind, FontServiceConfig, OfflinerError, Result};

/// Where in the document a reference was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetLocation {
    /// An attribute of this element (`<link href>` / `<img src>`).
    Element(NodeId),
    /// An `@import` inside this `<style>` element's text.
    StyleImport(NodeId),
}

/// A remote resource discovered in a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetReference {
    /// What kind of resource it is.
    pub kind: AssetKind,
    /// The URL, normalised to absolute form for stylesheets.
    pub url: String,
    /// Where it was found.
    pub location: AssetLocation,
}

/// Recognises font-service stylesheets, preconnect hints and remote images.
#[derive(Debug)]
pub struct AssetMatcher {
    stylesheet_marker: String,
    stylesheet_scheme: String,
    preconnect_hosts: Vec<String>,
    import_re: Regex,
}

impl AssetMatcher {
    /// Compile the patterns for the given font service.
    pub fn new(config: &FontServiceConfig) -> Result<Self> {
        // `@import url("...")` with optional quotes, an optional scheme and an
        // optional trailing semicolon; group 1 is the URL.
        let pattern = format!(
            r#"@import\s+url\(["']?((?:https?:)?//{}[^"')\s]+)["']?\);?"#,
            regex::escape(&config.stylesheet_marker)
        );
        let import_re = Regex::new(&pattern)
            .map_err(|e| OfflinerError::config(format!("invalid fonts.stylesheet_marker: {e}")))?;

        Ok(Self {
            stylesheet_marker: config.stylesheet_marker.clone(),
            stylesheet_scheme: config.stylesheet_scheme.clone(),
            preconnect_hosts: config.preconnect_hosts.clone(),
            import_re,
        })
    }

    /// Whether a `<link href>` points at a font-service stylesheet.
    pub fn is_font_stylesheet(&self, href: &str) -> bool {
        href.contains(&self.stylesheet_marker)
    }

    /// Turn a stylesheet href into an absolute URL: `//host/path` and bare
    /// `host/path` both get the configured scheme; `http(s)://` is kept.
    pub fn stylesheet_url(&self, href: &str) -> String {
        if href.starts_with("http://") || href.starts_with("https://") {
            href.to_string()
        } else if let Some(rest) = href.strip_prefix("//") {
            format!("{}://{rest}", self.stylesheet_scheme)
        } else {
            format!("{}://{href}", self.stylesheet_scheme)
        }
    }

    /// Whether `link` is a `rel="preconnect"` hint for the font service.
    pub fn is_font_preconnect(&self, doc: &Document, link: NodeId) -> bool {
        let is_preconnect = doc.attr(link, "rel").is_some_and(|rel| {
            rel.split_ascii_whitespace()
                .any(|token| token.eq_ignore_ascii_case("preconnect"))
        });
        let href = doc.attr(link, "href").unwrap_or("");
        is_preconnect && self.preconnect_hosts.iter().any(|host| href.contains(host.as_str()))
    }

    /// Font-service `@import` URLs in a stylesheet, normalised, in source order.
    pub fn font_imports(&self, css: &str) -> Vec<String> {
        self.import_re
            .captures_iter(css)
            .map(|caps| self.stylesheet_url(&caps[1]))
            .collect()
    }

    /// Remove every font-service `@import` statement from a stylesheet.
    pub fn strip_font_imports(&self, css: &str) -> String {
        self.import_re.replace_all(css, "").into_owned()
    }

    /// List every reference a localization pass would act on, in the order the
    /// pass visits them: stylesheet links, preconnect hints, `@import`s, images.
    pub fn scan(&self, doc: &Document) -> Vec<AssetReference> {
        let mut refs = Vec::new();
        let links = doc.elements_by_tag("link");

        for &link in &links {
            let href = doc.attr(link, "href").unwrap_or("");
            if self.is_font_stylesheet(href) {
                refs.push(AssetReference {
                    kind: AssetKind::FontStylesheet,
                    url: self.stylesheet_url(href),
                    location: AssetLocation::Element(link),
                });
            }
        }

        for &link in &links {
            let href = doc.attr(link, "href").unwrap_or("");
            if !self.is_font_stylesheet(href) && self.is_font_preconnect(doc, link) {
                refs.push(AssetReference {
                    kind: AssetKind::Preconnect,
                    url: href.to_string(),
                    location: AssetLocation::Element(link),
                });
            }
        }

        for style in doc.elements_by_tag("style") {
            let Some(css) = doc.text(style) else {
                continue;
            };
            for url in self.font_imports(css) {
                refs.push(AssetReference {
                    kind: AssetKind::FontStylesheet,
                    url,
                    location: AssetLocation::StyleImport(style),
                });
            }
        }

        for img in doc.elements_by_tag("img") {
            let src = doc.attr(img, "src").unwrap_or("");
            if is_remote_url(src) {
                refs.push(AssetReference {
                    kind: AssetKind::Image,
                    url: src.to_string(),
                    location: AssetLocation::Element(img),
                });
            }
        }

        refs
    }
}

/// Whether a `src` is an absolute HTTP or HTTPS URL.
pub fn is_remote_url(src: &str) -> bool {
    src.starts_with("http://") || src.starts_with("https://")
}

/// Last path segment of a URL, or `None` if the URL has no usable one.
pub fn file_name_from_url(url: &str) -> Option<String> {
    static SEGMENT_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"^[^/\\\x00]+$").expect("valid regex"));

    let parsed = Url::parse(url).ok()?;
    let last = parsed.path_segments()?.next_back()?;
    if last.is_empty() || last == "." || last == ".." || !SEGMENT_RE.is_match(last) {
        return None;
    }
    Some(last.to_string())
}
