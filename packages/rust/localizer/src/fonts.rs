//! Font-service stylesheet resolution.
//!
//! A font-service stylesheet (e.g. `https://fonts.googleapis.com/css2?family=...`)
//! is a list of `@font-face` rules pointing at remote font binaries. Resolving it
//! means fetching the stylesheet, downloading every referenced font file into the
//! fonts folder, and rewriting the stylesheet so it points at the local copies.

use std::collections::HashSet;
use std::path::PathBuf;

use regex::Regex;
use tracing::{debug, info, instrument, warn};

use offliner_shared::{FontServiceConfig, OfflinerError, Result};

use crate::cache::FetchCache;
use crate::scan::file_name_from_url;

/// Font binary extensions recognised inside `url(...)`.
const FONT_EXTENSIONS: &str = "woff2|woff|ttf|otf|eot";

/// Outcome of resolving one stylesheet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedStylesheet {
    /// Rewritten stylesheet text; empty if the stylesheet could not be fetched.
    pub css: String,
    /// Whether the stylesheet itself was fetched.
    pub fetched: bool,
    /// Distinct font URLs rewritten to local paths.
    pub fonts_localized: usize,
    /// Distinct font URLs left remote because their download failed.
    pub fonts_failed: usize,
}

/// Downloads the fonts of font-service stylesheets into one folder.
#[derive(Debug)]
pub struct FontResolver {
    font_url_re: Regex,
    fonts_dir: PathBuf,
    fonts_ref: String,
}

impl FontResolver {
    /// `fonts_dir` is where files are written; `fonts_ref` is the relative
    /// prefix written into the stylesheet (normally the folder name).
    pub fn new(
        config: &FontServiceConfig,
        fonts_dir: impl Into<PathBuf>,
        fonts_ref: impl Into<String>,
    ) -> Result<Self> {
        let pattern = format!(
            r"url\(({}[^)]+\.(?:{FONT_EXTENSIONS}))\)",
            regex::escape(&config.file_host)
        );
        let font_url_re = Regex::new(&pattern)
            .map_err(|e| OfflinerError::config(format!("invalid fonts.file_host: {e}")))?;

        Ok(Self {
            font_url_re,
            fonts_dir: fonts_dir.into(),
            fonts_ref: fonts_ref.into(),
        })
    }

    /// Font file URLs referenced by `url(...)` in `css`, deduplicated, in order
    /// of first occurrence.
    pub fn font_urls(&self, css: &str) -> Vec<String> {
        let mut seen = HashSet::new();
        self.font_url_re
            .captures_iter(css)
            .map(|caps| caps[1].to_string())
            .filter(|url| seen.insert(url.clone()))
            .collect()
    }

    /// Fetch a stylesheet and localize the fonts it references.
    ///
    /// Never fails: an unreachable stylesheet yields empty CSS, and a font that
    /// cannot be downloaded keeps its remote URL.
    #[instrument(skip_all, fields(url = %stylesheet_url))]
    pub async fn resolve(&self, cache: &mut FetchCache, stylesheet_url: &str) -> ResolvedStylesheet {
        info!("fetching font stylesheet");

        // The stylesheet endpoint is query-parameterised, not a static file, so
        // it bypasses the download cache.
        let css = match cache.client().get_text(stylesheet_url).await {
            Ok(css) => css,
            Err(e) => {
                warn!(error = %e, "failed to fetch font stylesheet");
                return ResolvedStylesheet::default();
            }
        };

        self.localize_fonts(cache, css).await
    }

    /// Download every font referenced by `css` and rewrite the references.
    pub async fn localize_fonts(&self, cache: &mut FetchCache, css: String) -> ResolvedStylesheet {
        let mut resolved = ResolvedStylesheet {
            css,
            fetched: true,
            ..Default::default()
        };

        let urls = self.font_urls(&resolved.css);
        debug!(fonts = urls.len(), "font files referenced");

        for url in urls {
            let Some(file_name) = file_name_from_url(&url) else {
                warn!(%url, "font URL has no file name, leaving it remote");
                resolved.fonts_failed += 1;
                continue;
            };

            let dest = self.fonts_dir.join(&file_name);
            match cache.fetch(&url, &dest).await {
                Ok(_) => {
                    let local = format!("{}/{file_name}", self.fonts_ref);
                    resolved.css = resolved.css.replace(&url, &local);
                    resolved.fonts_localized += 1;
                }
                Err(_) => resolved.fonts_failed += 1,
            }
        }

        resolved
    }
}
