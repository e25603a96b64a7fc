//! Rewrites one parsed document so its fonts and images point at local copies.

use std::path::PathBuf;

use tracing::{debug, info, instrument, warn};

use offliner_markup::Document;
use offliner_shared::{AppConfig, LocalizeReport, Result};

use crate::cache::FetchCache;
use crate::fonts::FontResolver;
use crate::runner::OutputDirs;
use crate::scan::{AssetMatcher, file_name_from_url, is_remote_url};

/// Applies the localization pass to documents, sharing one configuration.
#[derive(Debug)]
pub struct AssetLocalizer {
    matcher: AssetMatcher,
    fonts: FontResolver,
    images_dir: PathBuf,
    images_ref: String,
    default_image_name: String,
}

impl AssetLocalizer {
    /// Build a localizer writing into the prepared output folders.
    pub fn new(config: &AppConfig, dirs: &OutputDirs) -> Result<Self> {
        Ok(Self {
            matcher: AssetMatcher::new(&config.fonts)?,
            fonts: FontResolver::new(&config.fonts, &dirs.fonts, &config.output.fonts_dir)?,
            images_dir: dirs.images.clone(),
            images_ref: config.output.images_dir.clone(),
            default_image_name: config.output.default_image_name.clone(),
        })
    }

    /// Localize fonts and images in `doc`, mutating it in place.
    ///
    /// The steps run in a fixed order:
    /// 1. font-service `<link>` elements are queued and removed
    /// 2. font-service preconnect hints are removed
    /// 3. font-service `@import`s are queued and stripped from `<style>` text
    /// 4. queued stylesheets are resolved into one `<style>` prepended to `<head>`
    /// 5. remote `<img src>` are downloaded and rewritten
    ///
    /// Download failures leave the affected reference untouched.
    #[instrument(skip_all)]
    pub async fn localize(&self, doc: &mut Document, cache: &mut FetchCache) -> LocalizeReport {
        let mut report = LocalizeReport::default();
        let mut stylesheets: Vec<String> = Vec::new();

        // Step 1: font stylesheet links
        for link in doc.elements_by_tag("link") {
            let href = doc.attr(link, "href").unwrap_or("");
            if self.matcher.is_font_stylesheet(href) {
                let url = self.matcher.stylesheet_url(href);
                debug!(%url, "queued font stylesheet link");
                stylesheets.push(url);
                doc.detach(link);
                report.changed = true;
            }
        }

        // Step 2: preconnect hints
        for link in doc.elements_by_tag("link") {
            if self.matcher.is_font_preconnect(doc, link) {
                doc.detach(link);
                report.preconnects_removed += 1;
                report.changed = true;
            }
        }

        // Step 3: @import rules inside <style>
        for style in doc.elements_by_tag("style") {
            let Some(css) = doc.text(style) else {
                continue;
            };
            let imports = self.matcher.font_imports(css);
            if imports.is_empty() {
                continue;
            }
            let stripped = self.matcher.strip_font_imports(css);
            debug!(imports = imports.len(), "queued font stylesheet imports");
            stylesheets.extend(imports);
            doc.set_text(style, &stripped);
            report.changed = true;
        }

        // Step 4: resolve and inline
        if !stylesheets.is_empty() {
            let mut blocks = Vec::new();
            for url in &stylesheets {
                let resolved = self.fonts.resolve(cache, url).await;
                if resolved.fetched {
                    report.stylesheets_resolved += 1;
                } else {
                    report.stylesheets_failed += 1;
                }
                report.fonts_localized += resolved.fonts_localized;
                report.fonts_failed += resolved.fonts_failed;
                if !resolved.css.trim().is_empty() {
                    blocks.push(resolved.css.trim().to_string());
                }
            }

            if !blocks.is_empty() {
                match doc.head() {
                    Some(head) => {
                        let style = doc.create_element("style");
                        doc.set_text(style, &blocks.join("\n\n"));
                        doc.prepend_child(head, style);
                    }
                    None => warn!("document has no <head>, font rules not inserted"),
                }
            }
        }

        // Step 5: images
        for img in doc.elements_by_tag("img") {
            let src = doc.attr(img, "src").unwrap_or("").to_string();
            if !is_remote_url(&src) {
                continue;
            }

            let file_name =
                file_name_from_url(&src).unwrap_or_else(|| self.default_image_name.clone());
            let dest = self.images_dir.join(&file_name);

            match cache.fetch(&src, &dest).await {
                Ok(_) => {
                    doc.set_attr(img, "src", &format!("{}/{file_name}", self.images_ref));
                    report.images_localized += 1;
                    report.changed = true;
                }
                Err(_) => report.images_failed += 1,
            }
        }

        info!(
            changed = report.changed,
            stylesheets = report.stylesheets_resolved,
            fonts = report.fonts_localized,
            images = report.images_localized,
            failures = report.failures(),
            "document localized"
        );

        report
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;
    use crate::http::HttpClient;

    struct Fixture {
        localizer: AssetLocalizer,
        cache: FetchCache,
        root: PathBuf,
    }

    impl Drop for Fixture {
        fn drop(&mut self) {
            let _ = std::fs::remove_dir_all(&self.root);
        }
    }

    fn fixture(server: &wiremock::MockServer) -> Fixture {
        let mut config = AppConfig::default();
        config.fonts.file_host = format!("{}/", server.uri());
        config.fonts.stylesheet_marker = format!("{}/css", server.address());

        let root = std::env::temp_dir().join(format!("offliner-localize-{}", Uuid::now_v7()));
        let dirs = OutputDirs::prepare(&root, &config.output).unwrap();
        let localizer = AssetLocalizer::new(&config, &dirs).unwrap();
        let cache = FetchCache::new(HttpClient::new(&config.fetch).unwrap());

        Fixture {
            localizer,
            cache,
            root,
        }
    }

    async fn mount_ok(server: &wiremock::MockServer, path: &str, body: &str, times: u64) {
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path(path))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_string(body))
            .expect(times)
            .mount(server)
            .await;
    }

    fn font_css(server: &wiremock::MockServer, file: &str) -> String {
        format!(
            "@font-face {{\n  font-family: 'Roboto';\n  src: url({}/s/{file}) format('woff2');\n}}\n",
            server.uri()
        )
    }

    fn srcs(doc: &Document) -> Vec<String> {
        doc.elements_by_tag("img")
            .into_iter()
            .filter_map(|img| doc.attr(img, "src").map(str::to_string))
            .collect()
    }

    #[tokio::test]
    async fn localizes_link_stylesheet_and_image() {
        let server = wiremock::MockServer::start().await;
        mount_ok(&server, "/css2", &font_css(&server, "roboto.woff2"), 1).await;
        mount_ok(&server, "/s/roboto.woff2", "wOF2", 1).await;
        mount_ok(&server, "/pic.jpg", "jpeg", 1).await;

        let mut fx = fixture(&server);
        let mut doc = Document::parse(&format!(
            r#"<!DOCTYPE html><html><head>
<title>Page</title>
<link rel="preconnect" href="https://fonts.googleapis.com">
<link href="{uri}/css2?family=Roboto" rel="stylesheet">
</head><body><img src="{uri}/pic.jpg"></body></html>"#,
            uri = server.uri()
        ));

        let report = fx.localizer.localize(&mut doc, &mut fx.cache).await;

        assert!(report.changed);
        assert_eq!(report.stylesheets_resolved, 1);
        assert_eq!(report.fonts_localized, 1);
        assert_eq!(report.preconnects_removed, 1);
        assert_eq!(report.images_localized, 1);
        assert_eq!(report.failures(), 0);

        assert!(doc.elements_by_tag("link").is_empty());

        let head = doc.head().unwrap();
        let first = doc.children(head)[0];
        assert_eq!(doc.tag_name(first), Some("style"));
        let css = doc.text(first).unwrap();
        assert!(css.starts_with("@font-face"));
        assert!(css.contains("url(fonts/roboto.woff2)"));

        assert_eq!(srcs(&doc), vec!["images/pic.jpg".to_string()]);
        assert!(fx.root.join("fonts").join("roboto.woff2").exists());
        assert!(fx.root.join("images").join("pic.jpg").exists());
    }

    #[tokio::test]
    async fn style_imports_are_stripped_and_resolved() {
        let server = wiremock::MockServer::start().await;
        mount_ok(&server, "/css", &font_css(&server, "lato.woff2"), 1).await;
        mount_ok(&server, "/s/lato.woff2", "wOF2", 1).await;

        let mut fx = fixture(&server);
        let mut doc = Document::parse(&format!(
            r#"<html><head><style>@import url('{uri}/css?family=Lato');
h1 {{ font-family: Lato; }}</style></head><body></body></html>"#,
            uri = server.uri()
        ));

        let report = fx.localizer.localize(&mut doc, &mut fx.cache).await;
        assert!(report.changed);
        assert_eq!(report.stylesheets_resolved, 1);

        let styles = doc.elements_by_tag("style");
        assert_eq!(styles.len(), 2);
        assert!(doc.text(styles[0]).unwrap().contains("url(fonts/lato.woff2)"));

        let original = doc.text(styles[1]).unwrap();
        assert!(!original.contains("@import"));
        assert!(original.contains("h1 { font-family: Lato; }"));
    }

    #[tokio::test]
    async fn shared_font_urls_across_stylesheets_download_once() {
        let server = wiremock::MockServer::start().await;
        mount_ok(&server, "/css2", &font_css(&server, "shared.woff2"), 2).await;
        mount_ok(&server, "/s/shared.woff2", "wOF2", 1).await;

        let mut fx = fixture(&server);
        let mut doc = Document::parse(&format!(
            r#"<html><head>
<link href="{uri}/css2?family=Roboto:wght@400" rel="stylesheet">
<link href="{uri}/css2?family=Roboto:wght@700" rel="stylesheet">
</head><body></body></html>"#,
            uri = server.uri()
        ));

        let report = fx.localizer.localize(&mut doc, &mut fx.cache).await;
        assert_eq!(report.stylesheets_resolved, 2);
        assert_eq!(fx.cache.downloads(), 1);

        let head = doc.head().unwrap();
        let css = doc.text(doc.children(head)[0]).unwrap();
        assert_eq!(css.matches("url(fonts/shared.woff2)").count(), 2);
        assert!(css.contains("}\n\n@font-face"));
    }

    #[tokio::test]
    async fn one_failing_image_does_not_stop_the_others() {
        let server = wiremock::MockServer::start().await;
        mount_ok(&server, "/a.png", "a", 1).await;
        mount_ok(&server, "/c.png", "c", 1).await;
        wiremock::Mock::given(wiremock::matchers::path("/b.png"))
            .respond_with(wiremock::ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let mut fx = fixture(&server);
        let uri = server.uri();
        let mut doc = Document::parse(&format!(
            r#"<html><body><img src="{uri}/a.png"><img src="{uri}/b.png"><img src="{uri}/c.png"></body></html>"#
        ));

        let report = fx.localizer.localize(&mut doc, &mut fx.cache).await;
        assert!(report.changed);
        assert_eq!(report.images_localized, 2);
        assert_eq!(report.images_failed, 1);
        assert_eq!(
            srcs(&doc),
            vec![
                "images/a.png".to_string(),
                format!("{uri}/b.png"),
                "images/c.png".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn repeated_image_url_is_fetched_once() {
        let server = wiremock::MockServer::start().await;
        mount_ok(&server, "/logo.svg", "<svg/>", 1).await;

        let mut fx = fixture(&server);
        let uri = server.uri();
        let mut doc = Document::parse(&format!(
            r#"<html><body><img src="{uri}/logo.svg"><p>x</p><img src="{uri}/logo.svg"></body></html>"#
        ));

        let report = fx.localizer.localize(&mut doc, &mut fx.cache).await;
        assert_eq!(report.images_localized, 2);
        assert_eq!(fx.cache.downloads(), 1);
        assert_eq!(
            srcs(&doc),
            vec!["images/logo.svg".to_string(), "images/logo.svg".to_string()]
        );
    }

    #[tokio::test]
    async fn image_without_path_segment_uses_default_name() {
        let server = wiremock::MockServer::start().await;
        mount_ok(&server, "/", "jpeg", 1).await;

        let mut fx = fixture(&server);
        let mut doc = Document::parse(&format!(
            r#"<html><body><img src="{}/"></body></html>"#,
            server.uri()
        ));

        fx.localizer.localize(&mut doc, &mut fx.cache).await;
        assert_eq!(srcs(&doc), vec!["images/image.jpg".to_string()]);
        assert!(fx.root.join("images").join("image.jpg").exists());
    }

    #[tokio::test]
    async fn failed_stylesheet_still_removes_link() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::path("/css2"))
            .respond_with(wiremock::ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let mut fx = fixture(&server);
        let mut doc = Document::parse(&format!(
            r#"<html><head><link href="{}/css2?family=X" rel="stylesheet"></head><body></body></html>"#,
            server.uri()
        ));

        let report = fx.localizer.localize(&mut doc, &mut fx.cache).await;
        assert!(report.changed);
        assert_eq!(report.stylesheets_failed, 1);
        assert!(doc.elements_by_tag("link").is_empty());
        assert!(doc.elements_by_tag("style").is_empty());
    }

    #[tokio::test]
    async fn already_local_document_is_unchanged() {
        let server = wiremock::MockServer::start().await;
        let mut fx = fixture(&server);

        let source = r#"<html><head><style>@font-face { src: url(fonts/a.woff2); }</style>
<link rel="stylesheet" href="site.css"></head>
<body><img src="images/pic.jpg"><img src="data:image/png;base64,AAAA"></body></html>"#;
        let mut doc = Document::parse(source);
        let before = doc.to_html();

        let report = fx.localizer.localize(&mut doc, &mut fx.cache).await;
        assert_eq!(report, LocalizeReport::default());
        assert_eq!(doc.to_html(), before);
        assert_eq!(fx.cache.downloads(), 0);
    }

    #[tokio::test]
    async fn noscript_fallback_images_are_localized() {
        let server = wiremock::MockServer::start().await;
        mount_ok(&server, "/lazy.jpg", "jpeg", 1).await;
        mount_ok(&server, "/ns.png", "png", 1).await;

        let mut fx = fixture(&server);
        let uri = server.uri();
        let mut doc = Document::parse(&format!(
            r#"<html><body>
<img src="{uri}/lazy.jpg" loading="lazy">
<noscript><img src="{uri}/ns.png" alt="fallback"></noscript>
</body></html>"#
        ));

        let report = fx.localizer.localize(&mut doc, &mut fx.cache).await;
        assert_eq!(report.images_localized, 2);
        assert_eq!(
            srcs(&doc),
            vec!["images/lazy.jpg".to_string(), "images/ns.png".to_string()]
        );
        assert!(
            doc.to_html()
                .contains(r#"<noscript><img src="images/ns.png" alt="fallback"></noscript>"#)
        );
        assert!(fx.root.join("images").join("ns.png").exists());
    }
}
