//! Folder-level run: list documents, localize each in turn, persist, summarise.
//!
//! Documents are processed strictly one after another and share one
//! [`FetchCache`], so an asset referenced by several pages is downloaded once.

use std::path::{Path, PathBuf};

use tracing::{info, instrument, warn};

use offliner_markup::Document;
use offliner_shared::{
    AppConfig, FileOutcome, FileResult, FontServiceConfig, OfflinerError, OutputConfig, Result,
    RunSummary,
};

use crate::cache::FetchCache;
use crate::http::HttpClient;
use crate::localize::AssetLocalizer;
use crate::persist::{PersistOutcome, persist};
use crate::scan::{AssetMatcher, AssetReference};

// ---------------------------------------------------------------------------
// Output folders
// ---------------------------------------------------------------------------

/// The `fonts/` and `images/` folders of a run.
#[derive(Debug, Clone)]
pub struct OutputDirs {
    /// Absolute or folder-relative path of the fonts folder.
    pub fonts: PathBuf,
    /// Absolute or folder-relative path of the images folder.
    pub images: PathBuf,
}

impl OutputDirs {
    /// Create (or reuse) the output folders under `folder`.
    pub fn prepare(folder: &Path, output: &OutputConfig) -> Result<Self> {
        let fonts = folder.join(&output.fonts_dir);
        let images = folder.join(&output.images_dir);
        for dir in [&fonts, &images] {
            std::fs::create_dir_all(dir).map_err(|e| OfflinerError::io(dir, e))?;
        }
        Ok(Self { fonts, images })
    }
}

// ---------------------------------------------------------------------------
// Document discovery
// ---------------------------------------------------------------------------

/// `*.html` files directly inside `folder` (not recursive), sorted by name.
pub fn discover_html_files(folder: &Path) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(folder).map_err(|e| OfflinerError::io(folder, e))?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| OfflinerError::io(folder, e))?;
        let path = entry.path();
        let is_html = path.extension().is_some_and(|ext| ext == "html");
        if is_html && path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// List the remote references of a document without changing anything on disk.
pub fn scan_file(path: &Path, fonts: &FontServiceConfig) -> Result<Vec<AssetReference>> {
    let source = std::fs::read_to_string(path).map_err(|e| OfflinerError::io(path, e))?;
    let doc = Document::parse(&source);
    Ok(AssetMatcher::new(fonts)?.scan(&doc))
}

// ---------------------------------------------------------------------------
// Progress reporting
// ---------------------------------------------------------------------------

/// Progress callback for reporting run status.
pub trait ProgressReporter: Send + Sync {
    /// Called before a document is processed.
    fn file_started(&self, path: &Path, current: usize, total: usize);
    /// Called once a document has an outcome.
    fn file_finished(&self, path: &Path, outcome: &FileOutcome);
    /// Called when the run completes.
    fn done(&self, summary: &RunSummary);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn file_started(&self, _path: &Path, _current: usize, _total: usize) {}
    fn file_finished(&self, _path: &Path, _outcome: &FileOutcome) {}
    fn done(&self, _summary: &RunSummary) {}
}

// ---------------------------------------------------------------------------
// Runner
// ---------------------------------------------------------------------------

/// Owns everything that lives for one run over one folder.
#[derive(Debug)]
pub struct Runner {
    folder: PathBuf,
    output: OutputConfig,
    dirs: OutputDirs,
    localizer: AssetLocalizer,
    cache: FetchCache,
}

impl Runner {
    /// Validate the config, check the folder exists, and prepare the output folders.
    pub fn new(folder: impl Into<PathBuf>, config: &AppConfig) -> Result<Self> {
        let folder = folder.into();
        config.validate()?;

        if !folder.is_dir() {
            return Err(OfflinerError::validation(format!(
                "folder not found: {}",
                folder.display()
            )));
        }

        let dirs = OutputDirs::prepare(&folder, &config.output)?;
        let localizer = AssetLocalizer::new(config, &dirs)?;
        let cache = FetchCache::new(HttpClient::new(&config.fetch)?);

        Ok(Self {
            folder,
            output: config.output.clone(),
            dirs,
            localizer,
            cache,
        })
    }

    /// Localize and persist one document. Never fails; errors become outcomes.
    #[instrument(skip_all, fields(path = %path.display()))]
    pub async fn process_file(&mut self, path: &Path) -> FileOutcome {
        if !path.exists() {
            warn!("file not found");
            return FileOutcome::NotFound;
        }

        let source = match std::fs::read_to_string(path) {
            Ok(source) => source,
            Err(e) => {
                let err = OfflinerError::io(path, e);
                warn!(error = %err, "failed to read document");
                return FileOutcome::Failed {
                    error: err.to_string(),
                };
            }
        };

        let mut doc = Document::parse(&source);
        let report = self.localizer.localize(&mut doc, &mut self.cache).await;

        match persist(path, &doc, report.changed, &self.output) {
            Ok(PersistOutcome::Unchanged) => FileOutcome::Unchanged,
            Ok(PersistOutcome::Written { backup_created }) => FileOutcome::Updated {
                backup_created,
                report,
            },
            Err(e) => {
                warn!(error = %e, "failed to write document");
                FileOutcome::Failed {
                    error: e.to_string(),
                }
            }
        }
    }

    /// Process `files` in order and summarise.
    #[instrument(skip_all, fields(folder = %self.folder.display(), files = files.len()))]
    pub async fn run(&mut self, files: &[PathBuf], progress: &dyn ProgressReporter) -> RunSummary {
        let mut results = Vec::with_capacity(files.len());

        for (i, path) in files.iter().enumerate() {
            progress.file_started(path, i + 1, files.len());
            let outcome = self.process_file(path).await;
            progress.file_finished(path, &outcome);
            results.push(FileResult {
                path: path.clone(),
                outcome,
            });
        }

        let summary = RunSummary {
            folder: self.folder.clone(),
            fonts_dir: self.dirs.fonts.clone(),
            images_dir: self.dirs.images.clone(),
            files: results,
            downloads: self.cache.downloads(),
        };

        info!(
            updated = summary.updated(),
            unchanged = summary.unchanged(),
            downloads = summary.downloads,
            stored = self.cache.len(),
            "run completed"
        );
        progress.done(&summary);

        summary
    }
}
