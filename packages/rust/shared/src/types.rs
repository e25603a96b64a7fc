//! Core domain types shared between the localizer and its front ends.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// AssetKind
// ---------------------------------------------------------------------------

/// What a discovered remote reference points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetKind {
    /// A font-service stylesheet (`<link href>` or `@import url(...)`).
    FontStylesheet,
    /// A `rel="preconnect"` hint for the font service.
    Preconnect,
    /// An `<img src>` with an absolute HTTP(S) URL.
    Image,
}

impl std::fmt::Display for AssetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::FontStylesheet => "font stylesheet",
            Self::Preconnect => "preconnect hint",
            Self::Image => "image",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// LocalizeReport
// ---------------------------------------------------------------------------

/// Per-document counters produced by one localization pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalizeReport {
    /// Whether the document tree was mutated at all.
    pub changed: bool,
    /// Font stylesheets whose text was fetched and inlined.
    pub stylesheets_resolved: usize,
    /// Font stylesheets that could not be fetched.
    pub stylesheets_failed: usize,
    /// Distinct font file URLs rewritten to local paths.
    pub fonts_localized: usize,
    /// Font file URLs left remote because their download failed.
    pub fonts_failed: usize,
    /// Preconnect hints removed.
    pub preconnects_removed: usize,
    /// Images rewritten to local paths.
    pub images_localized: usize,
    /// Images left remote because their download failed.
    pub images_failed: usize,
}

impl LocalizeReport {
    /// Total number of assets that stayed remote because of a failure.
    pub fn failures(&self) -> usize {
        self.stylesheets_failed + self.fonts_failed + self.images_failed
    }
}

// ---------------------------------------------------------------------------
// FileOutcome / RunSummary
// ---------------------------------------------------------------------------

/// What happened to one HTML file during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FileOutcome {
    /// The document was rewritten on disk.
    Updated {
        /// A backup was created during this run (false if one already existed).
        backup_created: bool,
        /// Counters from the localization pass.
        report: LocalizeReport,
    },
    /// Nothing to localize; the file was not touched.
    Unchanged,
    /// The file disappeared between listing and processing.
    NotFound,
    /// Reading, parsing or writing the file failed.
    Failed {
        /// Human-readable error.
        error: String,
    },
}

/// Outcome of one file, keyed by its path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileResult {
    /// Path of the HTML document.
    pub path: PathBuf,
    /// What happened to it.
    pub outcome: FileOutcome,
}

/// Summary of a complete run over a folder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    /// Folder that was processed.
    pub folder: PathBuf,
    /// Where font files were stored.
    pub fonts_dir: PathBuf,
    /// Where images were stored.
    pub images_dir: PathBuf,
    /// Per-file outcomes, in processing order.
    pub files: Vec<FileResult>,
    /// Number of network downloads the fetch cache actually performed.
    pub downloads: usize,
}

impl RunSummary {
    /// Files rewritten on disk.
    pub fn updated(&self) -> usize {
        self.count_where(|o| matches!(o, FileOutcome::Updated { .. }))
    }

    /// Files left untouched because nothing needed localizing.
    pub fn unchanged(&self) -> usize {
        self.count_where(|o| matches!(o, FileOutcome::Unchanged))
    }

    /// Files that vanished before they could be processed.
    pub fn not_found(&self) -> usize {
        self.count_where(|o| matches!(o, FileOutcome::NotFound))
    }

    /// Files that could not be read or written.
    pub fn failed(&self) -> usize {
        self.count_where(|o| matches!(o, FileOutcome::Failed { .. }))
    }

    fn count_where(&self, pred: impl Fn(&FileOutcome) -> bool) -> usize {
        self.files.iter().filter(|f| pred(&f.outcome)).count()
    }
}
