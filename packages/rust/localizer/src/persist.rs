//! Writing localized documents back to disk.
//!
//! Before the first rewrite of a document its pristine bytes are moved to a
//! sibling backup (`page.html` -> `page.html.bak`). An existing backup is never
//! replaced, so it keeps holding the true original across repeated runs.

use std::path::{Path, PathBuf};

use tracing::{info, instrument};

use offliner_markup::Document;
use offliner_shared::{OfflinerError, OutputConfig, Result};

/// What [`persist`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistOutcome {
    /// The document had no changes; nothing was written.
    Unchanged,
    /// The document was rewritten.
    Written {
        /// Whether this call created the backup.
        backup_created: bool,
    },
}

/// Backup location for a document: the file name with `.{suffix}` appended.
pub fn backup_path(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".");
    name.push(suffix);
    path.with_file_name(name)
}

/// Write `doc` to `path` if `changed`, backing up the original first.
///
/// The rename and the write are not atomic together: if the write fails after
/// the rename, the original survives only as the backup.
#[instrument(skip_all, fields(path = %path.display()))]
pub fn persist(
    path: &Path,
    doc: &Document,
    changed: bool,
    output: &OutputConfig,
) -> Result<PersistOutcome> {
    if !changed {
        info!("no changes needed");
        return Ok(PersistOutcome::Unchanged);
    }

    let markup = if output.pretty {
        doc.to_pretty_html().map_err(|e| OfflinerError::io(path, e))?
    } else {
        doc.to_html()
    };

    let backup = backup_path(path, &output.backup_suffix);
    let backup_created = if backup.exists() {
        false
    } else {
        std::fs::rename(path, &backup).map_err(|e| OfflinerError::io(path, e))?;
        info!(backup = %backup.display(), "backup created");
        true
    };

    std::fs::write(path, markup).map_err(|e| OfflinerError::io(path, e))?;
    info!("document updated");

    Ok(PersistOutcome::Written { backup_created })
}
