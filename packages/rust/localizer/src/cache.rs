//! URL-keyed download cache.
//!
//! Each URL is downloaded at most once per run. Failed downloads are not
//! recorded, so a later request for the same URL goes back to the network.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument, warn};

use offliner_shared::{OfflinerError, Result};

use crate::http::HttpClient;

/// Memoizes `url -> local file` for the lifetime of one run.
#[derive(Debug)]
pub struct FetchCache {
    client: HttpClient,
    entries: HashMap<String, PathBuf>,
    downloads: usize,
}

impl FetchCache {
    /// Create an empty cache downloading through `client`.
    pub fn new(client: HttpClient) -> Self {
        Self {
            client,
            entries: HashMap::new(),
            downloads: 0,
        }
    }

    /// The underlying HTTP client (for requests that must bypass the cache).
    pub fn client(&self) -> &HttpClient {
        &self.client
    }

    /// Number of URLs stored so far.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing has been downloaded yet.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of network downloads attempted (cache hits excluded).
    pub fn downloads(&self) -> usize {
        self.downloads
    }

    /// Download `url` into `dest` unless it was already downloaded, and return
    /// the local path holding its bytes.
    ///
    /// On a cache hit `dest` is ignored and the originally stored path returned.
    #[instrument(skip_all, fields(url = %url))]
    pub async fn fetch(&mut self, url: &str, dest: &Path) -> Result<PathBuf> {
        if let Some(path) = self.entries.get(url) {
            debug!(path = %path.display(), "already downloaded");
            return Ok(path.clone());
        }

        info!(url, "downloading");
        self.downloads += 1;

        match self.download(url, dest).await {
            Ok(()) => {
                info!(file = %dest.display(), "saved");
                self.entries.insert(url.to_string(), dest.to_path_buf());
                Ok(dest.to_path_buf())
            }
            Err(e) if e.is_network() => {
                warn!(url, error = %e, "download failed");
                Err(e)
            }
            Err(e) => {
                warn!(url, file = %dest.display(), error = %e, "could not store download");
                Err(e)
            }
        }
    }

    async fn download(&self, url: &str, dest: &Path) -> Result<()> {
        let bytes = self.client.get_bytes(url).await?;

        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent).map_err(|e| OfflinerError::io(parent, e))?;
        }
        std::fs::write(dest, &bytes).map_err(|e| OfflinerError::io(dest, e))
    }
}
