//! Content cache
//!
//! Downloads playable items into a local directory, one file per URL named by the
//! URL's hash. An `index.json` alongside the files maps URLs back to files so the
//! cache can be listed and pruned across restarts. Handles size calculation,
//! cleanup, and eviction of the oldest files.

use std::collections::HashMap;
use std::fs;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use futures_util::StreamExt;
use parking_lot::Mutex;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::utils::{extension_from_url, url_key};

const INDEX_FILE: &str = "index.json";
const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

/// Boundary used by the runtime to make a playable item available locally
pub trait ContentStore: Send + Sync + 'static {
    /// Return the local path of `url`, downloading it first if needed
    fn ensure_cached(&self, url: &str) -> impl Future<Output = Result<PathBuf, CacheError>> + Send;
}

/// Information about a cached file
#[derive(Debug)]
struct CacheEntry {
    path: PathBuf,
    size: u64,
    modified: SystemTime,
}

/// Cache statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Total size in bytes
    pub total_bytes: u64,
    /// Number of files
    pub file_count: usize,
}

impl CacheStats {
    /// Get total size in megabytes
    pub fn total_mb(&self) -> u64 {
        self.total_bytes / (1024 * 1024)
    }
}

/// Result of a cache clear operation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClearResult {
    pub files_deleted: usize,
    pub bytes_freed: u64,
    pub errors: usize,
}

impl ClearResult {
    /// Get bytes freed in megabytes
    pub fn mb_freed(&self) -> u64 {
        self.bytes_freed / (1024 * 1024)
    }
}

/// Cache operation errors
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("cache IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("content download failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("content server returned HTTP {0}")]
    Status(u16),
}

/// File-backed content cache
pub struct ContentCache {
    dir: PathBuf,
    client: reqwest::Client,
    /// URL -> file name within `dir`
    index: Mutex<HashMap<String, String>>,
    /// One lock per URL being downloaded; callers share its `.tmp` path
    in_flight: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl ContentCache {
    /// Open (creating if needed) the cache rooted at `dir`
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, CacheError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;

        let index = load_index(&dir);
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()?;

        debug!("Opened content cache at {:?} with {} entries", dir, index.len());
        Ok(Self {
            dir,
            client,
            index: Mutex::new(index),
            in_flight: Mutex::new(HashMap::new()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Location a URL is stored at, whether or not it has been downloaded
    pub fn path_for(&self, url: &str) -> PathBuf {
        let ext = extension_from_url(url).unwrap_or_else(|| "bin".to_string());
        self.dir.join(format!("{}.{}", url_key(url), ext))
    }

    pub fn is_cached(&self, url: &str) -> bool {
        self.index.lock().contains_key(url) && self.path_for(url).is_file()
    }

    /// Download `url` unless it is already cached
    ///
    /// The body is streamed into a `.tmp` sibling and renamed into place once
    /// complete, so a partially written file is never reported as cached.
    /// Concurrent calls for the same URL wait for the first one and reuse its file.
    pub async fn download_if_missing(&self, url: &str) -> Result<PathBuf, CacheError> {
        let path = self.path_for(url);
        if self.is_cached(url) {
            debug!("Cache hit for {}", url);
            return Ok(path);
        }

        let slot = self
            .in_flight
            .lock()
            .entry(url.to_string())
            .or_default()
            .clone();
        let result = {
            let _guard = slot.lock().await;
            self.fetch_into(url, path).await
        };

        let mut in_flight = self.in_flight.lock();
        // Map plus this caller: nobody else is waiting
        if Arc::strong_count(&slot) <= 2 {
            in_flight.remove(url);
        }
        result
    }

    async fn fetch_into(&self, url: &str, path: PathBuf) -> Result<PathBuf, CacheError> {
        if self.is_cached(url) {
            debug!("{} was cached by a concurrent download", url);
            return Ok(path);
        }

        let temp_path = path.with_extension("tmp");
        if let Err(e) = self.stream_to(url, &temp_path).await {
            warn!("Download of {} failed: {}", url, e);
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(e);
        }

        tokio::fs::rename(&temp_path, &path).await?;
        self.commit(url, &path)?;
        info!("Cached {} as {:?}", url, path.file_name().unwrap_or_default());
        Ok(path)
    }

    async fn stream_to(&self, url: &str, temp_path: &Path) -> Result<(), CacheError> {
        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(CacheError::Status(response.status().as_u16()));
        }

        let mut file = tokio::fs::File::create(temp_path).await?;
        let mut stream = response.bytes_stream();
        let mut downloaded: u64 = 0;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            downloaded += chunk.len() as u64;
        }
        file.flush().await?;

        debug!("Downloaded {} bytes from {}", downloaded, url);
        Ok(())
    }

    /// Record a file that is already in place under the cache directory
    pub(crate) fn commit(&self, url: &str, path: &Path) -> Result<(), CacheError> {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            return Ok(());
        };
        let mut index = self.index.lock();
        index.insert(url.to_string(), name.to_string());
        save_index(&self.dir, &index)
    }

    /// URLs currently present in the cache
    pub fn downloaded_urls(&self) -> Vec<String> {
        let index = self.index.lock();
        let mut urls: Vec<String> = index
            .iter()
            .filter(|(_, name)| self.dir.join(name).is_file())
            .map(|(url, _)| url.clone())
            .collect();
        urls.sort();
        urls
    }

    /// Remove a URL from the cache, returning whether anything was deleted
    pub fn delete(&self, url: &str) -> Result<bool, CacheError> {
        let mut index = self.index.lock();
        let Some(name) = index.remove(url) else {
            return Ok(false);
        };
        save_index(&self.dir, &index)?;

        match fs::remove_file(self.dir.join(&name)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Calculate cache statistics
    pub fn stats(&self) -> CacheStats {
        let entries = collect_entries(&self.dir);
        CacheStats {
            total_bytes: entries.iter().map(|e| e.size).sum(),
            file_count: entries.len(),
        }
    }

    /// Enforce cache size limit by deleting oldest files
    pub fn enforce_limit(&self, max_cache_mb: u64) -> ClearResult {
        let max_bytes = max_cache_mb * 1024 * 1024;
        let mut result = ClearResult::default();

        let mut entries = collect_entries(&self.dir);
        let current_size: u64 = entries.iter().map(|e| e.size).sum();

        if current_size <= max_bytes {
            info!(
                "Cache size {} MB is within limit {} MB",
                current_size / (1024 * 1024),
                max_cache_mb
            );
            return result;
        }

        // Sort by modification time (oldest first)
        entries.sort_by(|a, b| a.modified.cmp(&b.modified));

        let target_free = current_size - max_bytes;
        for entry in entries {
            if result.bytes_freed >= target_free {
                break;
            }
            self.remove_entry(&entry, &mut result);
        }
        self.prune_index();

        info!(
            "Cache cleanup: {} files deleted, {} MB freed (target was {} MB)",
            result.files_deleted,
            result.mb_freed(),
            target_free / (1024 * 1024)
        );
        result
    }

    /// Clear all cached content
    pub fn clear(&self) -> ClearResult {
        let mut result = ClearResult::default();
        for entry in collect_entries(&self.dir) {
            self.remove_entry(&entry, &mut result);
        }
        self.prune_index();

        info!(
            "Cache cleared: {} files deleted, {} MB freed, {} errors",
            result.files_deleted,
            result.mb_freed(),
            result.errors
        );
        result
    }

    /// Clean up orphan .tmp files from incomplete downloads
    ///
    /// Called at startup to remove temp files left behind by interrupted downloads.
    pub fn cleanup_temp_files(&self) -> ClearResult {
        let mut result = ClearResult::default();

        let read_dir = match fs::read_dir(&self.dir) {
            Ok(rd) => rd,
            Err(e) => {
                warn!("Failed to read cache directory {:?}: {}", self.dir, e);
                return result;
            }
        };

        for entry in read_dir.flatten() {
            let path = entry.path();
            if !path.is_file() || path.extension().is_none_or(|e| e != "tmp") {
                continue;
            }

            let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
            match fs::remove_file(&path) {
                Ok(()) => {
                    info!("Cleaned up orphan temp file: {:?} ({} bytes)", path, size);
                    result.files_deleted += 1;
                    result.bytes_freed += size;
                }
                Err(e) => {
                    warn!("Failed to delete temp file {:?}: {}", path, e);
                    result.errors += 1;
                }
            }
        }

        if result.files_deleted > 0 {
            info!(
                "Temp file cleanup: {} files deleted, {} bytes freed",
                result.files_deleted, result.bytes_freed
            );
        }
        result
    }

    fn remove_entry(&self, entry: &CacheEntry, result: &mut ClearResult) {
        match fs::remove_file(&entry.path) {
            Ok(()) => {
                result.files_deleted += 1;
                result.bytes_freed += entry.size;
            }
            Err(e) => {
                warn!("Failed to delete cache file {:?}: {}", entry.path, e);
                result.errors += 1;
            }
        }
    }

    /// Drop index entries whose files are gone
    fn prune_index(&self) {
        let mut index = self.index.lock();
        index.retain(|_, name| self.dir.join(name).is_file());
        if let Err(e) = save_index(&self.dir, &index) {
            warn!("Failed to save cache index: {}", e);
        }
    }
}

impl ContentStore for ContentCache {
    async fn ensure_cached(&self, url: &str) -> Result<PathBuf, CacheError> {
        self.download_if_missing(url).await
    }
}

/// Collect cached content files, skipping the index and temp files
fn collect_entries(dir: &Path) -> Vec<CacheEntry> {
    let mut entries = Vec::new();

    let read_dir = match fs::read_dir(dir) {
        Ok(rd) => rd,
        Err(e) => {
            warn!("Failed to read cache directory {:?}: {}", dir, e);
            return entries;
        }
    };

    for entry in read_dir.flatten() {
        let path = entry.path();
        if !path.is_file()
            || path.file_name().is_some_and(|n| n == INDEX_FILE)
            || path.extension().is_some_and(|e| e == "tmp")
        {
            continue;
        }

        let Ok(metadata) = entry.metadata() else {
            continue;
        };

        entries.push(CacheEntry {
            path,
            size: metadata.len(),
            modified: metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH),
        });
    }

    entries
}

fn load_index(dir: &Path) -> HashMap<String, String> {
    let path = dir.join(INDEX_FILE);
    let content = match fs::read_to_string(&path) {
        Ok(content) => content,
        Err(_) => return HashMap::new(),
    };

    match serde_json::from_str::<HashMap<String, String>>(&content) {
        Ok(mut index) => {
            index.retain(|_, name| dir.join(name).is_file());
            index
        }
        Err(e) => {
            warn!("Ignoring unreadable cache index {:?}: {}", path, e);
            HashMap::new()
        }
    }
}

fn save_index(dir: &Path, index: &HashMap<String, String>) -> Result<(), CacheError> {
    let content = serde_json::to_vec_pretty(index).map_err(std::io::Error::other)?;
    let temp_path = dir.join(format!("{}.tmp", INDEX_FILE));
    fs::write(&temp_path, content)?;
    fs::rename(&temp_path, dir.join(INDEX_FILE))?;
    Ok(())
}
