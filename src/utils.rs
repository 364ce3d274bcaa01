//! Utility functions

use std::path::PathBuf;

use chrono::NaiveDateTime;

/// Media extensions kept on cached files so the renderer can sniff them
pub const MEDIA_EXTENSIONS: &[&str] = &["mp4", "webm", "mov", "m4v", "mkv", "jpg", "png", "webp"];

/// Get the base cache directory for zoneplay
pub fn cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("zoneplay")
}

/// Get the downloaded content directory
pub fn content_cache_dir() -> PathBuf {
    cache_dir().join("content")
}

/// Stable cache key for a content URL
pub fn url_key(url: &str) -> String {
    format!("{:016x}", xxhash_rust::xxh3::xxh3_64(url.as_bytes()))
}

/// Extract a known media extension from a URL path
///
/// # Example
/// ```
/// use zoneplay::utils::extension_from_url;
/// let ext = extension_from_url("https://cdn.example.com/a/clip.MP4?sig=1");
/// assert_eq!(ext, Some("mp4".to_string()));
/// ```
pub fn extension_from_url(url: &str) -> Option<String> {
    let parsed = reqwest::Url::parse(url).ok()?;
    let filename = parsed.path().rsplit('/').next()?;
    let (_, ext) = filename.rsplit_once('.')?;
    let ext = ext.to_lowercase();

    MEDIA_EXTENSIONS.contains(&ext.as_str()).then_some(ext)
}

/// Current local wall-clock time, the reference frame of catalog periods and hours
pub fn now_wall_clock() -> NaiveDateTime {
    chrono::Local::now().naive_local()
}
