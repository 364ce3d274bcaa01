//! Catalog sources
//!
//! A source returns the complete zone document or fails; documents are never
//! partially loaded.

use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

use tracing::debug;

use super::model::Zone;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Catalog load failures
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("catalog request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("catalog server returned HTTP {0}")]
    Status(u16),
    #[error("catalog read failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("catalog document is malformed: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Idempotent read of a whole zone document
pub trait CatalogSource: Send + Sync + 'static {
    fn fetch_zone(&self, zone_id: i64) -> impl Future<Output = Result<Zone, CatalogError>> + Send;
}

/// Fetches `{base_url}/data/zone-{id}.json`
#[derive(Debug, Clone)]
pub struct HttpCatalogSource {
    client: reqwest::Client,
    base_url: String,
}

impl HttpCatalogSource {
    pub fn new(base_url: impl Into<String>) -> Result<Self, CatalogError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    pub fn zone_url(&self, zone_id: i64) -> String {
        format!(
            "{}/data/zone-{}.json",
            self.base_url.trim_end_matches('/'),
            zone_id
        )
    }
}

impl CatalogSource for HttpCatalogSource {
    async fn fetch_zone(&self, zone_id: i64) -> Result<Zone, CatalogError> {
        let url = self.zone_url(zone_id);
        debug!("Fetching zone {} from {}", zone_id, url);

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(CatalogError::Status(response.status().as_u16()));
        }
        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

/// Reads `{dir}/zone-{id}.json` from local storage
#[derive(Debug, Clone)]
pub struct DirectoryCatalogSource {
    dir: PathBuf,
}

impl DirectoryCatalogSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn zone_path(&self, zone_id: i64) -> PathBuf {
        self.dir.join(format!("zone-{}.json", zone_id))
    }
}

impl CatalogSource for DirectoryCatalogSource {
    async fn fetch_zone(&self, zone_id: i64) -> Result<Zone, CatalogError> {
        let path = self.zone_path(zone_id);
        debug!("Reading zone {} from {:?}", zone_id, path);

        let content = tokio::fs::read(&path).await?;
        Ok(serde_json::from_slice(&content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zone_url_trims_trailing_slash() {
        let source = HttpCatalogSource::new("https://player.example.com/").unwrap();
        assert_eq!(
            source.zone_url(12),
            "https://player.example.com/data/zone-12.json"
        );
    }

    #[tokio::test]
    async fn test_directory_source_reads_zone() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("zone-3.json"),
            r#"{"contentRevision": "7", "tracks": [{"id": 1, "priority": 2}]}"#,
        )
        .unwrap();

        let source = DirectoryCatalogSource::new(dir.path());
        let zone = source.fetch_zone(3).await.unwrap();
        assert_eq!(zone.content_revision.as_deref(), Some("7"));
        assert_eq!(zone.tracks.len(), 1);
    }

    #[tokio::test]
    async fn test_directory_source_missing_zone() {
        let dir = tempfile::tempdir().unwrap();
        let source = DirectoryCatalogSource::new(dir.path());
        let err = source.fetch_zone(99).await.unwrap_err();
        assert!(matches!(err, CatalogError::Io(_)));
    }

    #[tokio::test]
    async fn test_directory_source_malformed_zone() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("zone-1.json"), "{ not json").unwrap();
        let source = DirectoryCatalogSource::new(dir.path());
        let err = source.fetch_zone(1).await.unwrap_err();
        assert!(matches!(err, CatalogError::Parse(_)));
    }
}
