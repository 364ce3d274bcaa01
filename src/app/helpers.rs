//! Async helper functions for collaborator setup

use std::sync::Arc;

use crate::cache::{CacheError, ContentCache};
use crate::catalog::{
    CatalogError, CatalogSource, DirectoryCatalogSource, HttpCatalogSource, Zone,
};
use crate::settings::{CatalogSourceSettings, StorageSettings};

/// Catalog source chosen by configuration
#[derive(Debug, Clone)]
pub enum ConfiguredCatalog {
    Http(HttpCatalogSource),
    Directory(DirectoryCatalogSource),
}

impl ConfiguredCatalog {
    pub fn from_settings(settings: &CatalogSourceSettings) -> Result<Self, CatalogError> {
        match settings {
            CatalogSourceSettings::Http { base_url } => {
                tracing::info!("Using catalog server at {}", base_url);
                Ok(ConfiguredCatalog::Http(HttpCatalogSource::new(
                    base_url.clone(),
                )?))
            }
            CatalogSourceSettings::Directory { path } => {
                tracing::info!("Using catalog directory {}", path.display());
                Ok(ConfiguredCatalog::Directory(DirectoryCatalogSource::new(
                    path.clone(),
                )))
            }
        }
    }
}

impl CatalogSource for ConfiguredCatalog {
    async fn fetch_zone(&self, zone_id: i64) -> Result<Zone, CatalogError> {
        match self {
            ConfiguredCatalog::Http(source) => source.fetch_zone(zone_id).await,
            ConfiguredCatalog::Directory(source) => source.fetch_zone(zone_id).await,
        }
    }
}

/// Open the content cache, drop interrupted downloads and apply the size limit
pub async fn init_content_cache(
    storage: &StorageSettings,
) -> Result<Arc<ContentCache>, CacheError> {
    let dir = storage.content_dir();
    let max_cache_mb = storage.max_cache_mb;

    tracing::info!("Initializing content cache at: {}", dir.display());
    tokio::task::spawn_blocking(move || {
        let cache = ContentCache::open(dir)?;
        cache.cleanup_temp_files();
        cache.enforce_limit(max_cache_mb);
        Ok(Arc::new(cache))
    })
    .await
    .map_err(|e| CacheError::Io(std::io::Error::other(e)))?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_init_content_cache_removes_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("partial.tmp"), [0u8; 3]).unwrap();

        let storage = StorageSettings {
            cache_dir: Some(dir.path().to_path_buf()),
            ..Default::default()
        };
        let cache = init_content_cache(&storage).await.unwrap();
        assert_eq!(cache.dir(), dir.path());
        assert!(!dir.path().join("partial.tmp").exists());
    }

    #[test]
    fn test_configured_http_catalog() {
        let catalog = ConfiguredCatalog::from_settings(&CatalogSourceSettings::Http {
            base_url: "https://player.example.com".into(),
        })
        .unwrap();
        match catalog {
            ConfiguredCatalog::Http(source) => assert_eq!(
                source.zone_url(4),
                "https://player.example.com/data/zone-4.json"
            ),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_configured_directory_catalog() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("zone-5.json"), r#"{"tracks": []}"#).unwrap();

        let catalog = ConfiguredCatalog::from_settings(&CatalogSourceSettings::Directory {
            path: dir.path().to_path_buf(),
        })
        .unwrap();
        let zone = catalog.fetch_zone(5).await.unwrap();
        assert!(zone.tracks.is_empty());
    }
}
