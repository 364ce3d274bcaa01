//! ZonePlay - headless digital signage player
//!
//! Loads a zone, selects the content for this screen and keeps it cached and ready,
//! logging what the renderer would show.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use clap::Parser;
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use zoneplay::app::helpers::{ConfiguredCatalog, init_content_cache};
use zoneplay::app::{App, GlobalState, Notification, Runtime, ZoneEvent};
use zoneplay::catalog::parse_wall_clock;
use zoneplay::settings::{CatalogSourceSettings, Settings};
use zoneplay::utils::now_wall_clock;

#[derive(Debug, Parser)]
#[command(name = "zoneplay", version, about = "Headless digital signage player")]
struct Args {
    /// Zone to load
    #[arg(long)]
    zone: Option<i64>,
    /// Site id of this screen
    #[arg(long)]
    site: Option<i64>,
    #[arg(long)]
    brand: Option<String>,
    #[arg(long)]
    model: Option<String>,
    #[arg(long)]
    sku: Option<String>,
    /// Fetch zones from `{url}/data/zone-{id}.json`
    #[arg(long, conflicts_with = "catalog_dir")]
    catalog_url: Option<String>,
    /// Read zones from `{dir}/zone-{id}.json`
    #[arg(long)]
    catalog_dir: Option<PathBuf>,
    /// Reference instant for selection (defaults to now)
    #[arg(long, value_parser = parse_wall_clock)]
    play_at: Option<NaiveDateTime>,
    /// Settings file to use instead of the default location
    #[arg(long)]
    settings: Option<PathBuf>,
    /// Load the zone without selecting a track
    #[arg(long)]
    no_auto_select: bool,
    /// Exit once the first selection settles
    #[arg(long)]
    once: bool,
}

impl Args {
    fn apply(&self, settings: &mut Settings) {
        if let Some(zone) = self.zone {
            settings.catalog.zone_id = Some(zone);
        }
        if let Some(base_url) = &self.catalog_url {
            settings.catalog.source = CatalogSourceSettings::Http {
                base_url: base_url.clone(),
            };
        }
        if let Some(path) = &self.catalog_dir {
            settings.catalog.source = CatalogSourceSettings::Directory { path: path.clone() };
        }
        if self.no_auto_select {
            settings.catalog.auto_select = false;
        }

        let filter = &mut settings.filter;
        if self.site.is_some() {
            filter.site_id = self.site;
        }
        if self.brand.is_some() {
            filter.brand = self.brand.clone();
        }
        if self.model.is_some() {
            filter.model = self.model.clone();
        }
        if self.sku.is_some() {
            filter.sku = self.sku.clone();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "zoneplay=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let mut settings = match &args.settings {
        Some(path) => Settings::load_from_file(path)
            .with_context(|| format!("Failed to load settings from {}", path.display()))?,
        None => Settings::load(),
    };
    args.apply(&mut settings);

    let zone_id = settings
        .catalog
        .zone_id
        .context("No zone configured; pass --zone or set catalog.zone_id")?;

    let catalog = Arc::new(
        ConfiguredCatalog::from_settings(&settings.catalog.source)
            .context("Failed to set up catalog source")?,
    );
    let cache = init_content_cache(&settings.storage)
        .await
        .context("Failed to open content cache")?;

    let play_at = args.play_at.unwrap_or_else(now_wall_clock);
    let mut app = App::new(settings.filter.clone(), play_at);
    app.global = GlobalState::new(settings.display.live_video_mode);

    let (runtime, handle) = Runtime::with_app(app, catalog, cache);
    let mut notifications = handle.subscribe();
    let runtime = tokio::spawn(runtime.run());

    handle.send(ZoneEvent::Load {
        zone_id,
        auto_select: settings.catalog.auto_select,
    });

    loop {
        tokio::select! {
            received = notifications.recv() => {
                let notification = match received {
                    Ok(notification) => notification,
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!("Missed {} notifications", skipped);
                        continue;
                    }
                    Err(RecvError::Closed) => break,
                };

                match &notification {
                    Notification::TrackReady { track_id } => {
                        let state = handle.track_state();
                        tracing::info!(
                            "Now showing track {} with {} items",
                            track_id,
                            state.loaded_items.len()
                        );
                        for item in &state.loaded_items {
                            tracing::info!("  {}", item.url.as_deref().unwrap_or("<no url>"));
                        }
                    }
                    Notification::ZoneLoadFailed { zone_id, reason } if args.once => {
                        anyhow::bail!("Zone {} failed to load: {}", zone_id, reason);
                    }
                    other => tracing::info!("{:?}", other),
                }

                let settled = match notification {
                    Notification::TrackReady { .. } | Notification::NoTrackSelected => true,
                    Notification::ZoneLoaded { .. } => !settings.catalog.auto_select,
                    _ => false,
                };
                if args.once && settled {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted, shutting down");
                break;
            }
        }
    }

    drop(handle);
    runtime.abort();
    Ok(())
}
