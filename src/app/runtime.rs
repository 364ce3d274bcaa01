//! Single-writer dispatch loop
//!
//! Owns the [`App`] and applies messages one at a time in arrival order. Catalog
//! fetches and content downloads run as spawned tasks that report back through the
//! same queue, so no two transitions ever interleave.
//!
//! Observers get two feeds from a [`PlayerHandle`]:
//! - the latest lifecycle snapshot through a `watch` channel, replaced atomically
//! - notifications through a `broadcast` channel

use std::sync::Arc;

use chrono::NaiveDateTime;
use tokio::sync::{broadcast, mpsc, watch};
use tracing::{debug, info, warn};

use super::message::{Command, Message, Notification, TrackEvent, ZoneEvent};
use super::state::{App, ProgressInfo};
use super::update::track_lifecycle::{RequestId, TrackState};
use crate::cache::ContentStore;
use crate::catalog::{CatalogSource, PlaylistItem};
use crate::selection::ZoneTrackFilter;

const NOTIFICATION_CAPACITY: usize = 64;

/// Cloneable handle for feeding and observing a running [`Runtime`]
#[derive(Debug, Clone)]
pub struct PlayerHandle {
    tx: mpsc::UnboundedSender<Message>,
    snapshots: watch::Receiver<Arc<TrackState>>,
    notifications: broadcast::Sender<Notification>,
}

impl PlayerHandle {
    /// Queue a message; returns false once the runtime has stopped
    pub fn send(&self, message: impl Into<Message>) -> bool {
        self.tx.send(message.into()).is_ok()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.notifications.subscribe()
    }

    /// Latest published lifecycle snapshot
    pub fn track_state(&self) -> Arc<TrackState> {
        self.snapshots.borrow().clone()
    }

    pub fn watch(&self) -> watch::Receiver<Arc<TrackState>> {
        self.snapshots.clone()
    }
}

pub struct Runtime<S, C> {
    app: App,
    source: Arc<S>,
    store: Arc<C>,
    rx: mpsc::UnboundedReceiver<Message>,
    /// Weak so the loop ends once every handle and in-flight task is gone
    tx: mpsc::WeakUnboundedSender<Message>,
    snapshots: watch::Sender<Arc<TrackState>>,
    notifications: broadcast::Sender<Notification>,
}

impl<S: CatalogSource, C: ContentStore> Runtime<S, C> {
    pub fn new(
        filter: ZoneTrackFilter,
        play_at: NaiveDateTime,
        source: Arc<S>,
        store: Arc<C>,
    ) -> (Self, PlayerHandle) {
        Self::with_app(App::new(filter, play_at), source, store)
    }

    pub fn with_app(app: App, source: Arc<S>, store: Arc<C>) -> (Self, PlayerHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let (snapshot_tx, snapshot_rx) = watch::channel(app.track.clone());
        let (notifications, _) = broadcast::channel(NOTIFICATION_CAPACITY);

        let handle = PlayerHandle {
            tx: tx.clone(),
            snapshots: snapshot_rx,
            notifications: notifications.clone(),
        };
        let runtime = Self {
            app,
            source,
            store,
            rx,
            tx: tx.downgrade(),
            snapshots: snapshot_tx,
            notifications,
        };
        (runtime, handle)
    }

    pub fn app(&self) -> &App {
        &self.app
    }

    /// Process messages until every sender is dropped
    pub async fn run(mut self) -> App {
        info!("Player runtime started");
        while let Some(message) = self.rx.recv().await {
            self.process(message);
        }
        info!("Player runtime stopped");
        self.app
    }

    fn process(&mut self, message: Message) {
        let commands = self.app.dispatch(message);

        let published = self.snapshots.borrow().clone();
        if !Arc::ptr_eq(&self.app.track, &published) {
            self.snapshots.send_replace(self.app.track.clone());
        }

        for command in commands {
            self.execute(command);
        }
    }

    fn execute(&self, command: Command) {
        match command {
            Command::Notify(notification) => {
                debug!("Notify {:?}", notification);
                // No subscribers is fine
                let _ = self.notifications.send(notification);
            }
            Command::FetchZone {
                zone_id,
                auto_select,
            } => {
                let Some(tx) = self.tx.upgrade() else {
                    return;
                };
                let source = self.source.clone();
                tokio::spawn(async move {
                    let message = match source.fetch_zone(zone_id).await {
                        Ok(zone) => ZoneEvent::LoadSuccess {
                            zone_id,
                            zone: Arc::new(zone),
                            auto_select,
                        },
                        Err(e) => ZoneEvent::LoadError {
                            zone_id,
                            reason: e.to_string(),
                        },
                    };
                    let _ = tx.send(message.into());
                });
            }
            Command::DownloadTrack {
                request_id,
                track_name,
                items,
            } => {
                let Some(tx) = self.tx.upgrade() else {
                    return;
                };
                let store = self.store.clone();
                tokio::spawn(download_track(store, tx, request_id, track_name, items));
            }
        }
    }
}

/// Cache every item of a request, reporting progress and the items that made it
async fn download_track<C: ContentStore>(
    store: Arc<C>,
    tx: mpsc::UnboundedSender<Message>,
    request_id: RequestId,
    track_name: String,
    items: Vec<PlaylistItem>,
) {
    let _ = tx.send(TrackEvent::Downloading(request_id).into());

    let total = items.len();
    let mut loaded_items = Vec::with_capacity(total);
    for (index, item) in items.into_iter().enumerate() {
        let progress = ProgressInfo {
            progress: Some((index * 100 / total) as i32),
            title: Some(track_name.clone()),
            subtitle: Some(format!("{}/{}", index + 1, total)),
            message: Some("Downloading content".to_string()),
        };
        let _ = tx.send(
            TrackEvent::DownloadProgress {
                request_id,
                progress,
            }
            .into(),
        );

        let Some(url) = item.cdn_url() else {
            warn!("Skipping item {} of {} without a URL", index, track_name);
            continue;
        };
        match store.ensure_cached(&url).await {
            Ok(path) => {
                debug!("Item {} of request {} at {:?}", index, request_id, path);
                loaded_items.push(item);
            }
            Err(e) => warn!("Failed to cache {} for request {}: {}", url, request_id, e),
        }
    }

    info!(
        "Request {} downloaded {}/{} items",
        request_id,
        loaded_items.len(),
        total
    );
    let _ = tx.send(
        TrackEvent::DownloadCompleted {
            request_id,
            loaded_items,
        }
        .into(),
    );
}
