//! Application messages and effects

use std::sync::Arc;

use chrono::NaiveDateTime;

use crate::app::state::{LiveVideoMode, ProgressInfo};
use crate::app::update::track_lifecycle::RequestId;
use crate::catalog::{Playlist, PlaylistItem, Track, Zone};
use crate::selection::ZoneTrackFilter;

/// Application messages
#[derive(Debug, Clone)]
pub enum Message {
    Zone(ZoneEvent),
    Track(TrackEvent),
    Global(GlobalEvent),
}

// ============ Zone ============

#[derive(Debug, Clone)]
pub enum ZoneEvent {
    /// Begin loading a zone from the catalog source
    Load { zone_id: i64, auto_select: bool },
    /// Catalog fetch finished
    LoadSuccess {
        zone_id: i64,
        zone: Arc<Zone>,
        auto_select: bool,
    },
    /// Catalog fetch failed
    LoadError { zone_id: i64, reason: String },
    /// Replace the attribute filter wholesale
    SetFilter(ZoneTrackFilter),
    /// Move the reference instant used for selection
    UpdatePlayAt(NaiveDateTime),
    /// Re-run priority selection against the loaded zone
    SelectPriorityTrack,
}

// ============ Track ============

#[derive(Debug, Clone)]
pub enum TrackEvent {
    /// Start a new cycle for `track`, superseding any cycle in flight
    ChangeRequest {
        track: Arc<Track>,
        play_at: NaiveDateTime,
    },
    /// Content download started for a request
    Downloading(RequestId),
    /// Content download advanced for a request
    DownloadProgress {
        request_id: RequestId,
        progress: ProgressInfo,
    },
    /// Content download finished for a request
    DownloadCompleted {
        request_id: RequestId,
        loaded_items: Vec<PlaylistItem>,
    },
    /// Promote the requested track to current
    ReadyRequest,
    /// Acknowledges a ready request that arrived while already ready
    ReadyResponse,
    /// Renderer reports the playlist it is playing
    PlaylistChange(Option<Playlist>),
    /// Renderer reports the item it is playing
    PlaylistItemChange {
        item: Option<PlaylistItem>,
        seek_seconds: f64,
        index: usize,
    },
    PauseRequest,
    ResumeRequest,
    ShowDetails,
    HideDetails,
    ShowPreviewItem(Option<PlaylistItem>),
    HidePreviewItem,
}

// ============ Global ============

#[derive(Debug, Clone)]
pub enum GlobalEvent {
    SetActive,
    SetInactive,
    SetLiveVideoMode(LiveVideoMode),
    /// Progress of a long-running operation; `None` clears it
    ReportProgress(Option<ProgressInfo>),
}

impl From<ZoneEvent> for Message {
    fn from(event: ZoneEvent) -> Self {
        Message::Zone(event)
    }
}

impl From<TrackEvent> for Message {
    fn from(event: TrackEvent) -> Self {
        Message::Track(event)
    }
}

impl From<GlobalEvent> for Message {
    fn from(event: GlobalEvent) -> Self {
        Message::Global(event)
    }
}

/// Follow-up work produced by an update
#[derive(Debug, Clone)]
pub enum Effect {
    /// Message to apply after the current one, in the same dispatch
    Dispatch(Message),
    /// Fetch a zone document from the catalog source
    FetchZone { zone_id: i64, auto_select: bool },
    /// Download the playable items of a requested track
    DownloadTrack {
        request_id: RequestId,
        track_name: String,
        items: Vec<PlaylistItem>,
    },
    /// Publish to subscribers
    Notify(Notification),
}

impl Effect {
    pub fn dispatch(message: impl Into<Message>) -> Self {
        Effect::Dispatch(message.into())
    }

    /// Split an effect into a follow-up message or work for the runtime
    pub fn into_command(self) -> Result<Command, Message> {
        match self {
            Effect::Dispatch(message) => Err(message),
            Effect::FetchZone {
                zone_id,
                auto_select,
            } => Ok(Command::FetchZone {
                zone_id,
                auto_select,
            }),
            Effect::DownloadTrack {
                request_id,
                track_name,
                items,
            } => Ok(Command::DownloadTrack {
                request_id,
                track_name,
                items,
            }),
            Effect::Notify(notification) => Ok(Command::Notify(notification)),
        }
    }
}

/// Work left for the runtime once a dispatch has settled
#[derive(Debug, Clone)]
pub enum Command {
    FetchZone {
        zone_id: i64,
        auto_select: bool,
    },
    DownloadTrack {
        request_id: RequestId,
        track_name: String,
        items: Vec<PlaylistItem>,
    },
    Notify(Notification),
}

/// Signals published to the renderer and other subscribers
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    ZoneLoaded {
        zone_id: i64,
        content_revision: Option<String>,
    },
    ZoneLoadFailed {
        zone_id: i64,
        reason: String,
    },
    /// A zone loaded or re-selection ran but no track qualified
    NoTrackSelected,
    /// The requested track became current
    TrackReady { track_id: i64 },
    /// A ready request arrived while the track was already ready
    ReadyAcknowledged,
    Pause,
    Resume,
}
