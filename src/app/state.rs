//! Application state definitions

use std::sync::Arc;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::app::update::track_lifecycle::TrackState;
use crate::catalog::Zone;
use crate::selection::ZoneTrackFilter;

/// Main application state
///
/// Owned by exactly one dispatch loop; every field is replaced through the
/// reducers in `update`.
#[derive(Debug, Clone)]
pub struct App {
    /// Catalog, filter and reference instant
    pub zone: ZoneState,
    /// Lifecycle of the selected track, published as immutable snapshots
    pub track: Arc<TrackState>,
    /// Player-wide display and activity flags
    pub global: GlobalState,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ZoneLoadingState {
    #[default]
    Initializing,
    Loading,
    Ready,
}

/// Zone controller state
#[derive(Debug, Clone)]
pub struct ZoneState {
    pub loading_state: ZoneLoadingState,
    /// Zone most recently requested
    pub zone_id: Option<i64>,
    /// Last zone that loaded successfully; kept across failed reloads
    pub zone: Option<Arc<Zone>>,
    pub filter: ZoneTrackFilter,
    pub play_at: NaiveDateTime,
}

impl ZoneState {
    pub fn new(filter: ZoneTrackFilter, play_at: NaiveDateTime) -> Self {
        Self {
            loading_state: ZoneLoadingState::Initializing,
            zone_id: None,
            zone: None,
            filter,
            play_at,
        }
    }
}

/// How live video fills the display
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LiveVideoMode {
    #[default]
    FullScreenZoomed,
    FullScreenAspectRatio,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ActivityState {
    #[default]
    Active,
    Inactive,
}

/// Progress of a long-running operation shown by the renderer
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressInfo {
    /// Percentage, when known
    pub progress: Option<i32>,
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GlobalState {
    pub live_video_mode: LiveVideoMode,
    pub activity: ActivityState,
    pub progress: Option<ProgressInfo>,
}

impl GlobalState {
    pub fn new(live_video_mode: LiveVideoMode) -> Self {
        Self {
            live_video_mode,
            ..Default::default()
        }
    }
}
