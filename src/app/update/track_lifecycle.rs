//! Track lifecycle state machine
//!
//! Tracks one selected track from request through download to readiness:
//!
//! ```text
//! Uninitialized -> Requested -> Downloading -> DownloadCompleted -> Ready
//!        ^____________ ChangeRequest (from any state) _____________|
//! ```
//!
//! `TrackState` is an immutable snapshot; `reduce` returns the next one. Each
//! `ChangeRequest` gets a fresh [`RequestId`] and download signals carrying an older
//! id are dropped, so an abandoned request can't resurrect stale content.
//!
//! Details and preview flags are orthogonal to the lifecycle.

use std::fmt;
use std::sync::Arc;

use chrono::NaiveDateTime;
use tracing::{debug, info, warn};

use crate::app::message::{Effect, GlobalEvent, Notification, TrackEvent};
use crate::app::state::App;
use crate::catalog::{Playlist, PlaylistItem, Track};
use crate::selection::expand_playable_items;

/// Identity of a track change request
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestId(u64);

impl RequestId {
    fn next(previous: Option<RequestId>) -> Self {
        Self(previous.map_or(1, |id| id.0 + 1))
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Lifecycle of the selected track
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TrackLoadingState {
    #[default]
    Uninitialized,
    Requested,
    Downloading,
    DownloadCompleted,
    Ready,
}

/// Snapshot of the track lifecycle
#[derive(Debug, Clone)]
pub struct TrackState {
    pub loading_state: TrackLoadingState,
    pub current_playlist: Option<Playlist>,
    pub current_playlist_item: Option<PlaylistItem>,
    /// Index and seek position reported with the current item
    pub current_item_index: Option<usize>,
    pub seek_seconds: f64,
    pub play_at: NaiveDateTime,
    pub current_track: Option<Arc<Track>>,
    pub requested_track: Option<Arc<Track>>,
    /// Identity of the most recent change request
    pub request_id: Option<RequestId>,
    /// Items reported by the last accepted download completion
    pub loaded_items: Vec<PlaylistItem>,
    pub show_track_details: bool,
    pub preview_playlist_item: Option<PlaylistItem>,
}

impl TrackState {
    pub fn new(play_at: NaiveDateTime) -> Self {
        Self {
            loading_state: TrackLoadingState::Uninitialized,
            current_playlist: None,
            current_playlist_item: None,
            current_item_index: None,
            seek_seconds: 0.0,
            play_at,
            current_track: None,
            requested_track: None,
            request_id: None,
            loaded_items: Vec::new(),
            show_track_details: false,
            preview_playlist_item: None,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.loading_state == TrackLoadingState::Ready
    }

    /// Whether a download signal tagged `id` belongs to the live request
    pub fn is_current_request(&self, id: RequestId) -> bool {
        self.request_id == Some(id)
    }

    /// Expected predecessor state for an event, used to flag out-of-order delivery
    pub fn is_in_order(&self, event: &TrackEvent) -> bool {
        use TrackLoadingState::*;
        match event {
            TrackEvent::Downloading(_) => self.loading_state == Requested,
            TrackEvent::DownloadCompleted { .. } => {
                matches!(self.loading_state, Requested | Downloading)
            }
            TrackEvent::ReadyRequest => self.loading_state != Uninitialized,
            _ => true,
        }
    }

    /// Apply an event and return the next snapshot.
    ///
    /// Download signals for superseded requests leave the state untouched. Other
    /// out-of-order events are applied as-is.
    pub fn reduce(&self, event: &TrackEvent) -> TrackState {
        let mut next = self.clone();
        match event {
            TrackEvent::ChangeRequest { track, play_at } => {
                next.loading_state = TrackLoadingState::Requested;
                next.requested_track = Some(track.clone());
                next.play_at = *play_at;
                next.request_id = Some(RequestId::next(self.request_id));
            }
            TrackEvent::Downloading(id) => {
                if self.is_current_request(*id) {
                    next.loading_state = TrackLoadingState::Downloading;
                }
            }
            TrackEvent::DownloadCompleted {
                request_id,
                loaded_items,
            } => {
                if self.is_current_request(*request_id) {
                    next.loading_state = TrackLoadingState::DownloadCompleted;
                    next.loaded_items = loaded_items.clone();
                }
            }
            TrackEvent::ReadyRequest => {
                next.loading_state = TrackLoadingState::Ready;
                next.current_track = next.requested_track.take();
                next.current_playlist = next
                    .current_track
                    .as_ref()
                    .and_then(|t| t.first_playlist_in_period(next.play_at))
                    .cloned();
            }
            TrackEvent::DownloadProgress { .. }
            | TrackEvent::ReadyResponse
            | TrackEvent::PauseRequest
            | TrackEvent::ResumeRequest => {}
            TrackEvent::PlaylistChange(playlist) => {
                next.current_playlist = playlist.clone();
            }
            TrackEvent::PlaylistItemChange {
                item,
                seek_seconds,
                index,
            } => {
                next.current_playlist_item = item.clone();
                next.current_item_index = Some(*index);
                next.seek_seconds = *seek_seconds;
            }
            TrackEvent::ShowDetails => next.show_track_details = true,
            TrackEvent::HideDetails => next.show_track_details = false,
            TrackEvent::ShowPreviewItem(item) => {
                next.preview_playlist_item = item.clone();
            }
            TrackEvent::HidePreviewItem => next.preview_playlist_item = None,
        }
        next
    }
}

impl Default for TrackState {
    fn default() -> Self {
        Self::new(crate::utils::now_wall_clock())
    }
}

impl App {
    pub(super) fn handle_track(&mut self, event: TrackEvent) -> Vec<Effect> {
        let previous = self.track.clone();

        match &event {
            TrackEvent::Downloading(id)
            | TrackEvent::DownloadProgress { request_id: id, .. }
            | TrackEvent::DownloadCompleted { request_id: id, .. }
                if !previous.is_current_request(*id) =>
            {
                warn!(
                    "Dropping stale download signal for request {}, current is {:?}",
                    id, previous.request_id
                );
                return Vec::new();
            }
            // Progress lives in the global state; the lifecycle snapshot is unchanged
            TrackEvent::DownloadProgress { progress, .. } => {
                return vec![Effect::dispatch(GlobalEvent::ReportProgress(Some(
                    progress.clone(),
                )))];
            }
            _ => {}
        }

        if !previous.is_in_order(&event) {
            warn!(
                "Track event {} arrived in state {:?}",
                event_name(&event),
                previous.loading_state
            );
        }

        let next = previous.reduce(&event);
        if next.loading_state != previous.loading_state {
            debug!(
                "Track lifecycle {:?} -> {:?}",
                previous.loading_state, next.loading_state
            );
        }
        self.track = Arc::new(next);

        match event {
            TrackEvent::ChangeRequest { track, play_at } => {
                let Some(request_id) = self.track.request_id else {
                    return Vec::new();
                };
                let items = expand_playable_items(&track, &self.zone.filter, play_at);
                info!(
                    "Requesting track {} ({}) as {} with {} items",
                    track.id,
                    track.display_name(),
                    request_id,
                    items.len()
                );
                vec![Effect::DownloadTrack {
                    request_id,
                    track_name: track.display_name().to_string(),
                    items,
                }]
            }
            TrackEvent::DownloadCompleted { .. } => vec![
                Effect::dispatch(GlobalEvent::ReportProgress(None)),
                Effect::dispatch(TrackEvent::ReadyRequest),
            ],
            TrackEvent::ReadyRequest => {
                if previous.is_ready() {
                    vec![Effect::dispatch(TrackEvent::ReadyResponse)]
                } else {
                    match &self.track.current_track {
                        Some(track) => {
                            info!("Track {} ready", track.id);
                            vec![Effect::Notify(Notification::TrackReady { track_id: track.id })]
                        }
                        None => Vec::new(),
                    }
                }
            }
            TrackEvent::ReadyResponse => vec![Effect::Notify(Notification::ReadyAcknowledged)],
            TrackEvent::PauseRequest => vec![Effect::Notify(Notification::Pause)],
            TrackEvent::ResumeRequest => vec![Effect::Notify(Notification::Resume)],
            _ => Vec::new(),
        }
    }
}

fn event_name(event: &TrackEvent) -> &'static str {
    match event {
        TrackEvent::ChangeRequest { .. } => "ChangeRequest",
        TrackEvent::Downloading(_) => "Downloading",
        TrackEvent::DownloadProgress { .. } => "DownloadProgress",
        TrackEvent::DownloadCompleted { .. } => "DownloadCompleted",
        TrackEvent::ReadyRequest => "ReadyRequest",
        TrackEvent::ReadyResponse => "ReadyResponse",
        TrackEvent::PlaylistChange(_) => "PlaylistChange",
        TrackEvent::PlaylistItemChange { .. } => "PlaylistItemChange",
        TrackEvent::PauseRequest => "PauseRequest",
        TrackEvent::ResumeRequest => "ResumeRequest",
        TrackEvent::ShowDetails => "ShowDetails",
        TrackEvent::HideDetails => "HideDetails",
        TrackEvent::ShowPreviewItem(_) => "ShowPreviewItem",
        TrackEvent::HidePreviewItem => "HidePreviewItem",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::PlaylistPeriod;
    use chrono::NaiveDate;

    fn noon() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 6)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    fn video(url: &str) -> PlaylistItem {
        PlaylistItem {
            item_type: Some("video".into()),
            url: Some(url.into()),
            ..Default::default()
        }
    }

    fn track(id: i64) -> Arc<Track> {
        Arc::new(Track {
            id,
            playlists: vec![
                Playlist {
                    period: Some(PlaylistPeriod {
                        start: noon() - chrono::Duration::days(30),
                        end: noon() - chrono::Duration::days(1),
                    }),
                    items: vec![video("expired")],
                },
                Playlist {
                    period: None,
                    items: vec![video(&format!("{}.mp4", id))],
                },
            ],
            ..Default::default()
        })
    }

    fn request(state: &TrackState, id: i64) -> TrackState {
        state.reduce(&TrackEvent::ChangeRequest {
            track: track(id),
            play_at: noon(),
        })
    }

    fn id_of(state: &TrackState) -> RequestId {
        state.request_id.unwrap()
    }

    #[test]
    fn test_initial_state() {
        let state = TrackState::new(noon());
        assert_eq!(state.loading_state, TrackLoadingState::Uninitialized);
        assert!(state.current_track.is_none());
        assert!(state.requested_track.is_none());
        assert!(state.request_id.is_none());
        assert_eq!(state.play_at, noon());
    }

    #[test]
    fn test_full_cycle() {
        let s = request(&TrackState::new(noon()), 1);
        assert_eq!(s.loading_state, TrackLoadingState::Requested);
        let id = id_of(&s);

        let s = s.reduce(&TrackEvent::Downloading(id));
        assert_eq!(s.loading_state, TrackLoadingState::Downloading);

        let s = s.reduce(&TrackEvent::DownloadCompleted {
            request_id: id,
            loaded_items: vec![video("1.mp4")],
        });
        assert_eq!(s.loading_state, TrackLoadingState::DownloadCompleted);
        assert_eq!(s.loaded_items.len(), 1);

        let s = s.reduce(&TrackEvent::ReadyRequest);
        assert!(s.is_ready());
        assert_eq!(s.current_track.as_ref().map(|t| t.id), Some(1));
        assert!(s.requested_track.is_none());
    }

    #[test]
    fn test_ready_picks_playlist_of_new_track() {
        let first = request(&TrackState::new(noon()), 1).reduce(&TrackEvent::ReadyRequest);
        let second = request(&first, 2).reduce(&TrackEvent::ReadyRequest);
        let playlist = second.current_playlist.unwrap();
        assert_eq!(playlist.items[0].url.as_deref(), Some("2.mp4"));
    }

    #[test]
    fn test_request_does_not_clear_other_fields() {
        let ready = request(&TrackState::new(noon()), 1)
            .reduce(&TrackEvent::ReadyRequest)
            .reduce(&TrackEvent::ShowDetails);
        let next = request(&ready, 2);
        assert_eq!(next.current_track.as_ref().map(|t| t.id), Some(1));
        assert!(next.current_playlist.is_some());
        assert!(next.show_track_details);
    }

    #[test]
    fn test_request_ids_increase() {
        let a = request(&TrackState::new(noon()), 1);
        let b = request(&a, 2);
        assert!(id_of(&b) > id_of(&a));
    }

    #[test]
    fn test_stale_completion_ignored() {
        let a = request(&TrackState::new(noon()), 1);
        let stale = id_of(&a);
        let a = a.reduce(&TrackEvent::Downloading(stale));
        let b = request(&a, 2);
        assert_eq!(b.loading_state, TrackLoadingState::Requested);

        let after = b.reduce(&TrackEvent::DownloadCompleted {
            request_id: stale,
            loaded_items: vec![video("1.mp4")],
        });
        assert_eq!(after.loading_state, TrackLoadingState::Requested);
        assert!(after.loaded_items.is_empty());
        assert_eq!(after.requested_track.as_ref().map(|t| t.id), Some(2));

        let after = after.reduce(&TrackEvent::Downloading(stale));
        assert_eq!(after.loading_state, TrackLoadingState::Requested);
    }

    #[test]
    fn test_out_of_order_events_tolerated() {
        let s = request(&TrackState::new(noon()), 1);
        let id = id_of(&s);
        let completed = TrackEvent::DownloadCompleted {
            request_id: id,
            loaded_items: Vec::new(),
        };
        assert!(s.is_in_order(&completed));

        let ready = s.reduce(&TrackEvent::ReadyRequest);
        assert!(!ready.is_in_order(&completed));
        let late = ready.reduce(&completed);
        assert_eq!(late.loading_state, TrackLoadingState::DownloadCompleted);

        let early = TrackState::new(noon()).reduce(&TrackEvent::ReadyRequest);
        assert!(early.is_ready());
        assert!(early.current_track.is_none());
        assert!(early.current_playlist.is_none());
    }

    #[test]
    fn test_ready_always_promotes_requested_track() {
        let ready = request(&TrackState::new(noon()), 1).reduce(&TrackEvent::ReadyRequest);
        assert_eq!(ready.current_track.as_ref().map(|t| t.id), Some(1));

        // Nothing pending: the current track is replaced by the empty request
        let again = ready.reduce(&TrackEvent::ReadyRequest);
        assert!(again.is_ready());
        assert!(again.current_track.is_none());
        assert!(again.requested_track.is_none());
        assert!(again.current_playlist.is_none());
    }

    #[test]
    fn test_orthogonal_setters_leave_lifecycle_alone() {
        let s = request(&TrackState::new(noon()), 1);
        let s = s
            .reduce(&TrackEvent::ShowDetails)
            .reduce(&TrackEvent::ShowPreviewItem(Some(video("p"))))
            .reduce(&TrackEvent::PlaylistItemChange {
                item: Some(video("1.mp4")),
                seek_seconds: 4.5,
                index: 2,
            })
            .reduce(&TrackEvent::PlaylistChange(None));
        assert_eq!(s.loading_state, TrackLoadingState::Requested);
        assert!(s.show_track_details);
        assert_eq!(s.preview_playlist_item, Some(video("p")));
        assert_eq!(s.current_item_index, Some(2));
        assert_eq!(s.seek_seconds, 4.5);

        let s = s
            .reduce(&TrackEvent::HideDetails)
            .reduce(&TrackEvent::HidePreviewItem);
        assert!(!s.show_track_details);
        assert!(s.preview_playlist_item.is_none());
    }

    mod dispatch {
        use super::*;
        use crate::app::message::Message;
        use crate::app::state::ProgressInfo;
        use crate::selection::ZoneTrackFilter;

        fn app() -> App {
            App::new(ZoneTrackFilter::default(), noon())
        }

        fn change(id: i64) -> Message {
            Message::Track(TrackEvent::ChangeRequest {
                track: track(id),
                play_at: noon(),
            })
        }

        fn download_of(effects: &[Effect]) -> (RequestId, Vec<PlaylistItem>) {
            effects
                .iter()
                .find_map(|e| match e {
                    Effect::DownloadTrack {
                        request_id, items, ..
                    } => Some((*request_id, items.clone())),
                    _ => None,
                })
                .unwrap()
        }

        fn notifications(effects: &[Effect]) -> Vec<Notification> {
            effects
                .iter()
                .filter_map(|e| match e {
                    Effect::Notify(n) => Some(n.clone()),
                    _ => None,
                })
                .collect()
        }

        #[test]
        fn test_change_request_downloads_expanded_items() {
            let mut app = app();
            let effects = app.update(change(7));
            let (id, items) = download_of(&effects);
            assert_eq!(Some(id), app.track.request_id);
            assert_eq!(items, vec![video("7.mp4")]);
        }

        #[test]
        fn test_completion_leads_to_ready() {
            let mut app = app();
            let (id, items) = download_of(&app.update(change(7)));
            app.update(Message::Track(TrackEvent::Downloading(id)));
            let effects = app.update(Message::Track(TrackEvent::DownloadCompleted {
                request_id: id,
                loaded_items: items,
            }));
            assert!(effects.iter().any(|e| matches!(
                e,
                Effect::Dispatch(Message::Track(TrackEvent::ReadyRequest))
            )));
            assert!(effects.iter().any(|e| matches!(
                e,
                Effect::Dispatch(Message::Global(GlobalEvent::ReportProgress(None)))
            )));
        }

        #[test]
        fn test_ready_response_only_when_already_ready() {
            let mut app = app();
            app.update(change(1));
            assert_eq!(app.track.loading_state, TrackLoadingState::Requested);

            let first = app.update(Message::Track(TrackEvent::ReadyRequest));
            assert!(app.track.is_ready());
            assert!(!first.iter().any(|e| matches!(
                e,
                Effect::Dispatch(Message::Track(TrackEvent::ReadyResponse))
            )));
            assert_eq!(
                notifications(&first),
                vec![Notification::TrackReady { track_id: 1 }]
            );

            let second = app.update(Message::Track(TrackEvent::ReadyRequest));
            assert!(second.iter().any(|e| matches!(
                e,
                Effect::Dispatch(Message::Track(TrackEvent::ReadyResponse))
            )));

            let ack = app.update(Message::Track(TrackEvent::ReadyResponse));
            assert_eq!(notifications(&ack), vec![Notification::ReadyAcknowledged]);
        }

        #[test]
        fn test_stale_completion_does_not_advance_new_request() {
            let mut app = app();
            let (a, items) = download_of(&app.update(change(1)));
            app.update(Message::Track(TrackEvent::Downloading(a)));
            app.update(change(2));

            let effects = app.update(Message::Track(TrackEvent::DownloadCompleted {
                request_id: a,
                loaded_items: items,
            }));
            assert!(effects.is_empty());
            assert_eq!(app.track.loading_state, TrackLoadingState::Requested);
            assert_eq!(app.track.requested_track.as_ref().map(|t| t.id), Some(2));
        }

        #[test]
        fn test_progress_reported_only_for_live_request() {
            let mut app = app();
            let (a, _) = download_of(&app.update(change(1)));
            let progress = ProgressInfo {
                progress: Some(50),
                ..Default::default()
            };

            let effects = app.dispatch(Message::Track(TrackEvent::DownloadProgress {
                request_id: a,
                progress: progress.clone(),
            }));
            assert!(effects.is_empty());
            assert_eq!(app.global.progress, Some(progress.clone()));

            app.update(change(2));
            app.update(Message::Global(GlobalEvent::ReportProgress(None)));
            let stale = app.update(Message::Track(TrackEvent::DownloadProgress {
                request_id: a,
                progress,
            }));
            assert!(stale.is_empty());
            assert!(app.global.progress.is_none());
        }

        #[test]
        fn test_pause_and_resume_notify() {
            let mut app = app();
            let pause = app.update(Message::Track(TrackEvent::PauseRequest));
            let resume = app.update(Message::Track(TrackEvent::ResumeRequest));
            assert_eq!(notifications(&pause), vec![Notification::Pause]);
            assert_eq!(notifications(&resume), vec![Notification::Resume]);
            assert_eq!(app.track.loading_state, TrackLoadingState::Uninitialized);
        }
    }
}
