//! Main application module

pub mod helpers;
mod message;
mod runtime;
mod state;
mod update;

use std::collections::VecDeque;
use std::sync::Arc;

use chrono::NaiveDateTime;

use crate::selection::ZoneTrackFilter;
pub use message::{Command, Effect, GlobalEvent, Message, Notification, TrackEvent, ZoneEvent};
pub use runtime::{PlayerHandle, Runtime};
pub use state::{
    ActivityState, App, GlobalState, LiveVideoMode, ProgressInfo, ZoneLoadingState, ZoneState,
};
pub use update::track_lifecycle::{RequestId, TrackLoadingState, TrackState};

impl App {
    /// Create new application state
    pub fn new(filter: ZoneTrackFilter, play_at: NaiveDateTime) -> Self {
        Self {
            zone: ZoneState::new(filter, play_at),
            track: Arc::new(TrackState::new(play_at)),
            global: GlobalState::default(),
        }
    }

    /// Apply a message and every follow-up it dispatches, in order.
    ///
    /// Follow-ups run after the message that produced them completes. Returns the
    /// commands that need the outside world.
    pub fn dispatch(&mut self, message: Message) -> Vec<Command> {
        let mut queue = VecDeque::from([message]);
        let mut commands = Vec::new();

        while let Some(message) = queue.pop_front() {
            for effect in self.update(message) {
                match effect.into_command() {
                    Ok(command) => commands.push(command),
                    Err(next) => queue.push_back(next),
                }
            }
        }

        commands
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::catalog::{Playlist, PlaylistItem, Track, Zone};

    fn noon() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 6)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    fn zone() -> Arc<Zone> {
        Arc::new(Zone {
            tracks: vec![Arc::new(Track {
                id: 3,
                priority: 1,
                playlists: vec![Playlist {
                    period: None,
                    items: vec![PlaylistItem {
                        item_type: Some("video".into()),
                        url: Some("https://cdn.test/3.mp4".into()),
                        ..Default::default()
                    }],
                }],
                ..Default::default()
            })],
            ..Default::default()
        })
    }

    #[test]
    fn test_dispatch_runs_follow_ups() {
        let mut app = App::new(ZoneTrackFilter::default(), noon());
        app.dispatch(ZoneEvent::Load {
            zone_id: 1,
            auto_select: true,
        }
        .into());

        let commands = app.dispatch(
            ZoneEvent::LoadSuccess {
                zone_id: 1,
                zone: zone(),
                auto_select: true,
            }
            .into(),
        );

        // The change request was applied within the same dispatch
        assert_eq!(app.track.loading_state, TrackLoadingState::Requested);
        assert!(matches!(
            commands.as_slice(),
            [
                Command::Notify(Notification::ZoneLoaded { zone_id: 1, .. }),
                Command::DownloadTrack { .. }
            ]
        ));
    }

    #[test]
    fn test_completion_reaches_ready_in_one_dispatch() {
        let mut app = App::new(ZoneTrackFilter::default(), noon());
        app.dispatch(ZoneEvent::Load {
            zone_id: 1,
            auto_select: true,
        }
        .into());
        let commands = app.dispatch(
            ZoneEvent::LoadSuccess {
                zone_id: 1,
                zone: zone(),
                auto_select: true,
            }
            .into(),
        );
        let Some(Command::DownloadTrack {
            request_id, items, ..
        }) = commands
            .into_iter()
            .find(|c| matches!(c, Command::DownloadTrack { .. }))
        else {
            panic!("no download requested");
        };

        app.dispatch(TrackEvent::Downloading(request_id).into());
        app.dispatch(GlobalEvent::ReportProgress(Some(ProgressInfo::default())).into());
        let commands = app.dispatch(
            TrackEvent::DownloadCompleted {
                request_id,
                loaded_items: items,
            }
            .into(),
        );

        assert!(app.track.is_ready());
        assert!(app.global.progress.is_none());
        assert_eq!(
            commands
                .iter()
                .filter(|c| matches!(c, Command::Notify(Notification::TrackReady { track_id: 3 })))
                .count(),
            1
        );
    }

    #[test]
    fn test_follow_ups_never_leave_dispatch() {
        let mut app = App::new(ZoneTrackFilter::default(), noon());
        app.dispatch(TrackEvent::ChangeRequest {
            track: zone().tracks[0].clone(),
            play_at: noon(),
        }
        .into());
        app.dispatch(TrackEvent::ReadyRequest.into());

        // Already ready: the response is dispatched internally and only its notification escapes
        let commands = app.dispatch(TrackEvent::ReadyRequest.into());
        assert!(matches!(
            commands.as_slice(),
            [Command::Notify(Notification::ReadyAcknowledged)]
        ));
    }
}
