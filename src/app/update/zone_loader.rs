//! Zone controller: catalog loading, filter and priority selection

use tracing::{debug, error, info, warn};

use crate::app::message::{Effect, Notification, TrackEvent, ZoneEvent};
use crate::app::state::{App, ZoneLoadingState, ZoneState};
use crate::selection::select_priority_track;

impl ZoneState {
    /// Apply a zone event and return the next state
    pub fn reduce(&self, event: &ZoneEvent) -> ZoneState {
        let mut next = self.clone();
        match event {
            ZoneEvent::Load { zone_id, .. } => {
                next.zone_id = Some(*zone_id);
                next.loading_state = ZoneLoadingState::Loading;
            }
            ZoneEvent::LoadSuccess { zone, .. } => {
                next.zone = Some(zone.clone());
                next.loading_state = ZoneLoadingState::Ready;
            }
            ZoneEvent::SetFilter(filter) => next.filter = filter.clone(),
            ZoneEvent::UpdatePlayAt(play_at) => next.play_at = *play_at,
            // Failures and re-selection leave the zone as it was
            ZoneEvent::LoadError { .. } | ZoneEvent::SelectPriorityTrack => {}
        }
        next
    }
}

impl App {
    pub(super) fn handle_zone(&mut self, event: ZoneEvent) -> Vec<Effect> {
        match &event {
            ZoneEvent::LoadSuccess { zone_id, .. } if self.zone.zone_id != Some(*zone_id) => {
                warn!(
                    "Ignoring zone {} load result, zone {:?} was requested since",
                    zone_id, self.zone.zone_id
                );
                return Vec::new();
            }
            _ => {}
        }

        self.zone = self.zone.reduce(&event);

        match event {
            ZoneEvent::Load {
                zone_id,
                auto_select,
            } => {
                info!("Loading zone {}", zone_id);
                vec![Effect::FetchZone {
                    zone_id,
                    auto_select,
                }]
            }
            ZoneEvent::LoadSuccess {
                zone_id,
                zone,
                auto_select,
            } => {
                info!(
                    "Zone {} loaded: {} tracks, revision {:?}",
                    zone_id,
                    zone.tracks.len(),
                    zone.content_revision
                );
                let mut effects = vec![Effect::Notify(Notification::ZoneLoaded {
                    zone_id,
                    content_revision: zone.content_revision.clone(),
                })];
                if auto_select {
                    effects.extend(self.select_priority_track());
                }
                effects
            }
            ZoneEvent::LoadError { zone_id, reason } => {
                error!("Failed to load zone {}: {}", zone_id, reason);
                vec![Effect::Notify(Notification::ZoneLoadFailed { zone_id, reason })]
            }
            ZoneEvent::SetFilter(filter) => {
                debug!("Zone filter set to {:?}", filter);
                Vec::new()
            }
            ZoneEvent::UpdatePlayAt(play_at) => {
                debug!("Play-at moved to {}", play_at);
                Vec::new()
            }
            ZoneEvent::SelectPriorityTrack => self.select_priority_track(),
        }
    }

    /// Run priority selection against the loaded zone and request the winner
    fn select_priority_track(&self) -> Vec<Effect> {
        let Some(zone) = &self.zone.zone else {
            warn!("Priority selection requested before any zone loaded");
            return Vec::new();
        };

        let play_at = self.zone.play_at;
        match select_priority_track(zone, &self.zone.filter, play_at) {
            Some(track) => {
                info!(
                    "Selected track {} ({}) priority {}",
                    track.id,
                    track.display_name(),
                    track.priority
                );
                vec![Effect::dispatch(TrackEvent::ChangeRequest { track, play_at })]
            }
            None => {
                info!("No track qualifies for {:?} at {}", self.zone.filter, play_at);
                vec![Effect::Notify(Notification::NoTrackSelected)]
            }
        }
    }
}
