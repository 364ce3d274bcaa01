//! Content selection engine
//!
//! Pure functions over the catalog: pick the priority track for a site context at an
//! instant, and flatten a track into the ordered videos to play. No state, no I/O;
//! safe to call from any thread.

use std::sync::Arc;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::catalog::{PlaylistItem, Track, Zone};

/// Attribute context used for matching, replaced wholesale on update
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZoneTrackFilter {
    pub site_id: Option<i64>,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub sku: Option<String>,
}

impl ZoneTrackFilter {
    /// Site, weekday, time-of-day, brand, model and sku checks.
    ///
    /// Period, priority and trigger rules are top-level only and not part of this.
    pub fn accepts(&self, track: &Track, at: NaiveDateTime) -> bool {
        track.is_valid_for_site(self.site_id)
            && track.is_valid_for_day_of_week(at)
            && track.is_valid_for_time_of_day(at)
            && track.is_valid_for_brand(self.brand.as_deref())
            && track.is_valid_for_model(self.model.as_deref())
            && track.is_valid_for_skus(self.sku.as_deref())
    }
}

/// Highest-priority track eligible for automatic selection.
///
/// A track is eligible when the filter accepts it, it has a playlist in period at
/// `at`, and it is not bound to a trigger. Ties go to the first track in zone order.
pub fn select_priority_track(
    zone: &Zone,
    filter: &ZoneTrackFilter,
    at: NaiveDateTime,
) -> Option<Arc<Track>> {
    zone.tracks
        .iter()
        .filter(|track| {
            filter.accepts(track, at)
                && track.has_playlists_in_period(at)
                && !zone.is_track_trigger(track)
        })
        .fold(None, |best: Option<&Arc<Track>>, track| match best {
            Some(current) if current.priority >= track.priority => Some(current),
            _ => Some(track),
        })
        .cloned()
}

/// Flatten a track into the ordered videos to play at `at`.
///
/// Uses the track's first in-period playlist. Sub-track references resolve one level
/// deep: each referenced sub-track must pass the filter, then contributes the videos
/// of its own first in-period playlist. Missing sub-tracks or playlists contribute
/// nothing.
pub fn expand_playable_items(
    track: &Track,
    filter: &ZoneTrackFilter,
    at: NaiveDateTime,
) -> Vec<PlaylistItem> {
    let Some(playlist) = track.first_playlist_in_period(at) else {
        return Vec::new();
    };

    let mut items = Vec::new();
    for item in &playlist.items {
        if item.is_video() {
            items.push(item.clone());
        } else if item.is_subtrack() {
            for &index in &item.subtracks {
                let Some(subtrack) = track.subtrack(index) else {
                    tracing::debug!(
                        "Track {} references missing sub-track index {}",
                        track.id,
                        index
                    );
                    continue;
                };
                if !filter.accepts(subtrack, at) {
                    continue;
                }
                if let Some(sub_playlist) = subtrack.first_playlist_in_period(at) {
                    items.extend(sub_playlist.items.iter().filter(|i| i.is_video()).cloned());
                }
            }
        }
    }

    items
}
