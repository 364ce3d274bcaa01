//! Catalog entities
//!
//! These map one-to-one onto the zone document served by the catalog source.
//! Every field is optional in the document; absent or `null` lists become empty.

use std::sync::Arc;

use chrono::{DateTime, Local, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::cdn::rewrite_cdn_url;
use super::condition::PlayCondition;

/// Top-level catalog unit for one physical deployment
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Zone {
    pub content_revision: Option<String>,
    #[serde(deserialize_with = "nullable")]
    pub tracks: Vec<Arc<Track>>,
    #[serde(deserialize_with = "nullable")]
    pub track_triggers: Vec<TrackTrigger>,
}

impl Zone {
    /// Whether the track is bound to an explicit trigger
    pub fn is_track_trigger(&self, track: &Track) -> bool {
        self.track_triggers
            .iter()
            .any(|trigger| trigger.track_id == Some(track.id))
    }

    /// Look up a top-level track by id
    pub fn track_by_id(&self, id: i64) -> Option<&Arc<Track>> {
        self.tracks.iter().find(|t| t.id == id)
    }
}

/// A prioritized, conditionally-valid content unit
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Track {
    pub id: i64,
    pub name: Option<String>,
    /// Higher wins
    pub priority: i32,
    pub play_condition: Option<PlayCondition>,
    #[serde(deserialize_with = "nullable")]
    pub playlists: Vec<Playlist>,
    /// Referenced positionally from `subtrack` items, never by id
    #[serde(deserialize_with = "nullable")]
    pub subtracks: Vec<Track>,
}

impl Track {
    pub fn is_interval(&self) -> bool {
        self.play_condition
            .as_ref()
            .and_then(|c| c.interval)
            .is_some_and(|interval| interval > 0)
    }

    pub fn has_playlists_in_period(&self, at: NaiveDateTime) -> bool {
        self.playlists.iter().any(|p| p.is_in_period(at))
    }

    /// First playlist in declaration order whose period contains `at`
    ///
    /// Overlapping periods resolve by order, not by specificity.
    pub fn first_playlist_in_period(&self, at: NaiveDateTime) -> Option<&Playlist> {
        self.playlists.iter().find(|p| p.is_in_period(at))
    }

    /// Sub-track at a positional index; negative or out-of-range yields `None`
    pub fn subtrack(&self, index: i64) -> Option<&Track> {
        usize::try_from(index)
            .ok()
            .and_then(|idx| self.subtracks.get(idx))
    }

    pub fn is_valid_for_site(&self, site_id: Option<i64>) -> bool {
        self.play_condition
            .as_ref()
            .is_none_or(|c| c.is_valid_for_site(site_id))
    }

    pub fn is_valid_for_day_of_week(&self, at: NaiveDateTime) -> bool {
        self.play_condition
            .as_ref()
            .is_none_or(|c| c.is_valid_for_day_of_week(at))
    }

    pub fn is_valid_for_time_of_day(&self, at: NaiveDateTime) -> bool {
        self.play_condition
            .as_ref()
            .is_none_or(|c| c.is_valid_for_time_of_day(at))
    }

    pub fn is_valid_for_brand(&self, brand: Option<&str>) -> bool {
        self.play_condition
            .as_ref()
            .is_none_or(|c| c.is_valid_for_brand(brand))
    }

    pub fn is_valid_for_model(&self, model: Option<&str>) -> bool {
        self.play_condition
            .as_ref()
            .is_none_or(|c| c.is_valid_for_model(model))
    }

    pub fn is_valid_for_skus(&self, sku: Option<&str>) -> bool {
        self.play_condition
            .as_ref()
            .is_none_or(|c| c.is_valid_for_skus(sku))
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("<unnamed>")
    }
}

/// A time-windowed ordered list of playable items
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Playlist {
    pub period: Option<PlaylistPeriod>,
    #[serde(deserialize_with = "nullable")]
    pub items: Vec<PlaylistItem>,
}

impl Playlist {
    /// A playlist without a period is always in period
    pub fn is_in_period(&self, at: NaiveDateTime) -> bool {
        self.period.as_ref().is_none_or(|p| p.contains(at))
    }

    pub fn has_videos(&self) -> bool {
        self.items.iter().any(PlaylistItem::is_video)
    }
}

/// Validity window of a playlist
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistPeriod {
    #[serde(with = "wall_clock")]
    pub start: NaiveDateTime,
    #[serde(with = "wall_clock")]
    pub end: NaiveDateTime,
}

impl PlaylistPeriod {
    /// Exclusive start, inclusive end
    pub fn contains(&self, at: NaiveDateTime) -> bool {
        self.start < at && at <= self.end
    }
}

/// Item type as declared in the document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    Video,
    Subtrack,
    /// Any other or missing type; never played
    Unknown,
}

/// A playable entry of a playlist
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlaylistItem {
    #[serde(rename = "type")]
    pub item_type: Option<String>,
    pub url: Option<String>,
    pub volume: i32,
    /// Seconds
    pub duration: Option<f64>,
    /// Indices into the owning track's sub-track array
    #[serde(deserialize_with = "nullable")]
    pub subtracks: Vec<i64>,
    #[serde(deserialize_with = "nullable")]
    pub tags: Vec<String>,
}

impl PlaylistItem {
    pub fn kind(&self) -> ItemKind {
        match self.item_type.as_deref() {
            Some("video") => ItemKind::Video,
            Some("subtrack") => ItemKind::Subtrack,
            _ => ItemKind::Unknown,
        }
    }

    pub fn is_video(&self) -> bool {
        self.kind() == ItemKind::Video
    }

    pub fn is_subtrack(&self) -> bool {
        self.kind() == ItemKind::Subtrack
    }

    /// URL with known storage origins swapped for their caching proxy
    pub fn cdn_url(&self) -> Option<String> {
        self.url.as_deref().map(rewrite_cdn_url)
    }
}

/// Marks a track as reachable only through an explicit trigger
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TrackTrigger {
    pub track_id: Option<i64>,
    #[serde(deserialize_with = "nullable")]
    pub triggers: Vec<TriggerType>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TriggerType {
    #[serde(rename = "type")]
    pub trigger_type: Option<String>,
    #[serde(deserialize_with = "nullable")]
    pub arguments: Vec<String>,
}

pub(super) fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

pub use wall_clock::parse as parse_wall_clock;

/// Period instants on the player's wall clock.
///
/// Accepts naive ISO-8601 as-is; instants carrying an offset are converted to local time.
mod wall_clock {
    use super::*;

    const FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

    pub fn serialize<S: Serializer>(
        value: &NaiveDateTime,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&value.format(FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).map_err(serde::de::Error::custom)
    }

    pub fn parse(raw: &str) -> Result<NaiveDateTime, String> {
        if let Ok(naive) = raw.parse::<NaiveDateTime>() {
            return Ok(naive);
        }
        DateTime::parse_from_rfc3339(raw)
            .map(|dt| dt.with_timezone(&Local).naive_local())
            .map_err(|e| format!("invalid period instant '{}': {}", raw, e))
    }
}
