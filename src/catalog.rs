//! Catalog model
//!
//! In-memory representation of a zone document: tracks, playlists, playable items
//! and the play conditions that gate them. Loaded wholesale from a
//! [`CatalogSource`] and read-only afterwards.

mod cdn;
mod condition;
mod model;
mod source;

pub use cdn::rewrite_cdn_url;
pub use condition::{HourWindow, PlayCondition, model_pattern_matches};
pub use model::{
    ItemKind, Playlist, PlaylistItem, PlaylistPeriod, Track, TrackTrigger, TriggerType, Zone,
    parse_wall_clock,
};
pub use source::{CatalogError, CatalogSource, DirectoryCatalogSource, HttpCatalogSource};
