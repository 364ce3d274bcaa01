//! ZonePlay - digital signage player core
//!
//! Picks which content a screen shows for its site, vehicle brand/model/SKU and the
//! current time, then drives the selected track through download to playback.

pub mod app;
pub mod cache;
pub mod catalog;
pub mod selection;
pub mod settings;
pub mod utils;
