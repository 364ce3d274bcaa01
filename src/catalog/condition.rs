//! Play conditions
//!
//! Each dimension matches everything when absent or empty. Missing caller context
//! against a non-empty dimension fails closed.

use chrono::{Datelike, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use super::model::nullable;

/// Predicate set gating a track's eligibility
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlayCondition {
    /// Greater than zero marks an interval track
    pub interval: Option<i32>,
    #[serde(deserialize_with = "nullable")]
    pub site_ids: Vec<i64>,
    #[serde(deserialize_with = "nullable")]
    pub hours: Vec<HourWindow>,
    /// 1 = Monday .. 7 = Sunday
    #[serde(deserialize_with = "nullable")]
    pub days: Vec<u32>,
    pub brand: Option<String>,
    /// Wildcard patterns, see [`model_pattern_matches`]
    #[serde(deserialize_with = "nullable")]
    pub models: Vec<String>,
    #[serde(deserialize_with = "nullable")]
    pub skus: Vec<String>,
    /// Carried through from the document, not interpreted by the engine
    pub on_higher_pri: Option<String>,
}

impl PlayCondition {
    pub fn is_valid_for_site(&self, site_id: Option<i64>) -> bool {
        if self.site_ids.is_empty() {
            return true;
        }
        site_id.is_some_and(|id| self.site_ids.contains(&id))
    }

    pub fn is_valid_for_day_of_week(&self, at: NaiveDateTime) -> bool {
        if self.days.is_empty() {
            return true;
        }
        self.days.contains(&at.weekday().number_from_monday())
    }

    pub fn is_valid_for_time_of_day(&self, at: NaiveDateTime) -> bool {
        if self.hours.is_empty() {
            return true;
        }
        self.hours.iter().any(|window| window.contains(at))
    }

    /// Case-insensitive equality; a required brand with no caller brand fails
    pub fn is_valid_for_brand(&self, brand: Option<&str>) -> bool {
        let Some(required) = self.brand.as_deref().filter(|b| !b.is_empty()) else {
            return true;
        };
        brand.is_some_and(|b| b.to_lowercase() == required.to_lowercase())
    }

    pub fn is_valid_for_model(&self, model: Option<&str>) -> bool {
        if self.models.is_empty() {
            return true;
        }
        let Some(model) = model else {
            return false;
        };
        self.models
            .iter()
            .any(|pattern| model_pattern_matches(pattern, model))
    }

    /// Exact match against any listed SKU
    pub fn is_valid_for_skus(&self, sku: Option<&str>) -> bool {
        if self.skus.is_empty() {
            return true;
        }
        sku.is_some_and(|s| self.skus.iter().any(|candidate| candidate == s))
    }
}

/// Match a model against a wildcard pattern, case-insensitively.
///
/// - `*abc` matches models ending in `abc`
/// - `abc*` matches models starting with `abc`
/// - `*abc*` matches models containing `abc`
///
/// A pattern without a leading or trailing `*` matches nothing.
pub fn model_pattern_matches(pattern: &str, model: &str) -> bool {
    let pattern = pattern.to_lowercase();
    let model = model.to_lowercase();
    let needle = pattern.replace('*', "");
    let leading = pattern.starts_with('*');
    let trailing = pattern.ends_with('*');

    match (leading, trailing) {
        (true, true) => model.contains(&needle),
        (true, false) => model.ends_with(&needle),
        (false, true) => model.starts_with(&needle),
        (false, false) => false,
    }
}

/// Same-day wall-clock window, `[start, end)`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HourWindow {
    /// `HH:MM` or `HH:MM:SS`
    pub start: Option<String>,
    pub end: Option<String>,
}

impl HourWindow {
    /// A window missing either bound matches any time; a malformed bound matches nothing
    pub fn contains(&self, at: NaiveDateTime) -> bool {
        let (Some(start), Some(end)) = (self.start.as_deref(), self.end.as_deref()) else {
            return true;
        };
        let (Some(start), Some(end)) = (parse_time(start), parse_time(end)) else {
            tracing::debug!(window = ?self, "Malformed hour window, treating as non-match");
            return false;
        };
        let time = at.time();
        start <= time && time < end
    }
}

fn parse_time(raw: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(raw, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M"))
        .ok()
}
