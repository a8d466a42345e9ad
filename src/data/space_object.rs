//! Element sets and catalog records as published by Celestrak

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Two-Line Element set for a single catalog object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementSet {
    /// NORAD catalog number as printed in line 1 (columns 3-7)
    pub norad_id: String,
    pub name: String,
    pub line1: String,
    pub line2: String,
}

impl ElementSet {
    /// Build from a name line and the two element lines.
    ///
    /// Returns `None` when line 1 is too short to carry a catalog number.
    pub fn from_lines(name: &str, line1: &str, line2: &str) -> Option<Self> {
        let line1 = line1.trim();
        let norad_id = line1.get(2..7)?.trim();
        if norad_id.is_empty() {
            return None;
        }

        Some(Self {
            norad_id: norad_id.to_string(),
            name: name.trim().to_string(),
            line1: line1.to_string(),
            line2: line2.trim().to_string(),
        })
    }

    /// Get display name (falls back to NORAD ID if no name)
    pub fn display_name(&self) -> String {
        if self.name.is_empty() {
            format!("NORAD {}", self.norad_id)
        } else {
            self.name.clone()
        }
    }

    pub fn tle_lines(&self) -> [String; 2] {
        [self.line1.clone(), self.line2.clone()]
    }
}

/// Parse 3-line TLE text (name, line 1, line 2) in feed order.
///
/// Blank lines are ignored and an incomplete trailing group is dropped.
/// A catalog number seen twice keeps its first position but takes the
/// later elements.
pub fn parse_tle_text(text: &str) -> Vec<ElementSet> {
    let lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();

    let mut sets: Vec<ElementSet> = Vec::with_capacity(lines.len() / 3);
    let mut index: HashMap<String, usize> = HashMap::with_capacity(lines.len() / 3);
    for group in lines.chunks_exact(3) {
        let Some(set) = ElementSet::from_lines(group[0], group[1], group[2]) else {
            log::warn!("Skipping malformed TLE group for {:?}", group[0]);
            continue;
        };

        match index.get(&set.norad_id) {
            Some(&pos) => sets[pos] = set,
            None => {
                index.insert(set.norad_id.clone(), sets.len());
                sets.push(set);
            }
        }
    }

    sets
}

/// One entry of the Celestrak GP feed in JSON format.
///
/// Read with the feed's upper-case keys, written back in snake case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all(deserialize = "SCREAMING_SNAKE_CASE"))]
pub struct ActiveSatellite {
    #[serde(rename(serialize = "name"))]
    pub object_name: Option<String>,
    pub norad_cat_id: Option<u32>,
    pub object_id: Option<String>,
    pub epoch: Option<String>,
    pub mean_motion: Option<f64>,
    pub eccentricity: Option<f64>,
    pub inclination: Option<f64>,
    pub ra_of_asc_node: Option<f64>,
    pub arg_of_pericenter: Option<f64>,
    pub mean_anomaly: Option<f64>,
    pub classification_type: Option<String>,
    pub element_set_no: Option<u32>,
    pub rev_at_epoch: Option<u64>,
    pub bstar: Option<f64>,
    pub mean_motion_dot: Option<f64>,
    pub ephemeris_type: Option<i32>,
    /// When this record was fetched
    #[serde(default, skip_deserializing)]
    pub timestamp: Option<DateTime<Utc>>,
}
