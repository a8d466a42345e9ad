//! Predicted trajectories and the ordered batch they are stored in

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use nalgebra::Vector3;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A single predicted position
///
/// Coordinates are kilometers in the Earth-centered inertial frame produced by
/// SGP4. They are optional so that a hand-edited or truncated batch still
/// loads; the scanner ignores samples with a missing coordinate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub time: DateTime<Utc>,
    #[serde(default)]
    pub x: Option<f64>,
    #[serde(default)]
    pub y: Option<f64>,
    #[serde(default)]
    pub z: Option<f64>,
}

impl Sample {
    pub fn new(time: DateTime<Utc>, position_km: Vector3<f64>) -> Self {
        Self {
            time,
            x: Some(position_km.x),
            y: Some(position_km.y),
            z: Some(position_km.z),
        }
    }

    /// Position in kilometers, if all three coordinates are present
    pub fn position_km(&self) -> Option<Vector3<f64>> {
        Some(Vector3::new(self.x?, self.y?, self.z?))
    }
}

/// One object's predicted samples over the prediction horizon
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trajectory {
    /// Catalog number; stored as the batch key, not inside the record
    #[serde(skip)]
    pub norad_id: String,
    #[serde(rename = "satellite_name")]
    pub name: String,
    /// The two element lines the samples were propagated from
    #[serde(default)]
    pub tle: Vec<String>,
    #[serde(rename = "predictions", default)]
    pub samples: Vec<Sample>,
}

impl Trajectory {
    pub fn new(norad_id: impl Into<String>, name: impl Into<String>, samples: Vec<Sample>) -> Self {
        Self {
            norad_id: norad_id.into(),
            name: name.into(),
            tle: Vec::new(),
            samples,
        }
    }

    pub fn with_tle(mut self, tle: [String; 2]) -> Self {
        self.tle = tle.to_vec();
        self
    }

    /// Position at a time index, `None` if out of range or malformed
    pub fn position_at(&self, index: usize) -> Option<Vector3<f64>> {
        self.samples.get(index)?.position_km()
    }
}

/// One generation of trajectories, iterated in insertion order
///
/// Insertion order is the catalog fetch order. It is part of the persisted
/// form and decides how alert pairs are labelled.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrajectoryBatch {
    entries: Vec<Trajectory>,
    index: HashMap<String, usize>,
}

impl TrajectoryBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a trajectory at the end, or replace the one with the same ID in place
    pub fn insert(&mut self, trajectory: Trajectory) {
        match self.index.get(&trajectory.norad_id) {
            Some(&pos) => self.entries[pos] = trajectory,
            None => {
                self.index
                    .insert(trajectory.norad_id.clone(), self.entries.len());
                self.entries.push(trajectory);
            }
        }
    }

    pub fn get(&self, norad_id: &str) -> Option<&Trajectory> {
        self.index.get(norad_id).map(|&pos| &self.entries[pos])
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Trajectory> {
        self.entries.iter()
    }

    /// Trajectories in batch order
    pub fn as_slice(&self) -> &[Trajectory] {
        &self.entries
    }

    /// Catalog IDs in batch order
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|t| t.norad_id.as_str())
    }
}

impl FromIterator<Trajectory> for TrajectoryBatch {
    fn from_iter<I: IntoIterator<Item = Trajectory>>(iter: I) -> Self {
        let mut batch = Self::new();
        for trajectory in iter {
            batch.insert(trajectory);
        }
        batch
    }
}

impl<'a> IntoIterator for &'a TrajectoryBatch {
    type Item = &'a Trajectory;
    type IntoIter = std::slice::Iter<'a, Trajectory>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl Serialize for TrajectoryBatch {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for trajectory in &self.entries {
            map.serialize_entry(&trajectory.norad_id, trajectory)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for TrajectoryBatch {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct BatchVisitor;

        impl<'de> Visitor<'de> for BatchVisitor {
            type Value = TrajectoryBatch;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of catalog IDs to trajectories")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut batch = TrajectoryBatch::new();
                while let Some((norad_id, mut trajectory)) =
                    access.next_entry::<String, Trajectory>()?
                {
                    trajectory.norad_id = norad_id;
                    batch.insert(trajectory);
                }
                Ok(batch)
            }
        }

        deserializer.deserialize_map(BatchVisitor)
    }
}
