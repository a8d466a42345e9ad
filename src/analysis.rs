//! Close-approach screening over predicted trajectories
//!
//! Every unordered pair of objects is compared at every time index of the
//! shared grid. This is O(T x P) with P quadratic in the object count, which
//! is fine for the ten-object batches produced by a propagation run. Screening
//! whole catalogs would need spatial bucketing before the pair loop.

use chrono::{DateTime, Utc};
use clap::Args;
use serde::{Deserialize, Serialize};

use crate::config::{ConfigError, ThresholdKm, DEFAULT_THRESHOLD_KM};
use crate::data::TrajectoryBatch;
use crate::store::{AlertSink, StoreError, TrajectoryStore};

pub const CLOSE_APPROACH_STATUS: &str = "WARNING: Possible Close Approach!";
pub const NO_RISK_MESSAGE: &str = "No collision risks detected.";

#[derive(Args, Debug, Clone)]
pub struct CollisionArgs {
    /// Distance threshold in kilometers
    #[arg(long, default_value_t = DEFAULT_THRESHOLD_KM)]
    pub threshold_km: f64,
}

impl CollisionArgs {
    pub fn threshold(&self) -> Result<ThresholdKm, ConfigError> {
        ThresholdKm::new(self.threshold_km)
    }
}

/// Two objects closer than the threshold at one time step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloseApproach {
    pub time: DateTime<Utc>,
    #[serde(default)]
    pub norad_1: String,
    pub satellite_1: String,
    #[serde(default)]
    pub norad_2: String,
    pub satellite_2: String,
    /// Rounded to 2 decimals
    pub distance_km: f64,
    pub status: String,
}

/// What the collision query returns: the alerts, or a sentinel when there are none
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CollisionReport {
    Alerts(Vec<CloseApproach>),
    NoRisk { message: String },
}

impl CollisionReport {
    pub fn from_alerts(alerts: Vec<CloseApproach>) -> Self {
        if alerts.is_empty() {
            Self::NoRisk {
                message: NO_RISK_MESSAGE.to_string(),
            }
        } else {
            Self::Alerts(alerts)
        }
    }
}

/// Find every pair closer than `threshold` at each time index.
///
/// The first trajectory in batch order is the time reference: its sample
/// count bounds the scan and its timestamps label the alerts. Samples are
/// matched by index, not by timestamp. A pair is skipped at an index where
/// either side has no sample or the sample lacks a coordinate.
///
/// Alerts come out ordered by time index, then by pair in batch order.
pub fn detect_close_approaches(batch: &TrajectoryBatch, threshold: ThresholdKm) -> Vec<CloseApproach> {
    let trajectories = batch.as_slice();
    let Some(reference) = trajectories.first() else {
        return Vec::new();
    };

    let threshold_km = threshold.km();
    let mut alerts = Vec::new();

    for (step, reference_sample) in reference.samples.iter().enumerate() {
        for (i, a) in trajectories.iter().enumerate() {
            let Some(pos_a) = a.position_at(step) else {
                continue;
            };

            for b in &trajectories[i + 1..] {
                let Some(pos_b) = b.position_at(step) else {
                    continue;
                };

                let distance = (pos_a - pos_b).norm();
                if distance < threshold_km {
                    log::warn!(
                        "Collision Alert: {} & {} at {:.2} km ({})",
                        a.name,
                        b.name,
                        distance,
                        reference_sample.time
                    );
                    alerts.push(CloseApproach {
                        time: reference_sample.time,
                        norad_1: a.norad_id.clone(),
                        satellite_1: a.name.clone(),
                        norad_2: b.norad_id.clone(),
                        satellite_2: b.name.clone(),
                        distance_km: round_km(distance),
                        status: CLOSE_APPROACH_STATUS.to_string(),
                    });
                }
            }
        }
    }

    alerts
}

/// Screen the stored batch and replace the stored alerts with the result.
///
/// A missing batch is screened as an empty one; the (possibly empty) alert
/// list is always written.
pub fn run_collision_scan(
    store: &dyn TrajectoryStore,
    sink: &dyn AlertSink,
    threshold: ThresholdKm,
) -> Result<Vec<CloseApproach>, StoreError> {
    let batch = store.load_batch()?.unwrap_or_else(|| {
        log::warn!("No predictions stored yet, run propagation first");
        TrajectoryBatch::new()
    });

    log::info!(
        "Screening {} objects at {} km",
        batch.len(),
        threshold.km()
    );

    let alerts = detect_close_approaches(&batch, threshold);
    sink.save_alerts(&alerts)?;

    log::info!("Found {} close approaches", alerts.len());
    Ok(alerts)
}

/// Two decimals, exact halves to even
fn round_km(km: f64) -> f64 {
    (km * 100.0).round_ties_even() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Sample, Trajectory};
    use crate::store::MemoryStore;
    use chrono::{Duration, TimeZone};
    use nalgebra::Vector3;

    fn t(step: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::minutes(10 * step)
    }

    /// Trajectory along the x axis, one position per time step
    fn along_x(id: &str, xs: &[f64]) -> Trajectory {
        let samples = xs
            .iter()
            .enumerate()
            .map(|(i, &x)| Sample::new(t(i as i64), Vector3::new(7000.0 + x, 0.0, 0.0)))
            .collect();
        Trajectory::new(id, format!("SAT-{id}"), samples)
    }

    fn at(id: &str, positions: &[Vector3<f64>]) -> Trajectory {
        let samples = positions
            .iter()
            .enumerate()
            .map(|(i, p)| Sample::new(t(i as i64), *p))
            .collect();
        Trajectory::new(id, format!("SAT-{id}"), samples)
    }

    fn threshold(km: f64) -> ThresholdKm {
        ThresholdKm::new(km).unwrap()
    }

    #[test]
    fn test_empty_batch() {
        assert!(detect_close_approaches(&TrajectoryBatch::new(), ThresholdKm::default()).is_empty());
    }

    #[test]
    fn test_single_object_has_no_pairs() {
        let batch: TrajectoryBatch = [along_x("A", &[0.0, 0.0, 0.0])].into_iter().collect();
        assert!(detect_close_approaches(&batch, ThresholdKm::default()).is_empty());
    }

    #[test]
    fn test_three_step_scenario() {
        let batch: TrajectoryBatch = [
            along_x("A", &[0.0, 0.0, 0.0]),
            along_x("B", &[100.0, 30.0, 60.0]),
        ]
        .into_iter()
        .collect();

        let alerts = detect_close_approaches(&batch, threshold(50.0));

        assert_eq!(alerts.len(), 1);
        let alert = &alerts[0];
        assert_eq!(alert.time, t(1));
        assert_eq!(alert.satellite_1, "SAT-A");
        assert_eq!(alert.satellite_2, "SAT-B");
        assert_eq!(alert.norad_1, "A");
        assert_eq!(alert.norad_2, "B");
        assert_eq!(alert.distance_km, 30.0);
        assert_eq!(alert.status, CLOSE_APPROACH_STATUS);
    }

    #[test]
    fn test_pair_order_follows_batch_order() {
        // AB = 10, BC = 5, AC = 15
        let batch: TrajectoryBatch = [
            along_x("A", &[0.0]),
            along_x("B", &[10.0]),
            along_x("C", &[15.0]),
        ]
        .into_iter()
        .collect();

        let alerts = detect_close_approaches(&batch, threshold(12.0));
        let pairs: Vec<(&str, &str, f64)> = alerts
            .iter()
            .map(|x| (x.satellite_1.as_str(), x.satellite_2.as_str(), x.distance_km))
            .collect();

        assert_eq!(pairs, vec![("SAT-A", "SAT-B", 10.0), ("SAT-B", "SAT-C", 5.0)]);
    }

    #[test]
    fn test_labels_follow_pinned_order() {
        let forward: TrajectoryBatch = [along_x("A", &[0.0]), along_x("B", &[20.0])]
            .into_iter()
            .collect();
        let reverse: TrajectoryBatch = [along_x("B", &[20.0]), along_x("A", &[0.0])]
            .into_iter()
            .collect();

        let f = detect_close_approaches(&forward, ThresholdKm::default());
        let r = detect_close_approaches(&reverse, ThresholdKm::default());

        assert_eq!(f.len(), 1);
        assert_eq!(r.len(), 1);
        assert_eq!((f[0].satellite_1.as_str(), f[0].satellite_2.as_str()), ("SAT-A", "SAT-B"));
        assert_eq!((r[0].satellite_1.as_str(), r[0].satellite_2.as_str()), ("SAT-B", "SAT-A"));
        assert_eq!(f[0].distance_km, r[0].distance_km);
        assert_eq!(f[0].time, r[0].time);
    }

    #[test]
    fn test_short_trajectory_skipped_at_missing_index() {
        let batch: TrajectoryBatch = [
            along_x("A", &[0.0, 0.0, 0.0]),
            along_x("B", &[10.0, 10.0]),
            along_x("C", &[20.0, 20.0, 20.0]),
        ]
        .into_iter()
        .collect();

        let alerts = detect_close_approaches(&batch, threshold(50.0));
        let at_step_2: Vec<(&str, &str)> = alerts
            .iter()
            .filter(|a| a.time == t(2))
            .map(|a| (a.norad_1.as_str(), a.norad_2.as_str()))
            .collect();

        assert_eq!(at_step_2, vec![("A", "C")]);
        assert_eq!(alerts.len(), 3 + 3 + 1);
    }

    #[test]
    fn test_reference_length_bounds_the_scan() {
        let batch: TrajectoryBatch = [
            along_x("A", &[0.0]),
            along_x("B", &[10.0, 10.0, 10.0]),
            along_x("C", &[20.0, 20.0, 20.0]),
        ]
        .into_iter()
        .collect();

        let alerts = detect_close_approaches(&batch, threshold(50.0));
        assert_eq!(alerts.len(), 3);
        assert!(alerts.iter().all(|a| a.time == t(0)));
    }

    #[test]
    fn test_malformed_sample_skipped() {
        let mut b = along_x("B", &[10.0, 10.0]);
        b.samples[0].y = None;
        let batch: TrajectoryBatch = [along_x("A", &[0.0, 0.0]), b].into_iter().collect();

        let alerts = detect_close_approaches(&batch, threshold(50.0));
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].time, t(1));
    }

    #[test]
    fn test_distance_is_rounded_and_strictly_below_threshold() {
        let a = Vector3::new(7000.0, 0.0, 0.0);
        let b = Vector3::new(7000.0, 3.0, 4.004);
        let edge = Vector3::new(7000.0, 0.0, 50.0);

        let batch: TrajectoryBatch = [at("A", &[a, a]), at("B", &[b, edge])].into_iter().collect();
        let alerts = detect_close_approaches(&batch, threshold(50.0));

        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].distance_km, 5.0);
    }

    #[test]
    fn test_half_distances_round_to_even() {
        let origin = Vector3::zeros();
        let batch: TrajectoryBatch = [
            at("A", &[origin, origin]),
            at("B", &[Vector3::new(10.125, 0.0, 0.0), Vector3::new(0.0, 0.375, 0.0)]),
        ]
        .into_iter()
        .collect();

        let distances: Vec<f64> = detect_close_approaches(&batch, threshold(50.0))
            .iter()
            .map(|a| a.distance_km)
            .collect();

        assert_eq!(distances, vec![10.12, 0.38]);
    }

    #[test]
    fn test_alerts_ordered_by_step_then_pair() {
        let batch: TrajectoryBatch = [
            along_x("A", &[0.0, 0.0, 0.0]),
            along_x("B", &[10.0, 100.0, 40.0]),
            along_x("C", &[20.0, 30.0, 45.0]),
        ]
        .into_iter()
        .collect();

        let alerts = detect_close_approaches(&batch, threshold(50.0));
        let sequence: Vec<(DateTime<Utc>, &str, &str)> = alerts
            .iter()
            .map(|a| (a.time, a.satellite_1.as_str(), a.satellite_2.as_str()))
            .collect();

        assert_eq!(
            sequence,
            vec![
                (t(0), "SAT-A", "SAT-B"),
                (t(0), "SAT-A", "SAT-C"),
                (t(0), "SAT-B", "SAT-C"),
                (t(1), "SAT-A", "SAT-C"),
                (t(2), "SAT-A", "SAT-B"),
                (t(2), "SAT-A", "SAT-C"),
                (t(2), "SAT-B", "SAT-C"),
            ]
        );
    }

    #[test]
    fn test_scan_is_deterministic() {
        let batch: TrajectoryBatch = [
            along_x("A", &[0.0, 5.0, 9.0]),
            along_x("B", &[1.0, 40.0, 3.0]),
            along_x("C", &[2.0, 2.0, 2.0]),
        ]
        .into_iter()
        .collect();

        let first = serde_json::to_string(&detect_close_approaches(&batch, threshold(50.0))).unwrap();
        let second = serde_json::to_string(&detect_close_approaches(&batch, threshold(50.0))).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_run_scan_always_saves() {
        let store: MemoryStore<TrajectoryBatch> = MemoryStore::new();
        let sink: MemoryStore<Vec<CloseApproach>> = MemoryStore::new();

        // Nothing stored yet
        let alerts = run_collision_scan(&store, &sink, ThresholdKm::default()).unwrap();
        assert!(alerts.is_empty());
        assert_eq!(sink.save_count(), 1);

        // Empty batch stored
        store.save_batch(&TrajectoryBatch::new()).unwrap();
        run_collision_scan(&store, &sink, ThresholdKm::default()).unwrap();
        assert_eq!(sink.save_count(), 2);
        assert!(sink.load_alerts().unwrap().is_empty());
    }

    #[test]
    fn test_run_scan_replaces_previous_alerts() {
        let store: MemoryStore<TrajectoryBatch> = MemoryStore::new();
        let sink: MemoryStore<Vec<CloseApproach>> = MemoryStore::new();

        let close: TrajectoryBatch = [along_x("A", &[0.0]), along_x("B", &[1.0])].into_iter().collect();
        store.save_batch(&close).unwrap();
        assert_eq!(run_collision_scan(&store, &sink, threshold(50.0)).unwrap().len(), 1);
        assert_eq!(sink.load_alerts().unwrap().len(), 1);

        let apart: TrajectoryBatch = [along_x("A", &[0.0]), along_x("B", &[500.0])].into_iter().collect();
        store.save_batch(&apart).unwrap();
        assert!(run_collision_scan(&store, &sink, threshold(50.0)).unwrap().is_empty());
        assert!(sink.load_alerts().unwrap().is_empty());
    }

    #[test]
    fn test_non_positive_threshold_rejected_by_args() {
        for km in [0.0, -1.0] {
            let args = CollisionArgs { threshold_km: km };
            assert_eq!(args.threshold(), Err(ConfigError::InvalidThreshold(km)));
        }
    }

    #[test]
    fn test_report_sentinel() {
        let report = CollisionReport::from_alerts(Vec::new());
        assert_eq!(
            serde_json::to_value(&report).unwrap(),
            serde_json::json!({ "message": "No collision risks detected." })
        );

        let batch: TrajectoryBatch = [along_x("A", &[0.0]), along_x("B", &[1.0])].into_iter().collect();
        let report = CollisionReport::from_alerts(detect_close_approaches(&batch, threshold(50.0)));
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value[0]["distance_km"], 1.0);
    }
}
