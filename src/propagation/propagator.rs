//! SGP4 propagation of element sets over a fixed time grid using satkit

use chrono::{DateTime, Datelike, Duration, TimeZone, Timelike, Utc};
use indicatif::{ProgressBar, ProgressStyle};
use nalgebra::Vector3;
use satkit::sgp4::sgp4;
use thiserror::Error;

use crate::config::ConfigError;
use crate::data::{ElementSet, Sample, Trajectory, TrajectoryBatch};

/// Earth radius in kilometers
pub const EARTH_RADIUS_KM: f64 = 6371.0;

const SECONDS_PER_DAY: u64 = 86_400;
const TLE_LINE_LEN: usize = 69;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PropagationError {
    #[error("failed to parse TLE: {reason}")]
    InvalidElements { reason: String },
    #[error("time {time} cannot be represented for propagation")]
    InvalidEpoch { time: DateTime<Utc> },
    #[error("SGP4 failed")]
    Sgp4,
    #[error("SGP4 produced a non-finite position at sample {index}")]
    NonFinite { index: usize },
}

/// Evenly spaced sample times shared by every trajectory in a batch
#[derive(Debug, Clone, PartialEq)]
pub struct TimeGrid {
    start: DateTime<Utc>,
    step_seconds: u64,
    samples: usize,
}

impl TimeGrid {
    pub fn new(start: DateTime<Utc>, step_seconds: u64, samples: usize) -> Result<Self, ConfigError> {
        if step_seconds == 0 {
            return Err(ConfigError::ZeroStep);
        }
        if samples == 0 {
            return Err(ConfigError::EmptyHorizon);
        }
        Ok(Self {
            start,
            step_seconds,
            samples,
        })
    }

    /// `days` worth of samples every `step_seconds` (1 day at 600 s is 144 samples)
    pub fn from_horizon(start: DateTime<Utc>, days: u32, step_seconds: u64) -> Result<Self, ConfigError> {
        if step_seconds == 0 {
            return Err(ConfigError::ZeroStep);
        }
        let samples = (u64::from(days) * SECONDS_PER_DAY / step_seconds) as usize;
        Self::new(start, step_seconds, samples)
    }

    /// Midnight UTC of the current day
    pub fn today_start() -> DateTime<Utc> {
        let now = Utc::now();
        Utc.with_ymd_and_hms(now.year(), now.month(), now.day(), 0, 0, 0)
            .single()
            .unwrap_or(now)
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn step_seconds(&self) -> u64 {
        self.step_seconds
    }

    pub fn len(&self) -> usize {
        self.samples
    }

    pub fn times(&self) -> impl Iterator<Item = DateTime<Utc>> + '_ {
        (0..self.samples).map(move |i| self.start + Duration::seconds((i as u64 * self.step_seconds) as i64))
    }
}

/// What happened to one attempted element set
#[derive(Debug, Clone, PartialEq)]
pub enum ObjectOutcome {
    Propagated {
        norad_id: String,
    },
    Skipped {
        norad_id: String,
        name: String,
        reason: PropagationError,
    },
}

impl ObjectOutcome {
    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped { .. })
    }
}

/// Result of propagating a list of element sets
#[derive(Debug, Clone, Default)]
pub struct PropagationReport {
    pub batch: TrajectoryBatch,
    pub outcomes: Vec<ObjectOutcome>,
}

impl PropagationReport {
    pub fn propagated_count(&self) -> usize {
        self.outcomes.len() - self.skipped_count()
    }

    pub fn skipped_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_skipped()).count()
    }
}

/// Propagates element sets over one time grid
pub struct Propagator {
    grid: TimeGrid,
    /// Grid times converted once for satkit
    epochs: Vec<satkit::Instant>,
}

impl Propagator {
    pub fn new(grid: TimeGrid) -> Result<Self, PropagationError> {
        let epochs = grid
            .times()
            .map(to_instant)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { grid, epochs })
    }

    /// Propagate a single element set over the whole grid
    pub fn propagate(&self, set: &ElementSet) -> Result<Trajectory, PropagationError> {
        let mut tle = parse_tle(set)?;

        let result = sgp4(&mut tle, &self.epochs).map_err(|_| PropagationError::Sgp4)?;

        let mut samples = Vec::with_capacity(self.grid.len());
        for (index, time) in self.grid.times().enumerate() {
            // pos is in the TEME frame, in meters
            let pos = result.pos.column(index);
            let pos_km = Vector3::new(pos[0], pos[1], pos[2]) / 1000.0;
            if !pos_km.iter().all(|c| c.is_finite()) {
                return Err(PropagationError::NonFinite { index });
            }
            samples.push(Sample::new(time, pos_km));
        }

        Ok(Trajectory::new(set.norad_id.clone(), set.display_name(), samples).with_tle(set.tle_lines()))
    }

    /// Propagate the first `max_objects` element sets in feed order.
    ///
    /// A failing object is recorded as skipped and the run continues.
    pub fn propagate_all(&self, sets: &[ElementSet], max_objects: usize) -> PropagationReport {
        let selected = &sets[..sets.len().min(max_objects)];
        let mut report = PropagationReport::default();

        log::info!(
            "Propagating {} of {} objects over {} samples from {} every {} s",
            selected.len(),
            sets.len(),
            self.grid.len(),
            self.grid.start(),
            self.grid.step_seconds()
        );

        let progress = ProgressBar::new(selected.len() as u64);
        progress.set_style(
            ProgressStyle::with_template("{elapsed_precise} {bar:40.cyan/blue} {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("##-"),
        );

        for set in selected {
            progress.set_message(set.display_name());
            log::debug!("Propagating orbit for {} (NORAD ID: {})", set.name, set.norad_id);

            match self.propagate(set) {
                Ok(trajectory) => {
                    report.batch.insert(trajectory);
                    report.outcomes.push(ObjectOutcome::Propagated {
                        norad_id: set.norad_id.clone(),
                    });
                }
                Err(reason) => {
                    log::warn!(
                        "Skipping {} (NORAD ID: {}): {}",
                        set.display_name(),
                        set.norad_id,
                        reason
                    );
                    report.outcomes.push(ObjectOutcome::Skipped {
                        norad_id: set.norad_id.clone(),
                        name: set.display_name(),
                        reason,
                    });
                }
            }
            progress.inc(1);
        }

        progress.finish_and_clear();

        log::info!(
            "Propagated {} objects, skipped {}",
            report.propagated_count(),
            report.skipped_count()
        );
        report
    }
}

/// Parse TLE data into satkit TLE
fn parse_tle(set: &ElementSet) -> Result<satkit::TLE, PropagationError> {
    check_line(&set.line1, '1')?;
    check_line(&set.line2, '2')?;

    satkit::TLE::load_2line(&set.line1, &set.line2).map_err(|e| {
        log::trace!("Failed to parse TLE for {}: {}", set.norad_id, e);
        PropagationError::InvalidElements {
            reason: e.to_string(),
        }
    })
}

/// Fixed-column layout: line number in column 1, 69 columns in total
fn check_line(line: &str, number: char) -> Result<(), PropagationError> {
    if !line.starts_with(number) || line.len() < TLE_LINE_LEN {
        return Err(PropagationError::InvalidElements {
            reason: format!("line {number} is not a {TLE_LINE_LEN}-column element line"),
        });
    }
    Ok(())
}

fn to_instant(time: DateTime<Utc>) -> Result<satkit::Instant, PropagationError> {
    let seconds = f64::from(time.second()) + f64::from(time.nanosecond()) / 1e9;
    satkit::Instant::from_datetime(
        time.year(),
        time.month() as i32,
        time.day() as i32,
        time.hour() as i32,
        time.minute() as i32,
        seconds,
    )
    .map_err(|_| PropagationError::InvalidEpoch { time })
}

#[cfg(test)]
mod tests {
    use super::*;

    const ISS_LINE1: &str = "1 25544U 98067A   08264.51782528 -.00002182  00000-0 -11606-4 0  2927";
    const ISS_LINE2: &str = "2 25544  51.6416 247.4627 0006703 130.5360 325.0288 15.72125391563537";

    fn iss() -> ElementSet {
        ElementSet::from_lines("ISS (ZARYA)", ISS_LINE1, ISS_LINE2).unwrap()
    }

    fn broken(id: &str) -> ElementSet {
        ElementSet {
            norad_id: id.to_string(),
            name: format!("BROKEN {id}"),
            line1: format!("1 {id}U garbage"),
            line2: "2 nonsense".to_string(),
        }
    }

    fn grid(samples: usize) -> TimeGrid {
        // Close to the element set epoch
        let start = Utc.with_ymd_and_hms(2008, 9, 20, 12, 0, 0).unwrap();
        TimeGrid::new(start, 600, samples).unwrap()
    }

    #[test]
    fn test_default_horizon_is_144_samples() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let grid = TimeGrid::from_horizon(start, 1, 600).unwrap();
        assert_eq!(grid.len(), 144);

        let times: Vec<_> = grid.times().collect();
        assert_eq!(times[0], start);
        assert_eq!(times[1], start + Duration::minutes(10));
        assert_eq!(times[143], start + Duration::minutes(1430));
    }

    #[test]
    fn test_grid_validation() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(TimeGrid::from_horizon(start, 1, 0), Err(ConfigError::ZeroStep));
        assert_eq!(TimeGrid::from_horizon(start, 0, 600), Err(ConfigError::EmptyHorizon));
    }

    #[test]
    fn test_propagate_iss_stays_in_leo() {
        let propagator = Propagator::new(grid(6)).unwrap();
        let trajectory = propagator.propagate(&iss()).unwrap();

        assert_eq!(trajectory.norad_id, "25544");
        assert_eq!(trajectory.name, "ISS (ZARYA)");
        assert_eq!(trajectory.tle, vec![ISS_LINE1.to_string(), ISS_LINE2.to_string()]);
        assert_eq!(trajectory.samples.len(), 6);

        for sample in &trajectory.samples {
            let radius = sample.position_km().unwrap().norm();
            let altitude = radius - EARTH_RADIUS_KM;
            assert!((300.0..600.0).contains(&altitude), "altitude {altitude} km");
        }
    }

    #[test]
    fn test_partial_failure_is_skipped_and_counted() {
        let propagator = Propagator::new(grid(3)).unwrap();
        let sets = vec![broken("00001"), iss(), broken("00002")];

        let report = propagator.propagate_all(&sets, 10);

        assert_eq!(report.batch.len(), 1);
        assert_eq!(report.propagated_count(), 1);
        assert_eq!(report.skipped_count(), 2);
        assert!(matches!(
            &report.outcomes[0],
            ObjectOutcome::Skipped { norad_id, reason: PropagationError::InvalidElements { .. }, .. }
                if norad_id == "00001"
        ));
    }

    #[test]
    fn test_object_cap_takes_first_in_feed_order() {
        let propagator = Propagator::new(grid(2)).unwrap();
        let sets = vec![broken("00001"), iss(), broken("00002")];

        let report = propagator.propagate_all(&sets, 1);

        assert_eq!(report.outcomes.len(), 1);
        assert!(report.batch.is_empty());
        assert_eq!(report.skipped_count(), 1);
    }

    #[test]
    fn test_no_element_sets_gives_empty_batch() {
        let propagator = Propagator::new(grid(2)).unwrap();
        let report = propagator.propagate_all(&[], 10);
        assert!(report.batch.is_empty());
        assert!(report.outcomes.is_empty());
    }
}
