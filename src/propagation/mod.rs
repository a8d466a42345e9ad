//! Orbital propagation module
//!
//! Element sets are propagated with SGP4 via satkit onto a shared time grid,
//! producing one trajectory per object. Objects that fail to propagate are
//! reported as skipped instead of aborting the batch.
//!
//! # Example
//!
//! ```ignore
//! let grid = TimeGrid::from_horizon(TimeGrid::today_start(), 1, 600)?;
//! let propagator = Propagator::new(grid)?;
//! let report = propagator.propagate_all(&element_sets, 10);
//! log::info!("skipped {}", report.skipped_count());
//! ```

mod propagator;

pub use propagator::*;
