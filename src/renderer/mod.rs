//! Orbit visualization
//!
//! Renders a trajectory batch around a reference Earth sphere into a PNG.

mod camera;
mod earth;
mod plot;
mod satellites;

pub use plot::*;
