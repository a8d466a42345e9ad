//! Command line interface

use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};

use crate::analysis::CollisionArgs;
use crate::config::{ConfigError, DEFAULT_DAYS, DEFAULT_MAX_OBJECTS, DEFAULT_STEP_SECONDS};
use crate::data::{CELESTRAK_ACTIVE_JSON_URL, CELESTRAK_ACTIVE_TLE_URL};
use crate::propagation::TimeGrid;
use crate::renderer::RenderOptions;

#[derive(Parser, Debug)]
#[command(name = "orbitwatch", version, about = "Track active satellites and flag close approaches")]
pub struct Cli {
    /// Directory holding predictions, alerts and the orbit plot
    #[arg(long, global = true, env = "ORBITWATCH_STORAGE_DIR", default_value = "storage")]
    pub storage_dir: PathBuf,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List active satellites from the GP feed
    Satellites(FeedArgs),
    /// Propagate the first active satellites and store the predicted positions
    Propagate(PropagateArgs),
    /// Print the stored predicted positions
    Predictions,
    /// Render the stored predictions to a PNG
    Render(RenderArgs),
    /// Screen the stored predictions for close approaches and store the alerts
    Collisions(CollisionArgs),
    /// Print the alerts of the last screening
    Alerts,
    /// Propagate, screen and render in one pass
    Run {
        #[command(flatten)]
        propagate: PropagateArgs,
        #[command(flatten)]
        collisions: CollisionArgs,
        #[command(flatten)]
        render: RenderArgs,
    },
}

#[derive(Args, Debug, Clone)]
pub struct FeedArgs {
    /// Read element sets from a local 3-line TLE file instead of the network
    #[arg(long)]
    pub tle_file: Option<PathBuf>,
    /// GP feed in TLE format
    #[arg(long, default_value = CELESTRAK_ACTIVE_TLE_URL)]
    pub tle_url: String,
    /// GP feed in JSON format
    #[arg(long, default_value = CELESTRAK_ACTIVE_JSON_URL)]
    pub json_url: String,
    /// Network timeout in seconds
    #[arg(long, default_value_t = 30)]
    pub timeout_secs: u64,
}

impl FeedArgs {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Args, Debug, Clone)]
pub struct PropagateArgs {
    #[command(flatten)]
    pub feed: FeedArgs,
    /// Number of element sets to propagate, in feed order
    #[arg(long, default_value_t = DEFAULT_MAX_OBJECTS)]
    pub max_objects: usize,
    /// Prediction horizon in days
    #[arg(long, default_value_t = DEFAULT_DAYS)]
    pub days: u32,
    /// Spacing between samples in seconds
    #[arg(long, default_value_t = DEFAULT_STEP_SECONDS)]
    pub step_seconds: u64,
    /// First sample time (RFC 3339); defaults to 00:00 UTC today
    #[arg(long)]
    pub start: Option<DateTime<Utc>>,
}

impl PropagateArgs {
    pub fn time_grid(&self) -> Result<TimeGrid, ConfigError> {
        let start = self.start.unwrap_or_else(TimeGrid::today_start);
        TimeGrid::from_horizon(start, self.days, self.step_seconds)
    }

    pub fn object_cap(&self) -> Result<usize, ConfigError> {
        if self.max_objects == 0 {
            return Err(ConfigError::ZeroObjectCap);
        }
        Ok(self.max_objects)
    }
}

#[derive(Args, Debug, Clone)]
pub struct RenderArgs {
    /// Image width in pixels
    #[arg(long, default_value_t = 1000)]
    pub width: u32,
    /// Image height in pixels
    #[arg(long, default_value_t = 800)]
    pub height: u32,
}

impl RenderArgs {
    pub fn options(&self) -> Result<RenderOptions, ConfigError> {
        RenderOptions::new(self.width, self.height)
    }
}
