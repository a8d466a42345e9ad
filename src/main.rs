//! orbitwatch - active satellite tracking and close-approach screening
//!
//! Fetches element sets for active satellites, predicts their positions with
//! SGP4, flags pairs that come closer than a distance threshold and renders
//! the predicted orbits around the Earth.

mod analysis;
mod cli;
mod config;
mod data;
mod propagation;
mod renderer;
mod store;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;

use analysis::{run_collision_scan, CollisionReport};
use cli::{Cli, Command, FeedArgs, PropagateArgs};
use config::{StorageConfig, ThresholdKm};
use data::{fetch_or_empty, CelestrakFeed, ElementSetFeed, TleFileFeed};
use propagation::{PropagationReport, Propagator, TimeGrid};
use renderer::{render_orbits, RenderError, RenderOptions};
use store::{AlertSink, JsonFileStore, TrajectoryStore};

/// The persisted stages of one storage directory
struct Stores {
    config: StorageConfig,
    predictions: JsonFileStore,
    alerts: JsonFileStore,
}

impl Stores {
    fn new(config: StorageConfig) -> Self {
        Self {
            predictions: JsonFileStore::new(&config.predictions_path),
            alerts: JsonFileStore::new(&config.alerts_path),
            config,
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let stores = Stores::new(StorageConfig::in_dir(&cli.storage_dir));

    match cli.command {
        Command::Satellites(feed) => list_satellites(&feed),
        Command::Propagate(args) => {
            let grid = args.time_grid()?;
            let cap = args.object_cap()?;
            let report = propagate(&args, grid, cap, &stores)?;
            print_json(&report.batch)
        }
        Command::Predictions => {
            let batch = stores
                .predictions
                .load_batch()
                .context("Failed to load stored predictions")?
                .unwrap_or_default();
            print_json(&batch)
        }
        Command::Render(args) => {
            let options = args.options()?;
            render(&stores, &options)
        }
        Command::Collisions(args) => {
            let threshold = args.threshold()?;
            let alerts = screen(&stores, threshold)?;
            print_json(&CollisionReport::from_alerts(alerts))
        }
        Command::Alerts => {
            let alerts = stores
                .alerts
                .load_alerts()
                .context("Failed to load stored alerts")?;
            print_json(&CollisionReport::from_alerts(alerts))
        }
        Command::Run {
            propagate: propagate_args,
            collisions,
            render: render_args,
        } => {
            // Validate everything before any work starts
            let grid = propagate_args.time_grid()?;
            let cap = propagate_args.object_cap()?;
            let threshold = collisions.threshold()?;
            let options = render_args.options()?;

            propagate(&propagate_args, grid, cap, &stores)?;
            let alerts = screen(&stores, threshold)?;
            render(&stores, &options)?;
            print_json(&CollisionReport::from_alerts(alerts))
        }
    }
}

fn feed_from_args(args: &FeedArgs) -> Result<Box<dyn ElementSetFeed>> {
    Ok(match &args.tle_file {
        Some(path) => Box::new(TleFileFeed::new(path)),
        None => Box::new(
            CelestrakFeed::with_urls(args.timeout(), &args.tle_url, &args.json_url)
                .context("Failed to build HTTP client")?,
        ),
    })
}

fn list_satellites(args: &FeedArgs) -> Result<()> {
    if args.tle_file.is_some() {
        let feed = feed_from_args(args)?;
        let sets: Vec<_> = fetch_or_empty(feed.as_ref())
            .into_iter()
            .map(|s| serde_json::json!({ "name": s.name, "norad_cat_id": s.norad_id }))
            .collect();
        return print_json(&sets);
    }

    let feed = CelestrakFeed::with_urls(args.timeout(), &args.tle_url, &args.json_url)
        .context("Failed to build HTTP client")?;
    let satellites = feed
        .active_satellites()
        .context("Failed to fetch active satellites")?;
    print_json(&satellites)
}

fn propagate(
    args: &PropagateArgs,
    grid: TimeGrid,
    cap: usize,
    stores: &Stores,
) -> Result<PropagationReport> {
    let feed = feed_from_args(&args.feed)?;
    let sets = fetch_or_empty(feed.as_ref());

    let propagator = Propagator::new(grid).context("Failed to set up propagation time grid")?;
    let report = propagator.propagate_all(&sets, cap);

    stores
        .predictions
        .save_batch(&report.batch)
        .with_context(|| format!("Failed to save predictions to {:?}", stores.predictions.path()))?;
    Ok(report)
}

fn screen(stores: &Stores, threshold: ThresholdKm) -> Result<Vec<analysis::CloseApproach>> {
    run_collision_scan(&stores.predictions, &stores.alerts, threshold).with_context(|| {
        format!(
            "Collision screening of {:?} into {:?} failed",
            stores.predictions.path(),
            stores.alerts.path()
        )
    })
}

fn render(stores: &Stores, options: &RenderOptions) -> Result<()> {
    let batch = stores
        .predictions
        .load_batch()
        .context("Failed to load stored predictions")?
        .unwrap_or_default();

    match render_orbits(&batch, &stores.config.visualization_path, options) {
        Ok(()) => {
            println!("{}", stores.config.visualization_path.display());
            Ok(())
        }
        Err(RenderError::NoData) => {
            log::error!("Visualization could not be generated: no predictions");
            Ok(())
        }
        Err(e) => Err(e).context("Failed to render orbit plot"),
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{}", json);
    Ok(())
}
