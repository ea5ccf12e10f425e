//! Headless runner for the macrophage/bacteria simulation.

mod console;
mod telemetry;

use anyhow::{Context, Result};
use clap::Parser;
use immsim_core::SimulationConfig;
use immsim_world::Simulation;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "immsim")]
#[command(author, version, about = "Macrophage/bacteria next-event simulation on a toroidal grid", long_about = None)]
struct Cli {
    /// JSON configuration file; flags below override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Rows (and columns) of the grid
    #[arg(long)]
    grid_size: Option<i32>,

    /// Initial number of macrophages
    #[arg(long)]
    macrophages: Option<usize>,

    /// Initial number of bacteria
    #[arg(long)]
    bacteria: Option<usize>,

    /// Stop before the first event past this simulated time
    #[arg(long)]
    max_time: Option<f64>,

    /// Run until extinction or Ctrl+C
    #[arg(long, conflicts_with = "max_time")]
    unbounded: bool,

    /// Random seed
    #[arg(long)]
    seed: Option<u64>,

    /// Pause in seconds after each drawn frame
    #[arg(long)]
    delay: Option<f64>,

    /// Draw the grid every N events (0 never draws)
    #[arg(long, default_value = "0")]
    frame_every: u64,

    /// Time a macrophage survives without eating
    #[arg(long)]
    starvation_time: Option<f64>,

    /// Cap on the bacterium population
    #[arg(long)]
    max_bacteria: Option<usize>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn resolve_config(&self) -> Result<SimulationConfig> {
        let mut config = match &self.config {
            Some(path) => SimulationConfig::from_path(path)
                .with_context(|| format!("failed to load config from {}", path.display()))?,
            None => SimulationConfig::default(),
        };

        if let Some(grid_size) = self.grid_size {
            config.grid_size = grid_size;
        }
        if let Some(macrophages) = self.macrophages {
            config.initial_macrophages = macrophages;
        }
        if let Some(bacteria) = self.bacteria {
            config.initial_bacteria = bacteria;
        }
        if let Some(max_time) = self.max_time {
            config.max_time = Some(max_time);
        }
        if self.unbounded {
            config.max_time = None;
        }
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if let Some(delay) = self.delay {
            config.redraw_delay_secs = delay;
        }
        if self.starvation_time.is_some() {
            config.predator.starvation_time = self.starvation_time;
        }
        if self.max_bacteria.is_some() {
            config.prey.max_population = self.max_bacteria;
        }

        config.validate().context("invalid configuration")?;
        Ok(config)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    telemetry::init_telemetry(cli.verbose)?;

    let config = cli.resolve_config()?;
    info!(
        grid_size = config.grid_size,
        macrophages = config.initial_macrophages,
        bacteria = config.initial_bacteria,
        max_time = ?config.max_time,
        seed = config.seed,
        "Starting immsim"
    );

    let mut simulation = Simulation::new(config).context("failed to initialize simulation")?;

    let stop = simulation.stop_handle();
    ctrlc::set_handler(move || stop.stop()).context("failed to install Ctrl+C handler")?;

    let mut viewer = console::ConsoleViewer::new(cli.frame_every);
    let summary = simulation.run(&mut viewer)?;

    viewer.print_series();
    println!("{}", serde_json::to_string_pretty(&summary)?);

    info!(
        samples = viewer.history().samples().len(),
        "Shutting down"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_defaults() {
        let cli = Cli::parse_from([
            "immsim",
            "--grid-size",
            "10",
            "--macrophages",
            "3",
            "--bacteria",
            "4",
            "--seed",
            "9",
            "--starvation-time",
            "2.5",
        ]);
        let config = cli.resolve_config().unwrap();

        assert_eq!(config.grid_size, 10);
        assert_eq!(config.initial_macrophages, 3);
        assert_eq!(config.initial_bacteria, 4);
        assert_eq!(config.seed, 9);
        assert_eq!(config.predator.starvation_time, Some(2.5));
        assert_eq!(config.max_time, Some(100.0));
    }

    #[test]
    fn test_unbounded_clears_max_time() {
        let cli = Cli::parse_from(["immsim", "--unbounded"]);
        assert_eq!(cli.resolve_config().unwrap().max_time, None);
    }

    #[test]
    fn test_invalid_override_rejected() {
        let cli = Cli::parse_from(["immsim", "--grid-size", "2"]);
        assert!(cli.resolve_config().is_err());
    }
}
