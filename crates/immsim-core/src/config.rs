//! Configuration types for the simulation.

use crate::error::{Error, Result};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Distribution of the offset added to the clock when an event is re-scheduled
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DelayDistribution {
    /// Uniform on `[low, high)`
    Uniform { low: f64, high: f64 },
    /// Exponential with the given mean
    Exponential { mean: f64 },
    /// Constant offset; draws nothing from the generator
    Fixed { value: f64 },
}

impl Default for DelayDistribution {
    fn default() -> Self {
        DelayDistribution::Uniform { low: 0.0, high: 1.0 }
    }
}

impl DelayDistribution {
    /// Draw one offset. Uniform and exponential consume exactly one `f64` from `rng`.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        match *self {
            DelayDistribution::Uniform { low, high } => low + rng.gen::<f64>() * (high - low),
            DelayDistribution::Exponential { mean } => {
                let u: f64 = rng.gen();
                -mean * (1.0 - u).ln()
            }
            DelayDistribution::Fixed { value } => value,
        }
    }

    fn validate(&self, name: &str) -> Result<()> {
        let ok = match *self {
            DelayDistribution::Uniform { low, high } => {
                low.is_finite() && high.is_finite() && low >= 0.0 && high > low
            }
            DelayDistribution::Exponential { mean } => mean.is_finite() && mean > 0.0,
            DelayDistribution::Fixed { value } => value.is_finite() && value > 0.0,
        };
        if ok {
            Ok(())
        } else {
            Err(Error::InvalidConfig(format!("{name}: invalid distribution {self:?}")))
        }
    }
}

/// Rules governing the predator population
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PredatorRules {
    /// Time a macrophage survives without eating. `None` means macrophages never die.
    pub starvation_time: Option<f64>,
}

/// Rules governing the prey population
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PreyRules {
    /// Cap on live bacteria; divide events produce no offspring at the cap.
    /// `None` leaves growth bounded only by free cells.
    pub max_population: Option<usize>,
}

/// Simulation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Rows and columns of the square toroidal grid
    pub grid_size: i32,
    /// Macrophages placed at start
    pub initial_macrophages: usize,
    /// Bacteria placed at start
    pub initial_bacteria: usize,
    /// Stop before processing the first event later than this. `None` runs until extinction.
    pub max_time: Option<f64>,
    /// Random seed for reproducibility
    pub seed: u64,
    /// Advisory pacing delay handed to the display after every event
    pub redraw_delay_secs: f64,
    /// Events between population log lines (0 disables them)
    pub snapshot_interval: u64,
    /// Offset distribution for move events
    pub move_delay: DelayDistribution,
    /// Offset distribution for divide events
    pub divide_delay: DelayDistribution,
    pub predator: PredatorRules,
    pub prey: PreyRules,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            grid_size: 40,
            initial_macrophages: 50,
            initial_bacteria: 100,
            max_time: Some(100.0),
            seed: 12345,
            redraw_delay_secs: 0.01,
            snapshot_interval: 1000,
            move_delay: DelayDistribution::default(),
            divide_delay: DelayDistribution::default(),
            predator: PredatorRules::default(),
            prey: PreyRules::default(),
        }
    }
}

impl SimulationConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    pub fn cell_count(&self) -> usize {
        (self.grid_size.max(0) as usize).pow(2)
    }

    pub fn validate(&self) -> Result<()> {
        if self.grid_size <= 0 {
            return Err(Error::InvalidConfig(format!(
                "grid_size must be positive, got {}",
                self.grid_size
            )));
        }
        if self.grid_size.checked_mul(self.grid_size).is_none() {
            return Err(Error::InvalidConfig(format!(
                "grid_size {} overflows the cell index",
                self.grid_size
            )));
        }

        // Initial placement puts every agent on its own empty cell.
        let cells = self.cell_count();
        if self.initial_macrophages + self.initial_bacteria > cells {
            return Err(Error::InvalidConfig(format!(
                "{} macrophages / {} bacteria do not fit on {} cells",
                self.initial_macrophages, self.initial_bacteria, cells
            )));
        }

        if let Some(max_time) = self.max_time {
            if max_time.is_nan() || max_time < 0.0 {
                return Err(Error::InvalidConfig(format!(
                    "max_time must be non-negative, got {max_time}"
                )));
            }
        }

        if !self.redraw_delay_secs.is_finite() || self.redraw_delay_secs < 0.0 {
            return Err(Error::InvalidConfig(format!(
                "redraw_delay_secs must be non-negative, got {}",
                self.redraw_delay_secs
            )));
        }

        self.move_delay.validate("move_delay")?;
        self.divide_delay.validate("divide_delay")?;

        if let Some(limit) = self.predator.starvation_time {
            if !limit.is_finite() || limit <= 0.0 {
                return Err(Error::InvalidConfig(format!(
                    "predator.starvation_time must be positive, got {limit}"
                )));
            }
        }

        Ok(())
    }
}
