//! Population statistics and run summaries.

use serde::{Deserialize, Serialize};

/// Live agents per population
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopulationCounts {
    pub macrophages: usize,
    pub bacteria: usize,
}

impl PopulationCounts {
    pub fn total(&self) -> usize {
        self.macrophages + self.bacteria
    }
}

/// One point of the population time series
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PopulationSample {
    pub time: f64,
    pub counts: PopulationCounts,
}

/// Why a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The next event lies beyond the configured maximum time
    MaxTime,
    /// No live agents are left to schedule
    Extinct,
    /// An external stop signal was raised
    Stopped,
}

/// Running totals kept by the engine
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventTotals {
    pub events_processed: u64,
    pub births: u64,
    pub deaths_eaten: u64,
    pub deaths_starved: u64,
    pub failed_divides: u64,
}

/// Outcome of a complete run
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub stop_reason: StopReason,
    pub final_time: f64,
    pub counts: PopulationCounts,
    pub totals: EventTotals,
}
