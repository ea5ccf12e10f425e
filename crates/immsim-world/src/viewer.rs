//! Display collaborators notified after every processed event.

use crate::simulation::Simulation;
use immsim_core::PopulationSample;

/// Receives a redraw notification once per processed event.
///
/// Implementations read whatever they need from the simulation
/// (`live_agents`, `population_counts`, `time`). `delay_secs` is an advisory
/// pacing hint and must not influence the simulation.
pub trait Viewer {
    fn redraw(&mut self, sim: &Simulation, delay_secs: f64);
}

/// Ignores every notification
#[derive(Debug, Default, Clone, Copy)]
pub struct NullViewer;

impl Viewer for NullViewer {
    fn redraw(&mut self, _sim: &Simulation, _delay_secs: f64) {}
}

/// Population time series sampled each time the clock crosses a whole time unit
#[derive(Debug, Default, Clone)]
pub struct PopulationHistory {
    samples: Vec<PopulationSample>,
    last_update: i64,
}

impl PopulationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn samples(&self) -> &[PopulationSample] {
        &self.samples
    }
}

impl Viewer for PopulationHistory {
    fn redraw(&mut self, sim: &Simulation, _delay_secs: f64) {
        let time = sim.time();
        if time.floor() as i64 > self.last_update {
            self.samples.push(PopulationSample {
                time,
                counts: sim.population_counts(),
            });
            self.last_update += 1;
        }
    }
}

impl<V: Viewer + ?Sized> Viewer for &mut V {
    fn redraw(&mut self, sim: &Simulation, delay_secs: f64) {
        (**self).redraw(sim, delay_secs);
    }
}
