//! Terminal viewer: periodic ASCII frames plus the population time series.

use immsim_world::{PopulationHistory, Simulation, Viewer};
use std::time::Duration;

/// Sleep length for a frame, or `None` when the delay is zero or not representable.
fn pacing(delay_secs: f64) -> Option<Duration> {
    Duration::try_from_secs_f64(delay_secs)
        .ok()
        .filter(|pause| !pause.is_zero())
}

pub struct ConsoleViewer {
    frame_every: u64,
    redraws: u64,
    history: PopulationHistory,
}

impl ConsoleViewer {
    /// `frame_every` is the number of events between frames; 0 never draws.
    pub fn new(frame_every: u64) -> Self {
        Self {
            frame_every,
            redraws: 0,
            history: PopulationHistory::new(),
        }
    }

    pub fn history(&self) -> &PopulationHistory {
        &self.history
    }

    fn draw_frame(&self, sim: &Simulation) {
        let counts = sim.population_counts();
        let horizon = match sim.max_time() {
            Some(max_time) => format!("/{max_time}"),
            None => String::new(),
        };
        println!(
            "t={:.3}{}  macrophages={}  bacteria={}",
            sim.time(),
            horizon,
            counts.macrophages,
            counts.bacteria
        );
        println!("{}", sim.grid().render());
    }

    /// One line per sampled time unit
    pub fn print_series(&self) {
        println!("{:>8} {:>12} {:>10}", "time", "macrophages", "bacteria");
        for sample in self.history.samples() {
            println!(
                "{:>8.2} {:>12} {:>10}",
                sample.time, sample.counts.macrophages, sample.counts.bacteria
            );
        }
    }
}

impl Viewer for ConsoleViewer {
    fn redraw(&mut self, sim: &Simulation, delay_secs: f64) {
        self.history.redraw(sim, delay_secs);
        self.redraws += 1;

        if self.frame_every > 0 && self.redraws % self.frame_every == 0 {
            self.draw_frame(sim);
            // Pacing only matters when something is on screen.
            if let Some(pause) = pacing(delay_secs) {
                std::thread::sleep(pause);
            }
        }
    }
}
