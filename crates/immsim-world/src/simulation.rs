//! Next-event simulation engine.

use crate::agent::Agent;
use crate::driver::Driver;
use crate::grid::Grid;
use crate::viewer::Viewer;
use immsim_core::{
    AgentId, AgentKind, AgentSnapshot, Error, EventKind, EventRecord, EventTotals,
    PopulationCounts, Position, Result, RunSummary, SimulationConfig, StopReason,
};
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, error, event, info, instrument, trace, Level};

/// Cloneable flag that asks a running simulation to stop before its next event
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

pub struct Simulation {
    config: SimulationConfig,
    grid: Grid,
    agents: BTreeMap<AgentId, Agent>,
    driver: Driver,
    rng: ChaCha8Rng,
    time: f64,
    next_id: AgentId,
    counts: PopulationCounts,
    totals: EventTotals,
    stop: StopHandle,
}

impl Simulation {
    /// Build a simulation with agents scattered at random over empty cells:
    /// macrophages first, then bacteria.
    pub fn new(config: SimulationConfig) -> Result<Self> {
        let mut sim = Self::empty(config)?;
        let size = sim.grid.size;

        for kind in [AgentKind::Macrophage, AgentKind::Bacterium] {
            let wanted = match kind {
                AgentKind::Macrophage => sim.config.initial_macrophages,
                AgentKind::Bacterium => sim.config.initial_bacteria,
            };
            for _ in 0..wanted {
                // Validation guarantees a free cell exists.
                let pos = loop {
                    let pos = Position::new(sim.rng.gen_range(0..size), sim.rng.gen_range(0..size));
                    if !sim.grid.get(pos).is_occupied() {
                        break pos;
                    }
                };
                sim.spawn(kind, pos)?;
            }
        }

        info!(
            grid_size = size,
            macrophages = sim.counts.macrophages,
            bacteria = sim.counts.bacteria,
            seed = sim.config.seed,
            "Simulation initialized"
        );
        Ok(sim)
    }

    /// Build a simulation with agents at fixed positions. The initial counts in
    /// `config` are replaced by the counts of `placements`.
    pub fn with_placements(
        mut config: SimulationConfig,
        placements: &[(AgentKind, Position)],
    ) -> Result<Self> {
        config.initial_macrophages = 0;
        config.initial_bacteria = 0;
        let mut sim = Self::empty(config)?;
        for &(kind, pos) in placements {
            sim.spawn(kind, pos)?;
        }
        sim.config.initial_macrophages = sim.counts.macrophages;
        sim.config.initial_bacteria = sim.counts.bacteria;
        Ok(sim)
    }

    fn empty(config: SimulationConfig) -> Result<Self> {
        config.validate()?;
        let rng = ChaCha8Rng::seed_from_u64(config.seed);
        let grid = Grid::new(config.grid_size);

        Ok(Self {
            config,
            grid,
            agents: BTreeMap::new(),
            driver: Driver::new(),
            rng,
            time: 0.0,
            next_id: AgentId(1),
            counts: PopulationCounts::default(),
            totals: EventTotals::default(),
            stop: StopHandle::default(),
        })
    }

    /// Create an agent at `pos`, schedule its first events from the current clock and queue it.
    fn spawn(&mut self, kind: AgentKind, pos: Position) -> Result<AgentId> {
        let id = self.next_id;
        let mut agent = Agent::new(id, kind);
        self.grid.place(&mut agent, pos)?;
        self.next_id = id.next();

        agent.record_meal(self.time);
        agent.schedule_next_move(self.time, &self.config.move_delay, &mut self.rng);
        if kind == AgentKind::Bacterium {
            agent.schedule_next_divide(self.time, &self.config.divide_delay, &mut self.rng);
        }

        self.driver.reinsert(&agent);
        self.agents.insert(id, agent);
        match kind {
            AgentKind::Macrophage => self.counts.macrophages += 1,
            AgentKind::Bacterium => self.counts.bacteria += 1,
        }
        Ok(id)
    }

    /// Take an agent off the grid, out of the arena and out of the queue.
    fn destroy(&mut self, id: AgentId) -> Result<Agent> {
        let agent = self.agents.remove(&id).ok_or(Error::UnknownAgent(id))?;
        self.grid.vacate(agent.position()?, agent.kind);
        self.driver.remove(id);
        match agent.kind {
            AgentKind::Macrophage => self.counts.macrophages -= 1,
            AgentKind::Bacterium => self.counts.bacteria -= 1,
        }
        Ok(agent)
    }

    /// Run until the maximum time is passed, every agent is gone, or a stop is requested.
    #[instrument(skip(self, viewer), fields(seed = self.config.seed, max_time = ?self.config.max_time))]
    pub fn run(&mut self, viewer: &mut dyn Viewer) -> Result<RunSummary> {
        info!(
            macrophages = self.counts.macrophages,
            bacteria = self.counts.bacteria,
            "Starting simulation"
        );

        let stop_reason = loop {
            if self.stop.is_stopped() {
                break StopReason::Stopped;
            }

            let next_time = match self.driver.peek_earliest() {
                Ok((_, time)) => time,
                Err(Error::EmptyQueue) => break StopReason::Extinct,
                Err(e) => return Err(e),
            };
            if self.config.max_time.is_some_and(|max| next_time > max) {
                break StopReason::MaxTime;
            }

            if let Err(e) = self.step_checked() {
                if e.is_invariant_violation() {
                    self.log_diagnostics(&e);
                }
                return Err(e);
            }

            let interval = self.config.snapshot_interval;
            if interval > 0 && self.totals.events_processed % interval == 0 {
                self.emit_population_metrics();
            }

            viewer.redraw(self, self.config.redraw_delay_secs);
        };

        let summary = self.summary(stop_reason);
        self.emit_episode_summary(&summary);
        Ok(summary)
    }

    fn step_checked(&mut self) -> Result<EventRecord> {
        let record = self.step()?;
        if cfg!(debug_assertions) {
            self.check_invariants()?;
        }
        Ok(record)
    }

    /// Process exactly one event: the earliest entry in the queue.
    pub fn step(&mut self) -> Result<EventRecord> {
        let (id, time) = self.driver.peek_earliest()?;
        debug_assert!(time >= self.time, "clock moved backwards: {} -> {}", self.time, time);
        self.time = time;

        let agent = self.agents.get(&id).ok_or(Error::UnknownAgent(id))?;
        let kind = EventKind::dispatch(agent.kind, agent.next_channel());
        debug!(agent_id = %id, event_kind = %kind, time, "Dispatching event");

        let kind = match kind {
            EventKind::BacteriumMove => self.bacterium_move(id)?,
            EventKind::BacteriumDivide => self.bacterium_divide(id)?,
            EventKind::MacrophageMove | EventKind::MacrophageStarve => self.macrophage_move(id)?,
            EventKind::MacrophageEat => self.macrophage_eat(id)?,
        };

        self.totals.events_processed += 1;
        Ok(EventRecord {
            agent_id: id,
            kind,
            time,
        })
    }

    fn bacterium_move(&mut self, id: AgentId) -> Result<EventKind> {
        let time = self.time;
        let agent = self.agents.get_mut(&id).ok_or(Error::UnknownAgent(id))?;
        let from = agent.position()?;
        let to = agent.calculate_move(&self.grid, &mut self.rng)?;

        self.grid.vacate(from, AgentKind::Bacterium);
        self.grid.place(agent, to)?;
        agent.schedule_next_move(time, &self.config.move_delay, &mut self.rng);
        self.driver.reinsert(agent);
        trace!(agent_id = %id, %from, %to, "Bacterium moved");

        if let Some(predator) = self.grid.get(to).occupant(AgentKind::Macrophage) {
            self.schedule_eat(predator)?;
        }
        Ok(EventKind::BacteriumMove)
    }

    fn bacterium_divide(&mut self, id: AgentId) -> Result<EventKind> {
        let time = self.time;
        let at_cap = self
            .config
            .prey
            .max_population
            .is_some_and(|cap| self.counts.bacteria >= cap);

        let agent = self.agents.get_mut(&id).ok_or(Error::UnknownAgent(id))?;
        agent.schedule_next_divide(time, &self.config.divide_delay, &mut self.rng);
        let here = agent.position()?;
        let target = if at_cap {
            here
        } else {
            agent.calculate_move(&self.grid, &mut self.rng)?
        };
        self.driver.reinsert(agent);

        if target == here {
            self.totals.failed_divides += 1;
            let reason = if at_cap { "max_population_reached" } else { "no_free_neighbor" };
            event!(
                Level::DEBUG,
                counter_name = "divide_failures",
                counter_value = 1,
                failure_reason = reason,
                agent_id = %id,
                time,
                "Divide produced no offspring"
            );
            return Ok(EventKind::BacteriumDivide);
        }

        let child = self.spawn(AgentKind::Bacterium, target)?;
        self.totals.births += 1;
        debug!(parent_id = %id, child_id = %child, position = %target, time, "Bacterium divided");

        if let Some(predator) = self.grid.get(target).occupant(AgentKind::Macrophage) {
            self.schedule_eat(predator)?;
        }
        Ok(EventKind::BacteriumDivide)
    }

    fn macrophage_move(&mut self, id: AgentId) -> Result<EventKind> {
        let time = self.time;
        let agent = self.agents.get(&id).ok_or(Error::UnknownAgent(id))?;

        if agent.is_starving(time, self.config.predator.starvation_time) {
            let dead = self.destroy(id)?;
            self.totals.deaths_starved += 1;
            debug!(
                agent_id = %id,
                last_meal = dead.last_meal(),
                time,
                "Macrophage starved"
            );
            return Ok(EventKind::MacrophageStarve);
        }

        let agent = self.agents.get_mut(&id).ok_or(Error::UnknownAgent(id))?;
        let from = agent.position()?;
        let to = agent.calculate_move(&self.grid, &mut self.rng)?;

        self.grid.vacate(from, AgentKind::Macrophage);
        self.grid.place(agent, to)?;
        if self.grid.get(to).has(AgentKind::Bacterium) {
            agent.schedule_eat(time);
        } else {
            agent.schedule_next_move(time, &self.config.move_delay, &mut self.rng);
        }
        self.driver.reinsert(agent);
        trace!(agent_id = %id, %from, %to, "Macrophage moved");

        Ok(EventKind::MacrophageMove)
    }

    fn macrophage_eat(&mut self, id: AgentId) -> Result<EventKind> {
        let time = self.time;
        let here = self
            .agents
            .get(&id)
            .ok_or(Error::UnknownAgent(id))?
            .position()?;

        if let Some(prey) = self.grid.get(here).occupant(AgentKind::Bacterium) {
            self.destroy(prey)?;
            self.totals.deaths_eaten += 1;
            debug!(agent_id = %id, prey_id = %prey, position = %here, time, "Macrophage ate bacterium");
            if let Some(agent) = self.agents.get_mut(&id) {
                agent.record_meal(time);
            }
        }

        let agent = self.agents.get_mut(&id).ok_or(Error::UnknownAgent(id))?;
        agent.cant_eat(time, &self.config.move_delay, &mut self.rng);
        self.driver.reinsert(agent);
        Ok(EventKind::MacrophageEat)
    }

    fn schedule_eat(&mut self, predator: AgentId) -> Result<()> {
        let agent = self.agents.get_mut(&predator).ok_or(Error::UnknownAgent(predator))?;
        agent.schedule_eat(self.time);
        self.driver.reinsert(agent);
        trace!(agent_id = %predator, time = self.time, "Eat scheduled");
        Ok(())
    }

    /// Verify grid occupancy, agent positions and queue membership against each other.
    pub fn check_invariants(&self) -> Result<()> {
        for cell in self.grid.iter() {
            for kind in [AgentKind::Macrophage, AgentKind::Bacterium] {
                let Some(id) = cell.occupant(kind) else {
                    continue;
                };
                let agent = self.agents.get(&id).ok_or(Error::UnknownAgent(id))?;
                if agent.kind != kind || agent.position()? != cell.position {
                    return Err(Error::OccupancyViolation {
                        row: cell.position.row,
                        col: cell.position.col,
                        kind,
                        occupant: id,
                    });
                }
            }
        }

        let mut counts = PopulationCounts::default();
        for (id, agent) in &self.agents {
            let pos = agent.position()?;
            if self.grid.get(pos).occupant(agent.kind) != Some(*id) {
                return Err(Error::InvalidPlacement(*id));
            }
            match self.driver.scheduled_time(*id) {
                Some(t) if t.total_cmp(&agent.next_time()).is_eq() => {}
                Some(t) => {
                    return Err(Error::QueueInconsistency(format!(
                        "agent {id} queued at {t} but next event is {}",
                        agent.next_time()
                    )))
                }
                None => {
                    return Err(Error::QueueInconsistency(format!("agent {id} missing from queue")))
                }
            }
            match agent.kind {
                AgentKind::Macrophage => counts.macrophages += 1,
                AgentKind::Bacterium => counts.bacteria += 1,
            }
        }

        if self.driver.len() != self.agents.len() {
            return Err(Error::QueueInconsistency(format!(
                "{} queue entries for {} live agents",
                self.driver.len(),
                self.agents.len()
            )));
        }
        if counts != self.counts {
            return Err(Error::QueueInconsistency(format!(
                "population counters {:?} disagree with arena {:?}",
                self.counts, counts
            )));
        }
        Ok(())
    }

    fn log_diagnostics(&self, err: &Error) {
        error!(
            error = %err,
            time = self.time,
            events_processed = self.totals.events_processed,
            "Simulation invariant violated\n-- event queue --\n{}-- grid --\n{}",
            self.driver.dump(&self.agents),
            self.grid.render()
        );
    }

    fn emit_population_metrics(&self) {
        info!(
            event = "population_metrics",
            time = self.time,
            events_processed = self.totals.events_processed,
            macrophages = self.counts.macrophages,
            bacteria = self.counts.bacteria,
            births = self.totals.births,
            deaths_eaten = self.totals.deaths_eaten,
            deaths_starved = self.totals.deaths_starved,
            "Population metrics snapshot"
        );

        event!(
            Level::INFO,
            gauge_name = "population_bacteria",
            gauge_value = self.counts.bacteria,
            time = self.time,
            "Bacteria gauge"
        );

        event!(
            Level::INFO,
            gauge_name = "population_macrophages",
            gauge_value = self.counts.macrophages,
            time = self.time,
            "Macrophage gauge"
        );
    }

    fn emit_episode_summary(&self, summary: &RunSummary) {
        info!(
            event = "episode_summary",
            stop_reason = ?summary.stop_reason,
            final_time = summary.final_time,
            events_processed = summary.totals.events_processed,
            macrophages = summary.counts.macrophages,
            bacteria = summary.counts.bacteria,
            births = summary.totals.births,
            deaths_eaten = summary.totals.deaths_eaten,
            deaths_starved = summary.totals.deaths_starved,
            failed_divides = summary.totals.failed_divides,
            "Simulation complete"
        );
    }

    fn summary(&self, stop_reason: StopReason) -> RunSummary {
        RunSummary {
            stop_reason,
            final_time: self.time,
            counts: self.counts,
            totals: self.totals,
        }
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn max_time(&self) -> Option<f64> {
        self.config.max_time
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn driver(&self) -> &Driver {
        &self.driver
    }

    pub fn agent(&self, id: AgentId) -> Option<&Agent> {
        self.agents.get(&id)
    }

    pub fn totals(&self) -> EventTotals {
        self.totals
    }

    pub fn population_counts(&self) -> PopulationCounts {
        self.counts
    }

    /// Every live agent, macrophages first, each population in creation order
    pub fn live_agents(&self) -> Vec<AgentSnapshot> {
        let mut out = Vec::with_capacity(self.agents.len());
        for kind in [AgentKind::Macrophage, AgentKind::Bacterium] {
            out.extend(
                self.agents
                    .values()
                    .filter(|agent| agent.kind == kind)
                    .filter_map(Agent::snapshot),
            );
        }
        out
    }
}
