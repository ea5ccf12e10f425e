use immsim_core::{
    AgentId, AgentKind, DelayDistribution, EventKind, EventRecord, Position, PredatorRules, PreyRules,
    SimulationConfig, StopReason,
};
use immsim_world::agent::choose_preferred;
use immsim_world::{Agent, Grid, PopulationHistory, Simulation, Viewer};
use proptest::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

fn config(seed: u64) -> SimulationConfig {
    SimulationConfig {
        grid_size: 12,
        initial_macrophages: 8,
        initial_bacteria: 20,
        max_time: Some(20.0),
        seed,
        redraw_delay_secs: 0.0,
        ..Default::default()
    }
}

fn trace_events(config: SimulationConfig, steps: usize) -> Vec<EventRecord> {
    let mut sim = Simulation::new(config).unwrap();
    (0..steps).map_while(|_| sim.step().ok()).collect()
}

#[test]
fn identical_seeds_replay_identically() {
    let first = trace_events(config(99), 2000);
    let second = trace_events(config(99), 2000);

    assert_eq!(first.len(), 2000);
    assert_eq!(first, second);
}

#[test]
fn different_seeds_diverge() {
    let first = trace_events(config(1), 200);
    let second = trace_events(config(2), 200);
    assert_ne!(first, second);
}

#[test]
fn clock_never_runs_backwards() {
    let events = trace_events(config(5), 3000);
    for pair in events.windows(2) {
        assert!(pair[0].time <= pair[1].time);
    }
}

#[test]
fn eat_removes_prey_everywhere() {
    let mut sim = Simulation::new(config(11)).unwrap();
    let mut meals = 0;

    for _ in 0..5000 {
        let Ok((head, _)) = sim.driver().peek_earliest() else {
            break;
        };
        let agent = sim.agent(head).unwrap();
        let victim = if agent.kind == AgentKind::Macrophage && !agent.is_move_next_event() {
            sim.grid()
                .get(agent.position().unwrap())
                .occupant(AgentKind::Bacterium)
        } else {
            None
        };
        let before = sim.population_counts().bacteria;

        let record = sim.step().unwrap();

        if let Some(victim) = victim {
            assert_eq!(record.kind, EventKind::MacrophageEat);
            assert!(sim.agent(victim).is_none());
            assert!(!sim.driver().contains(victim));
            assert!(sim.driver().iter().all(|(id, _)| id != victim));
            assert!(sim.live_agents().iter().all(|a| a.id != victim));
            assert_eq!(sim.population_counts().bacteria, before - 1);
            meals += 1;
        }
    }

    assert!(meals > 0);
    assert_eq!(sim.totals().deaths_eaten, meals);
}

#[test]
fn crowded_divide_creates_no_offspring() {
    let mut placements = Vec::new();
    for row in 0..3 {
        for col in 0..3 {
            placements.push((AgentKind::Bacterium, Position::new(row, col)));
        }
    }
    let config = SimulationConfig {
        grid_size: 3,
        max_time: None,
        ..Default::default()
    };
    let mut sim = Simulation::with_placements(config, &placements).unwrap();

    let mut divides = 0;
    for _ in 0..200 {
        let record = sim.step().unwrap();
        if record.kind == EventKind::BacteriumDivide {
            divides += 1;
        }
        assert_eq!(sim.population_counts().bacteria, 9);
        sim.check_invariants().unwrap();
    }

    assert!(divides > 0);
    assert_eq!(sim.totals().births, 0);
    assert_eq!(sim.totals().failed_divides, divides);
}

#[test]
fn offspring_born_onto_macrophage_is_eaten_next() {
    let mut placements = vec![(AgentKind::Macrophage, Position::new(1, 1))];
    for row in 0..3 {
        for col in 0..3 {
            if (row, col) != (1, 1) {
                placements.push((AgentKind::Bacterium, Position::new(row, col)));
            }
        }
    }
    let config = SimulationConfig {
        grid_size: 3,
        max_time: None,
        seed: 21,
        move_delay: DelayDistribution::Fixed { value: 1.0e6 },
        ..Default::default()
    };
    let mut sim = Simulation::with_placements(config, &placements).unwrap();
    let predator = AgentId(1);

    let record = sim.step().unwrap();
    assert_eq!(record.kind, EventKind::BacteriumDivide);
    assert_eq!(sim.totals().births, 1);
    assert_eq!(sim.population_counts().bacteria, 9);
    assert!(sim.grid().get(Position::new(1, 1)).has(AgentKind::Bacterium));
    assert_eq!(sim.driver().peek_earliest().unwrap(), (predator, record.time));

    let meal = sim.step().unwrap();
    assert_eq!(meal.kind, EventKind::MacrophageEat);
    assert_eq!(meal.agent_id, predator);
    assert_eq!(meal.time, record.time);
    assert_eq!(sim.population_counts().bacteria, 8);
    assert_eq!(sim.totals().deaths_eaten, 1);
    assert!(!sim.grid().get(Position::new(1, 1)).has(AgentKind::Bacterium));
    sim.check_invariants().unwrap();
}

#[test]
fn predator_never_skips_available_prey() {
    let mut grid = Grid::new(6);
    let mut predator = Agent::new(AgentId(1), AgentKind::Macrophage);
    grid.place(&mut predator, Position::new(3, 3)).unwrap();

    let prey_cells = [Position::new(2, 2), Position::new(4, 3)];
    for (i, &pos) in prey_cells.iter().enumerate() {
        let mut prey = Agent::new(AgentId(10 + i as u64), AgentKind::Bacterium);
        grid.place(&mut prey, pos).unwrap();
    }

    let candidates = grid.candidate_moves(AgentKind::Macrophage, Position::new(3, 3));
    assert_eq!(candidates.len(), 8);

    let mut rng = ChaCha8Rng::seed_from_u64(2024);
    let mut picked = std::collections::HashSet::new();
    for _ in 0..500 {
        let choice = choose_preferred(AgentKind::Macrophage, &grid, &candidates, &mut rng).unwrap();
        assert!(prey_cells.contains(&choice));
        picked.insert(choice);
    }
    assert_eq!(picked.len(), 2);
}

#[test]
fn population_history_samples_whole_time_units() {
    let mut sim = Simulation::new(config(3)).unwrap();
    let mut history = PopulationHistory::new();
    let summary = sim.run(&mut history).unwrap();

    assert_eq!(summary.stop_reason, StopReason::MaxTime);
    let samples = history.samples();
    assert!(!samples.is_empty());
    assert!(samples.len() <= 20);
    for (i, sample) in samples.iter().enumerate() {
        assert!(sample.time >= (i + 1) as f64);
    }
}

#[test]
fn starving_macrophages_die_out() {
    let config = SimulationConfig {
        initial_bacteria: 0,
        max_time: Some(50.0),
        predator: PredatorRules {
            starvation_time: Some(0.5),
        },
        ..config(8)
    };
    let mut sim = Simulation::new(config).unwrap();
    let summary = sim.run(&mut immsim_world::NullViewer).unwrap();

    assert_eq!(summary.stop_reason, StopReason::Extinct);
    assert_eq!(summary.totals.deaths_starved, 8);
    assert_eq!(summary.counts.total(), 0);
    assert!(sim.driver().is_empty());
    assert!(sim.grid().iter().all(|cell| !cell.is_occupied()));
}

struct PeakBacteria(usize);

impl Viewer for PeakBacteria {
    fn redraw(&mut self, sim: &Simulation, _delay_secs: f64) {
        self.0 = self.0.max(sim.population_counts().bacteria);
    }
}

#[test]
fn prey_cap_bounds_growth() {
    let config = SimulationConfig {
        initial_macrophages: 0,
        prey: PreyRules {
            max_population: Some(30),
        },
        ..config(4)
    };
    let mut sim = Simulation::new(config).unwrap();
    let mut peak = PeakBacteria(0);
    let summary = sim.run(&mut peak).unwrap();

    assert_eq!(peak.0, 30);
    assert_eq!(summary.counts.bacteria, 30);
    assert!(summary.totals.failed_divides > 0);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn invariants_hold_after_every_event(seed in any::<u64>(), steps in 1usize..400) {
        let mut sim = Simulation::new(SimulationConfig {
            grid_size: 8,
            initial_macrophages: 6,
            initial_bacteria: 10,
            max_time: None,
            seed,
            ..Default::default()
        }).unwrap();

        for _ in 0..steps {
            if sim.step().is_err() {
                break;
            }
            prop_assert!(sim.check_invariants().is_ok());

            let live = sim.live_agents();
            prop_assert_eq!(live.len(), sim.driver().len());
            let counts = sim.population_counts();
            prop_assert_eq!(live.len(), counts.total());
        }
    }
}
