//! Agent state and per-kind behavior.

use crate::grid::Grid;
use immsim_core::{AgentId, AgentKind, AgentSnapshot, Channel, DelayDistribution, Error, Position, Result};
use rand::Rng;
use rand_chacha::ChaCha8Rng;

/// A macrophage or a bacterium.
///
/// Each agent carries two pending event times: `move_time` and `secondary_time`
/// (divide for bacteria, eat for macrophages). An infinite time disables that channel.
#[derive(Debug, Clone, PartialEq)]
pub struct Agent {
    pub id: AgentId,
    pub kind: AgentKind,
    position: Option<Position>,
    move_time: f64,
    secondary_time: f64,
    last_meal: f64,
}

impl Agent {
    /// An unplaced agent with both channels disabled
    pub fn new(id: AgentId, kind: AgentKind) -> Self {
        Self {
            id,
            kind,
            position: None,
            move_time: f64::INFINITY,
            secondary_time: f64::INFINITY,
            last_meal: 0.0,
        }
    }

    pub fn position(&self) -> Result<Position> {
        self.position.ok_or(Error::InvalidPlacement(self.id))
    }

    pub(crate) fn set_position(&mut self, pos: Position) {
        self.position = Some(pos);
    }

    pub fn move_time(&self) -> f64 {
        self.move_time
    }

    pub fn secondary_time(&self) -> f64 {
        self.secondary_time
    }

    /// Move wins ties against divide/eat.
    pub fn is_move_next_event(&self) -> bool {
        self.move_time <= self.secondary_time
    }

    pub fn next_channel(&self) -> Channel {
        if self.is_move_next_event() {
            Channel::Move
        } else {
            Channel::Secondary
        }
    }

    pub fn next_time(&self) -> f64 {
        self.move_time.min(self.secondary_time)
    }

    pub fn schedule_next_move(&mut self, now: f64, delay: &DelayDistribution, rng: &mut ChaCha8Rng) {
        self.move_time = now + delay.sample(rng);
    }

    pub fn schedule_next_divide(&mut self, now: f64, delay: &DelayDistribution, rng: &mut ChaCha8Rng) {
        debug_assert_eq!(self.kind, AgentKind::Bacterium);
        self.secondary_time = now + delay.sample(rng);
    }

    /// Eat at `now`. Moving is suspended until the meal is resolved by [`Agent::cant_eat`].
    pub fn schedule_eat(&mut self, now: f64) {
        debug_assert_eq!(self.kind, AgentKind::Macrophage);
        self.secondary_time = now;
        self.move_time = f64::INFINITY;
    }

    /// Disable the eat channel and resume moving from `now`.
    pub fn cant_eat(&mut self, now: f64, delay: &DelayDistribution, rng: &mut ChaCha8Rng) {
        debug_assert_eq!(self.kind, AgentKind::Macrophage);
        self.secondary_time = f64::INFINITY;
        self.schedule_next_move(now, delay, rng);
    }

    pub fn record_meal(&mut self, now: f64) {
        self.last_meal = now;
    }

    pub fn last_meal(&self) -> f64 {
        self.last_meal
    }

    pub fn is_starving(&self, now: f64, limit: Option<f64>) -> bool {
        limit.is_some_and(|limit| now - self.last_meal > limit)
    }

    /// Pick the cell this agent wants to enter next; its own cell when boxed in.
    pub fn calculate_move(&self, grid: &Grid, rng: &mut ChaCha8Rng) -> Result<Position> {
        let here = self.position()?;
        let candidates = grid.candidate_moves(self.kind, here);
        Ok(choose_preferred(self.kind, grid, &candidates, rng).unwrap_or(here))
    }

    pub fn snapshot(&self) -> Option<AgentSnapshot> {
        self.position.map(|pos| AgentSnapshot {
            id: self.id,
            row: pos.row,
            col: pos.col,
            kind: self.kind,
        })
    }
}

/// Kind-specific preference among `candidates`.
///
/// Macrophages hunt: if any candidate holds a bacterium they choose uniformly among
/// those cells only. Bacteria choose uniformly among all candidates. Returns `None`
/// when there is nothing to choose from, without touching `rng`.
pub fn choose_preferred(
    kind: AgentKind,
    grid: &Grid,
    candidates: &[Position],
    rng: &mut ChaCha8Rng,
) -> Option<Position> {
    if candidates.is_empty() {
        return None;
    }

    match kind {
        AgentKind::Macrophage => {
            let prey: Vec<Position> = candidates
                .iter()
                .copied()
                .filter(|&p| grid.get(p).has(kind.opposite()))
                .collect();

            if prey.is_empty() {
                Some(candidates[rng.gen_range(0..candidates.len())])
            } else {
                Some(prey[rng.gen_range(0..prey.len())])
            }
        }
        AgentKind::Bacterium => Some(candidates[rng.gen_range(0..candidates.len())]),
    }
}
