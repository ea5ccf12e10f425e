//! Core type definitions for the simulation.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for an agent.
///
/// Identifiers are handed out in strictly increasing order and never reused,
/// so ordering by id is ordering by creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AgentId(pub u64);

impl AgentId {
    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Cell coordinates on the grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub row: i32,
    pub col: i32,
}

impl Position {
    pub fn new(row: i32, col: i32) -> Self {
        Self { row, col }
    }

    pub fn add(&self, drow: i32, dcol: i32) -> Self {
        Self {
            row: self.row + drow,
            col: self.col + dcol,
        }
    }

    /// Apply toroidal wrapping on a square grid of `size` cells per side
    pub fn wrap(&self, size: i32) -> Self {
        Self {
            row: ((self.row % size) + size) % size,
            col: ((self.col % size) + size) % size,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// The two agent populations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentKind {
    /// Predator
    Macrophage,
    /// Prey
    Bacterium,
}

impl AgentKind {
    pub fn opposite(&self) -> Self {
        match self {
            AgentKind::Macrophage => AgentKind::Bacterium,
            AgentKind::Bacterium => AgentKind::Macrophage,
        }
    }

    /// Single-character map glyph
    pub fn glyph(&self) -> char {
        match self {
            AgentKind::Macrophage => 'M',
            AgentKind::Bacterium => 'b',
        }
    }
}

impl fmt::Display for AgentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AgentKind::Macrophage => write!(f, "MACROPHAGE"),
            AgentKind::Bacterium => write!(f, "BACTERIUM"),
        }
    }
}

/// Which of an agent's two timestamps fired
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Move,
    /// Divide for bacteria, eat for macrophages
    Secondary,
}

/// A processed event, as seen from outside the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    BacteriumMove,
    BacteriumDivide,
    MacrophageMove,
    MacrophageEat,
    /// A macrophage move event that found the predator past its starvation limit
    MacrophageStarve,
}

impl EventKind {
    pub fn dispatch(kind: AgentKind, channel: Channel) -> Self {
        match (kind, channel) {
            (AgentKind::Bacterium, Channel::Move) => EventKind::BacteriumMove,
            (AgentKind::Bacterium, Channel::Secondary) => EventKind::BacteriumDivide,
            (AgentKind::Macrophage, Channel::Move) => EventKind::MacrophageMove,
            (AgentKind::Macrophage, Channel::Secondary) => EventKind::MacrophageEat,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EventKind::BacteriumMove => "bacterium_move",
            EventKind::BacteriumDivide => "bacterium_divide",
            EventKind::MacrophageMove => "macrophage_move",
            EventKind::MacrophageEat => "macrophage_eat",
            EventKind::MacrophageStarve => "macrophage_starve",
        };
        f.write_str(name)
    }
}

/// One processed event: who fired, what happened, and when
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub agent_id: AgentId,
    pub kind: EventKind,
    pub time: f64,
}

/// Read-only view of a live agent handed to display collaborators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentSnapshot {
    pub id: AgentId,
    pub row: i32,
    pub col: i32,
    pub kind: AgentKind,
}
