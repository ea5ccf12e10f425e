//! Error types for the simulation.

use crate::types::{AgentId, AgentKind};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// No live agents remain, so there is no next event.
    #[error("Event queue is empty")]
    EmptyQueue,

    /// A cell slot for `kind` already holds `occupant`.
    #[error("Occupancy violation at ({row}, {col}): {kind} slot already holds agent {occupant}")]
    OccupancyViolation {
        row: i32,
        col: i32,
        kind: AgentKind,
        occupant: AgentId,
    },

    /// The agent has not been placed on the grid yet.
    #[error("Invalid placement: agent {0} has no position")]
    InvalidPlacement(AgentId),

    #[error("Unknown agent: {0}")]
    UnknownAgent(AgentId),

    /// The event queue no longer mirrors the set of live agents.
    #[error("Event queue inconsistency: {0}")]
    QueueInconsistency(String),
}

impl Error {
    /// Whether this error signals a broken engine invariant rather than a normal stop.
    pub fn is_invariant_violation(&self) -> bool {
        matches!(
            self,
            Error::OccupancyViolation { .. }
                | Error::InvalidPlacement(_)
                | Error::UnknownAgent(_)
                | Error::QueueInconsistency(_)
        )
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_occupancy_message() {
        let err = Error::OccupancyViolation {
            row: 1,
            col: 2,
            kind: AgentKind::Bacterium,
            occupant: AgentId(7),
        };
        assert_eq!(
            err.to_string(),
            "Occupancy violation at (1, 2): BACTERIUM slot already holds agent 7"
        );
        assert!(err.is_invariant_violation());
        assert!(!Error::EmptyQueue.is_invariant_violation());
    }
}
