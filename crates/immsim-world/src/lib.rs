//! World simulation engine.
//!
//! This module implements the toroidal grid, the two agent populations living on it,
//! the event queue ordering their next events, and the next-event engine driving them.

pub mod agent;
pub mod driver;
pub mod grid;
pub mod simulation;
pub mod viewer;

pub use agent::Agent;
pub use driver::Driver;
pub use grid::{Cell, Grid};
pub use simulation::{Simulation, StopHandle};
pub use viewer::{NullViewer, PopulationHistory, Viewer};
