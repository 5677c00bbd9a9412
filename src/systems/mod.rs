//! Application systems
//!
//! Systems that stand in for the external collaborators of the collision world.

mod simulation;

pub use simulation::{ModeTotals, RunSummary, SimulationSystem};
