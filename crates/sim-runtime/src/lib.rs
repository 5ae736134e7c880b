#![deny(warnings)]

//! Simulation engine: variable state construction, demand prediction, the
//! day simulator and the result accumulator.
//!
//! One run is single-threaded and synchronous — each day's rolling
//! statistics depend on the previously emitted days — but independent runs
//! share no mutable state and may execute concurrently. Nothing here blocks
//! on I/O; loading catalogs and persisting results belong to the caller.

pub mod day;
pub mod demand;
pub mod run;
pub mod state;

pub use day::{simulate_day, SimError};
pub use demand::DemandModel;
pub use run::{run_simulation, summarize, CancelToken, RunSummary, SimulationConfig};
