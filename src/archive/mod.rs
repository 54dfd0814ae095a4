//! Multi-objective exploration (stage 2: trade cost against walking time).
//!
//! - [`Archive`] — Discretized Pareto archive with visited flags
//! - [`toggle_stop`] — Add or remove one stop and repair the covering
//! - [`ArchiveExplorer`] — Worklist over unvisited archive members

mod explore;
mod pareto;

pub use explore::{toggle_stop, ArchiveExplorer, ArchiveOutcome, StopToggle};
pub use pareto::Archive;
