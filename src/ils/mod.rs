//! Iterated local search (stage 1: find a feasible fleet).
//!
//! - [`perturb`] — Close random non-required stops and repair the covering
//! - [`IteratedLocalSearch`] — Perturb and descend for a fixed number of buses
//! - [`FleetSearch`] — Grow the fleet from the capacity lower bound until feasible

mod driver;
mod perturb;

pub use driver::{FleetOutcome, FleetSearch, IlsOutcome, IteratedLocalSearch};
pub use perturb::perturb;
