//! Domain model types for school bus routing.
//!
//! Provides the read-only instance (stops, addresses, drive and walking
//! times with derived adjacency) and the mutable solution state that every
//! optimization stage works on.

mod problem;
mod solution;
mod stop;

pub use problem::{BusProblem, DistanceUnit, ProblemInput, WalkLink, SCHOOL};
pub use solution::{Solution, Violation, ViolationType};
pub use stop::{Address, Stop};
