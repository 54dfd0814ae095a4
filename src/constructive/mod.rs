//! Construction of solutions from a stop covering.
//!
//! - [`cover`] — Greedy set covering of the addresses by stops (Chvátal, 1979)
//! - [`pack`] / [`pack_one`] — First-fit decreasing bin packing with item splitting
//! - [`build`] / [`rebuild`] — Full solution assembly and repair after a covering change

mod bin_packing;
mod builder;
mod set_cover;

pub use bin_packing::{pack, pack_one};
pub use builder::{build, rebuild};
pub use set_cover::{cover, is_cover, make_minimal, CoverHeuristic};
