//! # school-bus-routing
//!
//! School bus routing optimizer: chooses which bus stops to open, splits
//! passengers over buses, orders every route and trades operating cost
//! against the time children walk to their stops.
//!
//! ## Modules
//!
//! - [`models`] — Instance (stops, addresses, walking adjacency) and solution state
//! - [`distance`] — Dense drive-time and distance matrices
//! - [`config`] — Route parameters and search configuration
//! - [`evaluation`] — Route length and cost, full recomputation, consistency checks
//! - [`constructive`] — Set covering, bin packing, build and rebuild
//! - [`local_search`] — Seven neighbourhoods with delta evaluation
//! - [`ils`] — Iterated local search over growing fleet sizes
//! - [`archive`] — Cost versus walking time Pareto exploration
//! - [`report`] — Serializable run summary
//! - [`planner`] — Both stages from one seeded random stream
//!
//! ## Example
//!
//! ```
//! use school_bus_routing::config::{RouteParams, SearchBudget, SearchConfig};
//! use school_bus_routing::distance::DistanceMatrix;
//! use school_bus_routing::models::{Address, BusProblem, DistanceUnit, ProblemInput, Stop, WalkLink};
//! use school_bus_routing::planner::Planner;
//!
//! let drive = DistanceMatrix::from_data(3, 3, vec![
//!     0.0, 100.0, 120.0,
//!     100.0, 0.0, 50.0,
//!     120.0, 50.0, 0.0,
//! ]).expect("valid");
//! let input = ProblemInput {
//!     stops: vec![Stop::new(0.0, 0.0, "School"), Stop::new(1.0, 0.0, "A"), Stop::new(2.0, 0.0, "B")],
//!     addresses: vec![Address::new(1.0, 0.1, 2, "x"), Address::new(2.0, 0.1, 3, "y")],
//!     distance_unit: DistanceUnit::Kilometres,
//!     min_eligibility_distance: 0.0,
//!     max_walk_distance: 0.5,
//!     drive_distance: drive.clone(),
//!     drive_time: drive,
//!     walks: vec![
//!         WalkLink { address: 0, stop: 1, distance: 0.1, time: 60.0 },
//!         WalkLink { address: 1, stop: 1, distance: 0.4, time: 240.0 },
//!         WalkLink { address: 1, stop: 2, distance: 0.1, time: 60.0 },
//!     ],
//! };
//! let problem = BusProblem::new(input, RouteParams::default()).expect("valid");
//!
//! let config = SearchConfig::default().with_seed(3).with_budget(SearchBudget::Iterations(10));
//! let plan = Planner::new(&problem, config).run().expect("valid");
//! assert_eq!(plan.fleet, 1);
//! println!("{}", plan.report.to_json().expect("valid"));
//! ```

pub mod archive;
pub mod config;
pub mod constructive;
pub mod distance;
pub mod error;
pub mod evaluation;
pub mod ils;
pub mod local_search;
pub mod models;
pub mod planner;
pub mod report;

pub use error::RoutingError;

#[cfg(test)]
mod test_support;
