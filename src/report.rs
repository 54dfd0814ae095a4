//! Run summary handed to reporting front ends.
//!
//! [`RunReport`] gathers instance metrics, the configured parameters, the
//! outcome of the fleet search and, when it ran, the archive exploration.
//! It is returned as a value and rendered with [`RunReport::to_json`]; the
//! library never writes it anywhere.

use serde::Serialize;

use crate::archive::ArchiveOutcome;
use crate::config::{SearchBudget, SearchConfig};
use crate::ils::FleetOutcome;
use crate::local_search::LocalSearchOutcome;
use crate::models::{BusProblem, DistanceUnit};

/// Size and shape of the instance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstanceSummary {
    /// Candidate stops, the school excluded.
    pub stops: usize,
    /// Addresses to serve.
    pub addresses: usize,
    /// Total passengers.
    pub passengers: i32,
    /// Unit of the walking distances.
    pub distance_unit: DistanceUnit,
    /// Longest distance an address may walk to a stop.
    pub max_walk_distance: f64,
    /// Eligibility threshold recorded with the instance.
    pub min_eligibility_distance: f64,
    /// Mean number of stops within walking distance of an address.
    pub stops_per_address: f64,
    /// Mean number of addresses within walking distance of a stop.
    pub addresses_per_stop: f64,
}

/// Parameters the run used.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterSummary {
    /// Journey limit of a route, in seconds.
    pub max_journey_time: f64,
    /// Seats per bus.
    pub capacity: i32,
    /// Boarding time per passenger, in seconds.
    pub dwell_per_passenger: f64,
    /// Fixed dwell time per stop visit, in seconds.
    pub dwell_per_stop: f64,
    /// Cost weight of journey time over the limit.
    pub excess_weight: f64,
    /// Seed of the random stream.
    pub seed: u64,
    /// Capacity lower bound on the fleet size.
    pub lower_bound_fleet: usize,
    /// Budget of each iterated local search.
    pub budget: SearchBudget,
    /// Rounding resolution of the archive objectives.
    pub discretization: f64,
    /// Whether perturbations reduce covers to minimal ones.
    pub minimal_covers: bool,
}

/// Outcome of the fleet search.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageOneSummary {
    /// Number of buses.
    pub fleet_size: usize,
    /// Total cost of the best solution.
    pub cost: f64,
    /// Activated stops.
    pub used_stops: usize,
    /// Stops served by more than one bus.
    pub multi_stops: usize,
    /// Stop visits over all routes.
    pub occurrences: usize,
    /// Routes visiting an outlier stop.
    pub outlier_routes: usize,
    /// Whether a feasible fleet was found.
    pub feasible: bool,
    /// Wall time of the fleet search.
    pub elapsed_ms: u64,
    /// Local search statistics.
    pub local_search: LocalSearchOutcome,
}

/// One feasible member of the final archive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FrontPoint {
    /// Mean walking time per passenger, in seconds.
    pub walk_per_passenger: f64,
    /// Mean cost per route.
    pub cost_per_route: f64,
}

/// Outcome of the archive exploration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArchiveSummary {
    /// Members of the final archive.
    pub size: usize,
    /// Feasible members.
    pub feasible: usize,
    /// Members explored.
    pub visits: usize,
    /// Whether every member was explored before the time limit.
    pub completed: bool,
    /// Wall time of the exploration.
    pub elapsed_ms: u64,
    /// Feasible members by ascending walk time.
    pub front: Vec<FrontPoint>,
}

/// Log record of one planner run.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use school_bus_routing::config::SearchConfig;
/// use school_bus_routing::constructive::build;
/// use school_bus_routing::ils::FleetOutcome;
/// use school_bus_routing::local_search::LocalSearchOutcome;
/// use school_bus_routing::report::RunReport;
/// # use school_bus_routing::config::RouteParams;
/// # use school_bus_routing::distance::DistanceMatrix;
/// # use school_bus_routing::models::{Address, BusProblem, DistanceUnit, ProblemInput, Stop, WalkLink};
/// # let drive = DistanceMatrix::from_data(3, 3, vec![0.0, 100.0, 120.0, 100.0, 0.0, 50.0, 120.0, 50.0, 0.0]).expect("valid");
/// # let input = ProblemInput {
/// #     stops: vec![Stop::new(0.0, 0.0, "School"), Stop::new(1.0, 0.0, "A"), Stop::new(2.0, 0.0, "B")],
/// #     addresses: vec![Address::new(1.0, 0.1, 2, "x"), Address::new(2.0, 0.1, 3, "y")],
/// #     distance_unit: DistanceUnit::Kilometres,
/// #     min_eligibility_distance: 0.0,
/// #     max_walk_distance: 0.5,
/// #     drive_distance: drive.clone(),
/// #     drive_time: drive,
/// #     walks: vec![
/// #         WalkLink { address: 0, stop: 1, distance: 0.1, time: 60.0 },
/// #         WalkLink { address: 1, stop: 1, distance: 0.4, time: 240.0 },
/// #         WalkLink { address: 1, stop: 2, distance: 0.1, time: 60.0 },
/// #     ],
/// # };
/// # let problem = BusProblem::new(input, RouteParams::default()).expect("valid");
///
/// let solution = build(&problem, 1, &[false, true, true]).expect("valid");
/// let fleet = FleetOutcome {
///     found_feasible: solution.is_feasible(),
///     solution,
///     fleet_size: 1,
///     lower_bound: 1,
///     elapsed: Duration::from_millis(12),
///     local_search: LocalSearchOutcome::default(),
/// };
/// let report = RunReport::new(&problem, &SearchConfig::default(), &fleet);
/// assert_eq!(report.instance.stops, 2);
/// assert_eq!(report.stage_one.used_stops, 2);
/// assert!(report.to_json().expect("valid").contains("\"fleet_size\": 1"));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    /// Instance metrics.
    pub instance: InstanceSummary,
    /// Parameters in use.
    pub parameters: ParameterSummary,
    /// Fleet search outcome.
    pub stage_one: StageOneSummary,
    /// Archive exploration outcome, if stage two ran.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub archive: Option<ArchiveSummary>,
}

impl RunReport {
    /// Summarizes the instance, the configuration and the fleet search.
    pub fn new(problem: &BusProblem, config: &SearchConfig, fleet: &FleetOutcome) -> Self {
        let params = problem.params();
        let sol = &fleet.solution;
        Self {
            instance: InstanceSummary {
                stops: problem.num_stops().saturating_sub(1),
                addresses: problem.num_addresses(),
                passengers: problem.total_passengers(),
                distance_unit: problem.distance_unit(),
                max_walk_distance: problem.max_walk_distance(),
                min_eligibility_distance: problem.min_eligibility_distance(),
                stops_per_address: problem.stops_per_address(),
                addresses_per_stop: problem.addresses_per_stop(),
            },
            parameters: ParameterSummary {
                max_journey_time: params.max_journey_time,
                capacity: params.capacity,
                dwell_per_passenger: params.dwell_per_passenger,
                dwell_per_stop: params.dwell_per_stop,
                excess_weight: params.excess_weight,
                seed: config.seed,
                lower_bound_fleet: fleet.lower_bound,
                budget: config.budget,
                discretization: config.discretization,
                minimal_covers: config.minimal_covers,
            },
            stage_one: StageOneSummary {
                fleet_size: fleet.fleet_size,
                cost: sol.cost(),
                used_stops: sol.num_used_stops(),
                multi_stops: sol.num_multi_stops(),
                occurrences: sol.num_occurrences(),
                outlier_routes: sol.num_outlier_routes(),
                feasible: fleet.found_feasible,
                elapsed_ms: millis(fleet.elapsed),
                local_search: fleet.local_search.clone(),
            },
            archive: None,
        }
    }

    /// Adds the archive summary.
    pub fn with_archive(mut self, problem: &BusProblem, outcome: &ArchiveOutcome) -> Self {
        let passengers = f64::from(problem.total_passengers().max(1));
        let front: Vec<FrontPoint> = outcome
            .feasible()
            .map(|s| FrontPoint {
                walk_per_passenger: s.walk_cost() / passengers,
                cost_per_route: s.cost_per_route(),
            })
            .collect();
        self.archive = Some(ArchiveSummary {
            size: outcome.solutions.len(),
            feasible: front.len(),
            visits: outcome.visits,
            completed: outcome.completed,
            elapsed_ms: millis(outcome.elapsed),
            front,
        });
        self
    }

    /// Pretty-printed JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

fn millis(d: std::time::Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
