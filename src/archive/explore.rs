//! Walking-time versus cost exploration around a fixed fleet.
//!
//! # Algorithm
//!
//! The archive is seeded with the starting solution and with the
//! walking-time extreme (every address activates its nearest stop, then
//! local search). Until every member has been visited, a random unvisited
//! member is taken and each stop is toggled in turn:
//!
//! - an unused stop is added when some address is closer to it than to its
//!   current stop;
//! - a used stop that is not required is removed. Its addresses move to the
//!   nearest other activated stop; an address with none in range activates
//!   its nearest stop instead.
//!
//! Each toggled activation is rebuilt into the routes of the member, taken
//! to a local optimum and offered to the archive.
//!
//! # Complexity
//!
//! One visit costs O(n) rebuilds and local searches, n = candidate stops.

use std::time::{Duration, Instant};

use rand::Rng;
use tracing::{debug, info};

use super::pareto::Archive;
use crate::config::SearchConfig;
use crate::constructive::{build, cover, rebuild, CoverHeuristic};
use crate::error::RoutingError;
use crate::evaluation::RouteEvaluator;
use crate::local_search::LocalSearch;
use crate::models::{BusProblem, Solution, SCHOOL};

/// Activation change of a single stop.
#[derive(Debug, Clone, PartialEq)]
pub struct StopToggle {
    /// Toggled stop.
    pub stop: usize,
    /// `true` when the stop is added, `false` when removed.
    pub added: bool,
    /// Reduction of the total walking time; negative when walks get longer.
    pub walk_saving: f64,
    /// Stop activation after the toggle, repair stops included.
    pub stop_used: Vec<bool>,
}

/// Total walking time when every address walks to its nearest activated stop.
fn activation_walk_cost(problem: &BusProblem, stop_used: &[bool]) -> f64 {
    let assigned: Vec<usize> = (0..problem.num_addresses())
        .map(|a| {
            let near = problem.stops_near(a);
            near.iter().copied().find(|&s| stop_used[s]).unwrap_or(near[0])
        })
        .collect();
    RouteEvaluator::new(problem).walk_cost(&assigned)
}

/// Evaluates toggling stop `v` of `sol`.
///
/// Returns `None` for the school, for required stops that are in use, and
/// for unused stops no address would walk to.
///
/// # Examples
///
/// ```
/// use school_bus_routing::archive::toggle_stop;
/// use school_bus_routing::constructive::build;
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
/// let sol = build(&problem, 1, &[false, true, false]).expect("valid");
/// // Three passengers walk 180 s less each.
/// let toggle = toggle_stop(&problem, &sol, 2).expect("profitable");
/// assert!(toggle.added);
/// assert!((toggle.walk_saving - 540.0).abs() < 1e-9);
/// ```
pub fn toggle_stop(problem: &BusProblem, sol: &Solution, v: usize) -> Option<StopToggle> {
    if v == SCHOOL || v >= problem.num_stops() {
        return None;
    }
    let mut stop_used = sol.stop_activation().to_vec();

    if !sol.is_stop_used(v) {
        let walk_saving: f64 = problem
            .addresses_near(v)
            .iter()
            .map(|&a| {
                let current = problem.walk_time(a, sol.assigned_stop(a));
                let gain = current - problem.walk_time(a, v);
                if gain > 0.0 {
                    gain * f64::from(problem.passengers(a))
                } else {
                    0.0
                }
            })
            .sum();
        if walk_saving <= 0.0 {
            return None;
        }
        stop_used[v] = true;
        return Some(StopToggle {
            stop: v,
            added: true,
            walk_saving,
            stop_used,
        });
    }

    if problem.is_required(v) {
        return None;
    }
    stop_used[v] = false;
    for &a in problem.addresses_near(v) {
        if sol.assigned_stop(a) != v {
            continue;
        }
        let near = problem.stops_near(a);
        if !near.iter().any(|&s| stop_used[s]) {
            // A stop that is not required always has a runner-up.
            if let Some(&u) = near.iter().find(|&&s| s != v) {
                stop_used[u] = true;
            }
        }
    }
    let walk_saving = sol.walk_cost() - activation_walk_cost(problem, &stop_used);
    Some(StopToggle {
        stop: v,
        added: false,
        walk_saving,
        stop_used,
    })
}

/// Result of an archive exploration.
#[derive(Debug, Clone)]
pub struct ArchiveOutcome {
    /// Final archive by ascending walk cost.
    pub solutions: Vec<Solution>,
    /// Members visited.
    pub visits: usize,
    /// `false` when the time limit stopped the worklist early.
    pub completed: bool,
    /// Wall-clock time of the exploration.
    pub elapsed: Duration,
}

impl ArchiveOutcome {
    /// Feasible members by ascending walk cost.
    pub fn feasible(&self) -> impl Iterator<Item = &Solution> {
        self.solutions.iter().filter(|s| s.is_feasible())
    }
}

/// Builds a non-dominated front of (cost, walking time) trade-offs with the
/// fleet size of a starting solution.
pub struct ArchiveExplorer<'a> {
    problem: &'a BusProblem,
    local_search: LocalSearch<'a>,
    resolution: f64,
    time_limit: Option<Duration>,
}

impl<'a> ArchiveExplorer<'a> {
    /// Creates an explorer with the resolution, time limit and transfer
    /// rule of `config`.
    pub fn new(problem: &'a BusProblem, config: &SearchConfig) -> Self {
        Self {
            problem,
            local_search: LocalSearch::new(problem).with_under_limit_transfer(config.under_limit_transfer),
            resolution: config.discretization,
            time_limit: config.archive_time_limit,
        }
    }

    /// Runs the worklist from `start` until every archive member has been
    /// visited or the time limit passes. The limit is checked between
    /// visits only.
    ///
    /// # Errors
    ///
    /// Propagates covering, build and rebuild failures.
    pub fn explore<R: Rng>(&self, start: Solution, rng: &mut R) -> Result<ArchiveOutcome, RoutingError> {
        let problem = self.problem;
        let started = Instant::now();
        let deadline = self.time_limit.map(|limit| started + limit);
        let k = start.num_routes();

        let mut archive = Archive::new(self.resolution, problem.total_passengers());
        archive.insert(start);
        let mut nearest = vec![false; problem.num_stops()];
        cover(problem, &mut nearest, None, CoverHeuristic::Nearest, false, rng)?;
        let mut extreme = build(problem, k, &nearest)?;
        self.local_search.run(&mut extreme, rng);
        archive.insert(extreme);
        info!(k, archive_size = archive.len(), "archive exploration started");

        let mut visits = 0;
        let mut completed = true;
        loop {
            if deadline.is_some_and(|d| Instant::now() >= d) {
                completed = false;
                break;
            }
            debug!(
                visits,
                archive_size = archive.len(),
                visited = archive.num_visited(),
                feasible = archive.num_feasible(),
                "archive visit"
            );
            let Some(sol) = archive.take_unvisited(rng) else {
                break;
            };
            visits += 1;
            for v in 1..problem.num_stops() {
                let Some(toggle) = toggle_stop(problem, &sol, v) else {
                    continue;
                };
                let mut candidate = sol.clone();
                rebuild(problem, &mut candidate, &toggle.stop_used)?;
                self.local_search.run(&mut candidate, rng);
                archive.insert(candidate);
            }
        }

        info!(
            k,
            archive_size = archive.len(),
            feasible = archive.num_feasible(),
            visits,
            completed,
            "archive exploration finished"
        );
        Ok(ArchiveOutcome {
            solutions: archive.into_sorted(),
            visits,
            completed,
            elapsed: started.elapsed(),
        })
    }
}
