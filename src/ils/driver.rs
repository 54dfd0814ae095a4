//! Iterated local search for a fixed fleet size, and the outer loop over
//! fleet sizes.
//!
//! # Algorithm
//!
//! For k buses: a greedy covering is built into k routes and taken to a
//! local optimum. Each iteration then perturbs the current solution (see
//! [`perturb`]) and descends again. The best solution is replaced by
//!
//! 1. the first feasible solution found,
//! 2. a feasible solution of lower cost than the best feasible one,
//! 3. a cheaper infeasible solution, while nothing feasible has been seen.
//!
//! The fleet search starts from the capacity lower bound and adds a bus
//! whenever a whole ILS run ends without a feasible solution.
//!
//! # Reference
//!
//! Lewis, R. & Smith-Miles, K. (2018). "A Heuristic Algorithm for Finding
//! Cost-Effective Solutions to Real-World School Bus Routing Problems",
//! *Journal of Discrete Algorithms* 52-53, 2-17.

use std::time::{Duration, Instant};

use rand::Rng;
use tracing::{debug, info};

use super::perturb::perturb;
use crate::config::{SearchBudget, SearchConfig};
use crate::constructive::{build, cover, CoverHeuristic};
use crate::error::RoutingError;
use crate::local_search::{LocalSearch, LocalSearchOutcome};
use crate::models::{BusProblem, Solution};

/// Result of one ILS run for a fixed fleet size.
#[derive(Debug, Clone)]
pub struct IlsOutcome {
    /// Best solution under the acceptance rule.
    pub solution: Solution,
    /// Whether any feasible solution was seen.
    pub found_feasible: bool,
    /// Local optima visited (the initial one included).
    pub iterations: usize,
    /// Local search statistics summed over the run.
    pub local_search: LocalSearchOutcome,
}

/// ILS for a fixed number of buses.
///
/// # Examples
///
/// ```
/// use rand::rngs::StdRng;
/// use rand::SeedableRng;
/// use school_bus_routing::config::{SearchBudget, SearchConfig};
/// use school_bus_routing::ils::IteratedLocalSearch;
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
/// let config = SearchConfig::default().with_budget(SearchBudget::Iterations(5));
/// let mut rng = StdRng::seed_from_u64(42);
/// let outcome = IteratedLocalSearch::new(&problem, &config).run(1, &mut rng).expect("valid");
/// assert!(outcome.found_feasible);
/// assert_eq!(outcome.iterations, 6);
/// ```
pub struct IteratedLocalSearch<'a> {
    problem: &'a BusProblem,
    budget: SearchBudget,
    minimal_covers: bool,
    local_search: LocalSearch<'a>,
}

impl<'a> IteratedLocalSearch<'a> {
    /// Creates an ILS with the budget, covering mode and transfer rule of `config`.
    pub fn new(problem: &'a BusProblem, config: &SearchConfig) -> Self {
        Self {
            problem,
            budget: config.budget,
            minimal_covers: config.minimal_covers,
            local_search: LocalSearch::new(problem).with_under_limit_transfer(config.under_limit_transfer),
        }
    }

    /// Runs the ILS with `k` buses until the budget is spent.
    ///
    /// # Errors
    ///
    /// Propagates invariant violations from covering, packing and rebuilding.
    pub fn run<R: Rng>(&self, k: usize, rng: &mut R) -> Result<IlsOutcome, RoutingError> {
        let problem = self.problem;
        let (deadline, max_iterations) = match self.budget {
            SearchBudget::Time(limit) => (Some(Instant::now() + limit), 0),
            SearchBudget::Iterations(n) => (None, n),
        };

        let mut stop_used = vec![false; problem.num_stops()];
        cover(problem, &mut stop_used, None, CoverHeuristic::Greedy, self.minimal_covers, rng)?;
        let mut sol = build(problem, k, &stop_used)?;
        let first = self.local_search.run(&mut sol, rng);
        let mut found_feasible = first.feasible;
        let mut best = sol.clone();
        let mut stats = first;
        let mut iteration = 1;
        log_iteration(k, iteration, &sol, None, stats.moves, best.cost());

        while deadline.is_some_and(|d| Instant::now() < d) || iteration <= max_iterations {
            let removed = perturb(problem, &mut sol, self.minimal_covers, rng)?;
            let ls = self.local_search.run(&mut sol, rng);
            stats.absorb(&ls);
            iteration += 1;
            if ls.feasible && !found_feasible {
                found_feasible = true;
                best = sol.clone();
            } else if ls.feasible && sol.cost() < best.cost() {
                best = sol.clone();
            } else if !ls.feasible && !found_feasible && sol.cost() < best.cost() {
                best = sol.clone();
            }
            log_iteration(k, iteration, &sol, Some(removed), ls.moves, best.cost());
        }

        info!(
            k,
            iterations = iteration,
            found_feasible,
            cost = best.cost(),
            "ils finished"
        );
        Ok(IlsOutcome {
            solution: best,
            found_feasible,
            iterations: iteration,
            local_search: stats,
        })
    }
}

fn log_iteration(k: usize, iteration: usize, sol: &Solution, removed: Option<usize>, moves: usize, best: f64) {
    debug!(
        k,
        iteration,
        cost = sol.cost(),
        feasible_routes = sol.num_feasible_routes(),
        empty_routes = sol.num_empty_routes(),
        occurrences = sol.num_occurrences(),
        used_stops = sol.num_used_stops(),
        stops_removed = ?removed,
        moves,
        best_cost = best,
        "ils iteration"
    );
}

/// Result of the search over fleet sizes.
#[derive(Debug, Clone)]
pub struct FleetOutcome {
    /// Best solution for the final fleet size.
    pub solution: Solution,
    /// Number of buses of `solution`.
    pub fleet_size: usize,
    /// ⌈passengers / capacity⌉.
    pub lower_bound: usize,
    /// Whether `solution` is feasible.
    pub found_feasible: bool,
    /// Wall-clock time of the whole search.
    pub elapsed: Duration,
    /// Local search statistics of the final fleet size.
    pub local_search: LocalSearchOutcome,
}

/// Runs the ILS for growing fleet sizes until a feasible solution appears.
pub struct FleetSearch<'a> {
    problem: &'a BusProblem,
    ils: IteratedLocalSearch<'a>,
    initial_fleet: Option<usize>,
}

impl<'a> FleetSearch<'a> {
    /// Creates a fleet search with the settings of `config`.
    pub fn new(problem: &'a BusProblem, config: &SearchConfig) -> Self {
        Self {
            problem,
            ils: IteratedLocalSearch::new(problem, config),
            initial_fleet: config.initial_fleet,
        }
    }

    /// Starts at max(lower bound, initial fleet) buses and adds one at a time.
    /// At least one fleet size is always tried; the loop gives up once k
    /// exceeds max(number of addresses, starting k) and returns the last
    /// (infeasible) result.
    ///
    /// # Errors
    ///
    /// Propagates ILS errors.
    pub fn run<R: Rng>(&self, rng: &mut R) -> Result<FleetOutcome, RoutingError> {
        let started = Instant::now();
        let lower_bound = self.problem.lower_bound_fleet();
        let start = self.initial_fleet.map_or(lower_bound, |k| k.max(lower_bound));
        let limit = self.problem.num_addresses().max(start);

        let mut k = start;
        loop {
            info!(k, "searching for a feasible solution");
            let outcome = self.ils.run(k, rng)?;
            if outcome.found_feasible || k >= limit {
                info!(
                    fleet_size = k,
                    lower_bound,
                    found_feasible = outcome.found_feasible,
                    cost = outcome.solution.cost(),
                    "fleet search finished"
                );
                return Ok(FleetOutcome {
                    solution: outcome.solution,
                    fleet_size: k,
                    lower_bound,
                    found_feasible: outcome.found_feasible,
                    elapsed: started.elapsed(),
                    local_search: outcome.local_search,
                });
            }
            k += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RouteParams;
    use crate::evaluation::validate;
    use crate::test_support::{custom_input, line_input, line_problem, random_problem};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn iterations(n: usize) -> SearchConfig {
        SearchConfig::default().with_budget(SearchBudget::Iterations(n))
    }

    #[test]
    fn test_ils_iteration_budget() {
        let problem = line_problem(5, RouteParams::default());
        let mut rng = StdRng::seed_from_u64(3);
        let outcome = IteratedLocalSearch::new(&problem, &iterations(4))
            .run(2, &mut rng)
            .expect("valid");
        assert_eq!(outcome.iterations, 5);
        assert!(outcome.found_feasible);
        assert!(validate(&problem, &outcome.solution, false).is_empty());
    }

    #[test]
    fn test_ils_time_budget() {
        let problem = line_problem(4, RouteParams::default());
        let config = SearchConfig::default().with_budget(SearchBudget::Time(Duration::from_millis(20)));
        let mut rng = StdRng::seed_from_u64(3);
        let outcome = IteratedLocalSearch::new(&problem, &config).run(1, &mut rng).expect("valid");
        assert!(outcome.iterations >= 1);
    }

    #[test]
    fn test_ils_deterministic_for_a_seed() {
        let problem = random_problem(11, 10, 14, RouteParams::default().with_capacity(12));
        let run = |seed| {
            let mut rng = StdRng::seed_from_u64(seed);
            IteratedLocalSearch::new(&problem, &iterations(6))
                .run(problem.lower_bound_fleet() + 1, &mut rng)
                .expect("valid")
                .solution
        };
        assert_eq!(run(5), run(5));
    }

    #[test]
    fn test_fleet_grows_until_feasible() {
        // Each address reaches only its own stop; either stop fits the
        // limit alone, both together do not.
        let params = RouteParams::default().with_max_journey_time(260.0);
        let mut input = line_input(2);
        input.walks.retain(|w| w.stop == w.address + 1);
        let problem = BusProblem::new(input, params).expect("valid");
        assert!(!problem.is_outlier(1) && !problem.is_outlier(2));
        let mut rng = StdRng::seed_from_u64(1);
        let outcome = FleetSearch::new(&problem, &iterations(3)).run(&mut rng).expect("valid");
        assert_eq!(outcome.lower_bound, 1);
        assert_eq!(outcome.fleet_size, 2);
        assert!(outcome.found_feasible);
        assert!(outcome.solution.is_feasible());
    }

    #[test]
    fn test_fleet_respects_initial_fleet() {
        let problem = line_problem(3, RouteParams::default());
        let config = iterations(1).with_initial_fleet(3);
        let mut rng = StdRng::seed_from_u64(1);
        let outcome = FleetSearch::new(&problem, &config).run(&mut rng).expect("valid");
        assert_eq!(outcome.fleet_size, 3);
        assert_eq!(outcome.solution.num_routes(), 3);
    }

    #[test]
    fn test_fleet_gives_up_when_nothing_fits() {
        // Two passengers dwell 25 s, more than the 5 s of slack on either stop.
        let drive = vec![
            vec![0.0, 130.0, 135.0],
            vec![130.0, 0.0, 50.0],
            vec![135.0, 50.0, 0.0],
        ];
        let input = custom_input(&drive, &[2], &[(0, 1, 60.0), (0, 2, 240.0)]);
        let params = RouteParams::default().with_max_journey_time(140.0);
        let problem = BusProblem::new(input, params).expect("valid");
        let mut rng = StdRng::seed_from_u64(1);
        let outcome = FleetSearch::new(&problem, &iterations(2)).run(&mut rng).expect("valid");
        assert!(!outcome.found_feasible);
        assert_eq!(outcome.fleet_size, 1);
        assert!(validate(&problem, &outcome.solution, false).is_empty());
    }
}
