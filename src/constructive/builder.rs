//! Solution construction from a stop covering, and repair after the
//! covering changes.

use tracing::trace;

use super::bin_packing::pack;
use super::set_cover::is_cover;
use crate::error::RoutingError;
use crate::evaluation::RouteEvaluator;
use crate::models::{BusProblem, Solution};

/// Assigns every address to its nearest activated stop and returns the
/// passengers boarding at each stop.
fn assign_addresses(problem: &BusProblem, stop_used: &[bool], assigned_to: &mut [usize]) -> Vec<i32> {
    let mut boarding = vec![0; problem.num_stops()];
    for a in 0..problem.num_addresses() {
        if let Some(&s) = problem.stops_near(a).iter().find(|&&s| stop_used[s]) {
            assigned_to[a] = s;
            boarding[s] += problem.passengers(a);
        }
    }
    boarding
}

/// Checks that `stop_used` has one entry per stop and covers every address.
fn check_activation(problem: &BusProblem, stop_used: &[bool]) -> Result<(), RoutingError> {
    let n = problem.num_stops();
    if stop_used.len() != n {
        return Err(RoutingError::DimensionMismatch {
            what: "stop activation",
            expected: n,
            found: stop_used.len(),
        });
    }
    if !is_cover(problem, stop_used) {
        return Err(RoutingError::parameter(
            "stop activation",
            "some address has no activated stop within walking distance",
        ));
    }
    Ok(())
}

/// Builds a solution with `k` routes from a stop activation vector.
///
/// Every address walks to its nearest activated stop; activated stops
/// nobody walks to are dropped. The (stop, boarding) pairs are then packed
/// into `k` empty routes and every derived field is computed.
///
/// # Errors
///
/// Returns [`RoutingError::InvalidParameter`] if `stop_used` leaves some
/// address without an activated stop in reach, and
/// [`RoutingError::Invariant`] if the passengers do not fit in `k` buses.
///
/// # Examples
///
/// ```
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
/// let sol = build(&problem, 1, &[false, true, true]).expect("valid");
/// assert_eq!(sol.num_used_stops(), 2);
/// assert_eq!(sol.route_load(0), 5);
/// assert_eq!(sol.assigned_stop(1), 2);
/// ```
pub fn build(problem: &BusProblem, k: usize, stop_used: &[bool]) -> Result<Solution, RoutingError> {
    check_activation(problem, stop_used)?;
    let n = problem.num_stops();
    let mut sol = Solution::empty(n, problem.num_addresses(), k);
    let boarding = assign_addresses(problem, stop_used, &mut sol.assigned_to);
    let items = (1..n)
        .filter(|&s| stop_used[s] && boarding[s] > 0)
        .map(|s| (s, boarding[s]))
        .collect();
    pack(&mut sol, problem.params().capacity, items)?;
    RouteEvaluator::new(problem).recompute(&mut sol);
    trace!(
        k,
        used_stops = sol.num_used_stops(),
        cost = sol.cost(),
        "solution built"
    );
    Ok(sol)
}

/// Removes `excess` passengers of stop `v` from its occurrences, visiting
/// the routes in the order of the stop's membership list (not by position
/// within a route), leaving zero-count occurrences in place.
///
/// # Errors
///
/// Returns [`RoutingError::Invariant`] if the occurrences of `v` carry fewer
/// than `excess` passengers.
fn eliminate_from_w(sol: &mut Solution, v: usize, mut excess: i32) -> Result<(), RoutingError> {
    let k = sol.routes.len();
    for &r in &sol.routes_of_stop[v] {
        let Some(c) = sol.position[v * k + r] else {
            continue;
        };
        let w = &mut sol.boarding[r][c];
        if excess <= *w {
            *w -= excess;
            sol.route_load[r] -= excess;
            return Ok(());
        }
        sol.route_load[r] -= *w;
        excess -= *w;
        *w = 0;
    }
    Err(RoutingError::invariant(format!(
        "boarding ledger underflow: {excess} passengers of stop {v} left to remove"
    )))
}

/// Adapts `sol` to a new stop activation vector.
///
/// Addresses are reassigned to their nearest activated stop. Each stop's
/// current boarding (summed over its occurrences) is compared with the new
/// target: the excess is removed from existing occurrences, shortfalls are
/// queued for packing, and deactivated stops lose all their boarding. Empty
/// occurrences are pruned, the queue is packed and every derived field is
/// recomputed.
///
/// The derived indices of `sol` must be current on entry.
///
/// # Errors
///
/// Returns [`RoutingError::InvalidParameter`] if `stop_used` is not a
/// covering, and [`RoutingError::Invariant`] on a boarding ledger underflow
/// or if the queued passengers do not fit.
pub fn rebuild(problem: &BusProblem, sol: &mut Solution, stop_used: &[bool]) -> Result<(), RoutingError> {
    check_activation(problem, stop_used)?;
    let n = problem.num_stops();
    let k = sol.routes.len();
    let target = assign_addresses(problem, stop_used, &mut sol.assigned_to);

    let mut queue = Vec::new();
    for v in 1..n {
        if stop_used[v] && target[v] > 0 {
            let current: i32 = sol.routes_of_stop[v]
                .iter()
                .filter_map(|&r| sol.position[v * k + r].map(|c| sol.boarding[r][c]))
                .sum();
            if current < target[v] {
                queue.push((v, target[v] - current));
            } else if current > target[v] {
                eliminate_from_w(sol, v, current - target[v])?;
            }
        } else {
            for i in 0..sol.routes_of_stop[v].len() {
                let r = sol.routes_of_stop[v][i];
                if let Some(c) = sol.position[v * k + r] {
                    sol.route_load[r] -= sol.boarding[r][c];
                    sol.boarding[r][c] = 0;
                }
            }
        }
    }

    sol.prune_empty_occurrences();
    pack(sol, problem.params().capacity, queue)?;
    RouteEvaluator::new(problem).recompute(sol);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RouteParams;
    use crate::evaluation::validate;
    use crate::constructive::{cover, CoverHeuristic};
    use crate::test_support::{line_problem, random_problem};
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_build_valid() {
        let problem = line_problem(5, RouteParams::default().with_capacity(4));
        let used = vec![false, true, true, true, true, true];
        let sol = build(&problem, 3, &used).expect("valid");
        let violations = validate(&problem, &sol, false);
        assert!(violations.is_empty(), "{violations:?}");
        assert_eq!(sol.num_used_stops(), 5);
        let total: i32 = (0..3).map(|r| sol.route_load(r)).sum();
        assert_eq!(total, 10);
    }

    #[test]
    fn test_build_drops_stops_nobody_walks_to() {
        let problem = line_problem(3, RouteParams::default());
        // Stop 2 is everyone's second choice at best once 1 and 3 are open.
        let used = vec![false, true, true, true];
        let sol = build(&problem, 1, &used).expect("valid");
        assert!(sol.is_stop_used(2));
        let used = vec![false, true, false, true];
        let sol = build(&problem, 1, &used).expect("valid");
        assert!(!sol.is_stop_used(2));
        assert_eq!(sol.assigned_stop(1), 1);
    }

    #[test]
    fn test_build_wrong_length() {
        let problem = line_problem(3, RouteParams::default());
        assert!(build(&problem, 1, &[true]).is_err());
    }

    #[test]
    fn test_build_rejects_incomplete_cover() {
        // Address 0 reaches only stops 1 and 2.
        let problem = line_problem(3, RouteParams::default());
        let err = build(&problem, 1, &[false, false, false, true]).expect_err("not a cover");
        assert!(matches!(err, RoutingError::InvalidParameter { .. }));
        assert!(err.is_invalid_input());
    }

    #[test]
    fn test_rebuild_rejects_incomplete_cover() {
        let problem = line_problem(3, RouteParams::default());
        let mut sol = build(&problem, 1, &[false, true, true, true]).expect("valid");
        let before = sol.clone();
        assert!(rebuild(&problem, &mut sol, &[false, false, false, true]).is_err());
        assert_eq!(sol, before);
    }

    #[test]
    fn test_eliminate_underflow() {
        let problem = line_problem(2, RouteParams::default());
        let mut sol = build(&problem, 1, &[false, true, true]).expect("valid");
        assert!(eliminate_from_w(&mut sol, 1, 3).is_err());
    }

    #[test]
    fn test_rebuild_after_closing_a_stop() {
        let problem = line_problem(4, RouteParams::default().with_capacity(5));
        let mut sol = build(&problem, 2, &[false, true, true, true, true]).expect("valid");
        rebuild(&problem, &mut sol, &[false, true, false, true, true]).expect("valid");
        let violations = validate(&problem, &sol, false);
        assert!(violations.is_empty(), "{violations:?}");
        assert!(!sol.is_stop_used(2));
        assert_eq!(sol.assigned_stop(1), 1);
    }

    #[test]
    fn test_rebuild_random_instances() {
        for seed in 0..10 {
            let params = RouteParams::default().with_capacity(12);
            let problem = random_problem(seed, 10, 14, params);
            let k = problem.lower_bound_fleet() + 1;
            let mut all = vec![true; problem.num_stops()];
            all[0] = false;
            let mut sol = build(&problem, k, &all).expect("valid");
            let mut fewer = all.clone();
            for s in (1..problem.num_stops()).step_by(3) {
                fewer[s] = false;
            }
            for a in 0..problem.num_addresses() {
                if !problem.stops_near(a).iter().any(|&s| fewer[s]) {
                    fewer[problem.stops_near(a)[0]] = true;
                }
            }
            rebuild(&problem, &mut sol, &fewer).expect("valid");
            let violations = validate(&problem, &sol, false);
            assert!(violations.is_empty(), "seed {seed}: {violations:?}");
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(24))]

        #[test]
        fn prop_rebuild_onto_random_cover_is_valid(seed in 0u64..1000) {
            let problem = random_problem(seed, 10, 14, RouteParams::default().with_capacity(12));
            let k = problem.lower_bound_fleet() + 1;
            let mut rng = StdRng::seed_from_u64(seed);
            let mut used = vec![false; problem.num_stops()];
            cover(&problem, &mut used, None, CoverHeuristic::Greedy, false, &mut rng).expect("valid");
            let mut sol = build(&problem, k, &used).expect("valid");
            let mut next = vec![false; problem.num_stops()];
            cover(&problem, &mut next, None, CoverHeuristic::Random, seed % 2 == 0, &mut rng).expect("valid");
            rebuild(&problem, &mut sol, &next).expect("valid");
            let violations = validate(&problem, &sol, false);
            prop_assert!(violations.is_empty(), "{:?}", violations);
        }
    }
}
