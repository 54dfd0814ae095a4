//! Full consistency check of a solution against its instance.
//!
//! Every incremental structure of a [`Solution`] is recomputed from the
//! routes and boarding counts and compared with the stored value. The check
//! is `O(k² + k·n + m·n)` and is meant for tests and debugging, not for the
//! inner search loops.

use super::RouteEvaluator;
use crate::models::{BusProblem, Solution, Violation, ViolationType, SCHOOL};

const TOLERANCE: f64 = 1e-5;

fn differs(expected: f64, found: f64) -> bool {
    (expected - found).abs() > TOLERANCE * expected.abs().max(1.0)
}

/// Returns every violation found in `sol`; an empty vector means the solution
/// is consistent. With `check_minimal`, used stops that could be dropped
/// without uncovering an address are reported as well.
///
/// # Examples
///
/// ```
/// use school_bus_routing::models::{Solution, ViolationType};
/// # use school_bus_routing::config::RouteParams;
/// # use school_bus_routing::distance::DistanceMatrix;
/// # use school_bus_routing::models::{Address, BusProblem, DistanceUnit, ProblemInput, Stop, WalkLink};
/// use school_bus_routing::evaluation::validate;
/// # let drive = DistanceMatrix::from_data(2, 2, vec![0.0, 100.0, 100.0, 0.0]).expect("valid");
/// # let input = ProblemInput {
/// #     stops: vec![Stop::new(0.0, 0.0, "School"), Stop::new(1.0, 0.0, "A")],
/// #     addresses: vec![Address::new(1.0, 0.1, 2, "x")],
/// #     distance_unit: DistanceUnit::Kilometres,
/// #     min_eligibility_distance: 0.0,
/// #     max_walk_distance: 0.5,
/// #     drive_distance: drive.clone(),
/// #     drive_time: drive,
/// #     walks: vec![WalkLink { address: 0, stop: 1, distance: 0.1, time: 60.0 }],
/// # };
/// # let problem = BusProblem::new(input, RouteParams::default()).expect("valid");
///
/// // Nobody is picked up: the passenger total does not match.
/// let sol = Solution::empty(2, 1, 1);
/// let violations = validate(&problem, &sol, false);
/// assert!(!violations.is_empty());
/// ```
pub fn validate(problem: &BusProblem, sol: &Solution, check_minimal: bool) -> Vec<Violation> {
    let mut out = Vec::new();
    let mut push = |kind| out.push(Violation::new(kind));
    let params = problem.params();
    let evaluator = RouteEvaluator::new(problem);
    let n = problem.num_stops();
    let k = sol.num_routes();

    // Stop indices and duplicates.
    let mut structurally_sound = true;
    for r in 0..k {
        let mut seen = vec![false; n];
        if sol.routes[r].len() != sol.boarding[r].len() {
            push(ViolationType::CountMismatch {
                what: "boarding entries",
                expected: sol.routes[r].len(),
                found: sol.boarding[r].len(),
            });
            structurally_sound = false;
        }
        for &s in &sol.routes[r] {
            if s == SCHOOL || s >= n {
                push(ViolationType::InvalidStop { route: r, stop: s });
                structurally_sound = false;
                continue;
            }
            if seen[s] {
                push(ViolationType::DuplicateStop { route: r, stop: s });
            }
            seen[s] = true;
        }
    }
    if !structurally_sound {
        return out;
    }

    // Membership, positions and shared-stop flags.
    let mut members = vec![Vec::new(); n];
    for r in 0..k {
        for (p, &s) in sol.routes[r].iter().enumerate() {
            members[s].push(r);
            if sol.position_of(s, r) != Some(p) {
                push(ViolationType::PositionMismatch { stop: s, route: r });
            }
        }
    }
    for s in 0..n {
        let mut stored = sol.routes_of_stop[s].clone();
        stored.sort_unstable();
        if stored != members[s] {
            push(ViolationType::MembershipMismatch { stop: s });
        }
        for r in 0..k {
            if !members[s].contains(&r) && sol.position_of(s, r).is_some() {
                push(ViolationType::PositionMismatch { stop: s, route: r });
            }
        }
    }
    for a in 0..k {
        for b in 0..k {
            if a == b {
                continue;
            }
            let shared = sol.routes[a].iter().any(|s| sol.routes[b].contains(s));
            if shared != sol.shares_stop(a, b) {
                push(ViolationType::SharedStopMismatch {
                    first: a,
                    second: b,
                });
            }
        }
    }

    // Outliers, boarding counts and per-route loads.
    let mut num_boarding = vec![0; n];
    let mut outlier_routes = 0;
    let mut empty_routes = 0;
    for r in 0..k {
        let has_outlier = sol.routes[r].iter().any(|&s| problem.is_outlier(s));
        if has_outlier != sol.has_outlier[r] {
            push(ViolationType::OutlierMismatch { route: r });
        }
        if has_outlier {
            outlier_routes += 1;
        }
        if sol.routes[r].is_empty() {
            empty_routes += 1;
        }
        for (p, &w) in sol.boarding[r].iter().enumerate() {
            if w <= 0 {
                push(ViolationType::NonPositiveBoarding {
                    route: r,
                    position: p,
                    count: w,
                });
            }
            num_boarding[sol.routes[r][p]] += w;
        }
        let load: i32 = sol.boarding[r].iter().sum();
        if load != sol.route_load[r] {
            push(ViolationType::LoadMismatch {
                index: r,
                what: "route load",
                expected: load,
                found: sol.route_load[r],
            });
        }
        if load > params.capacity {
            push(ViolationType::CapacityExceeded {
                route: r,
                load,
                capacity: params.capacity,
            });
        }
    }
    for (what, expected, found) in [
        ("outlier routes", outlier_routes, sol.num_outlier_routes),
        ("empty routes", empty_routes, sol.num_empty_routes),
    ] {
        if expected != found {
            push(ViolationType::CountMismatch {
                what,
                expected,
                found,
            });
        }
    }

    // Used stops.
    let mut used = 0;
    for s in 0..n {
        let in_routes = !members[s].is_empty();
        if in_routes {
            used += 1;
        }
        if in_routes != sol.stop_used[s] || (num_boarding[s] > 0) != sol.stop_used[s] {
            push(ViolationType::UsedStopMismatch { stop: s });
        }
        if num_boarding[s] != sol.num_boarding[s] {
            push(ViolationType::LoadMismatch {
                index: s,
                what: "stop boarding",
                expected: num_boarding[s],
                found: sol.num_boarding[s],
            });
        }
    }
    if used != sol.num_used_stops {
        push(ViolationType::CountMismatch {
            what: "used stops",
            expected: used,
            found: sol.num_used_stops,
        });
    }
    let occurrences: usize = sol.routes.iter().map(Vec::len).sum();
    if occurrences != sol.num_occurrences {
        push(ViolationType::CountMismatch {
            what: "stop occurrences",
            expected: occurrences,
            found: sol.num_occurrences,
        });
    }

    // Assignments: nearest used stop, and boarding totals per stop.
    let mut assigned_boarding = vec![0; n];
    for a in 0..problem.num_addresses() {
        let nearest = problem
            .stops_near(a)
            .iter()
            .copied()
            .find(|&s| !members[s].is_empty());
        match nearest {
            Some(s) if s == sol.assigned_to[a] => {}
            Some(s) => push(ViolationType::AssignmentNotNearest {
                address: a,
                assigned: sol.assigned_to[a],
                nearest: s,
            }),
            None => push(ViolationType::AssignmentNotNearest {
                address: a,
                assigned: sol.assigned_to[a],
                nearest: SCHOOL,
            }),
        }
        if sol.assigned_to[a] < n {
            assigned_boarding[sol.assigned_to[a]] += problem.passengers(a);
        }
    }
    for s in 0..n {
        if assigned_boarding[s] != num_boarding[s] {
            push(ViolationType::LoadMismatch {
                index: s,
                what: "assigned passengers",
                expected: assigned_boarding[s],
                found: num_boarding[s],
            });
        }
    }
    let total: i32 = num_boarding.iter().sum();
    if total != problem.total_passengers() {
        push(ViolationType::LoadMismatch {
            index: SCHOOL,
            what: "total passengers",
            expected: problem.total_passengers(),
            found: total,
        });
    }

    if check_minimal {
        for s in 1..n {
            if members[s].is_empty() || problem.is_required(s) {
                continue;
            }
            let redundant = problem.addresses_near(s).iter().all(|&a| {
                problem
                    .stops_near(a)
                    .iter()
                    .any(|&t| t != s && !members[t].is_empty())
            });
            if redundant {
                push(ViolationType::NotMinimal { stop: s });
            }
        }
    }

    // Lengths, feasibility and costs.
    let mut cost = 0.0;
    let mut feasible = 0;
    for r in 0..k {
        let len = evaluator.route_length(&sol.routes[r], &sol.boarding[r]);
        if differs(len, sol.route_len[r]) {
            push(ViolationType::ValueMismatch {
                what: "route length",
                route: Some(r),
                expected: len,
                found: sol.route_len[r],
            });
        }
        cost += params.route_cost(len);
        if params.is_route_feasible(len, sol.has_outlier[r]) {
            feasible += 1;
        }
    }
    if feasible != sol.num_feasible_routes {
        push(ViolationType::CountMismatch {
            what: "feasible routes",
            expected: feasible,
            found: sol.num_feasible_routes,
        });
    }
    if differs(cost, sol.cost) {
        push(ViolationType::ValueMismatch {
            what: "cost",
            route: None,
            expected: cost,
            found: sol.cost,
        });
    }
    let walk = evaluator.walk_cost(&sol.assigned_to);
    if differs(walk, sol.walk_cost) {
        push(ViolationType::ValueMismatch {
            what: "walk cost",
            route: None,
            expected: walk,
            found: sol.walk_cost,
        });
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RouteParams;
    use crate::test_support::line_problem;

    fn consistent() -> (BusProblem, Solution) {
        let problem = line_problem(3, RouteParams::default());
        let mut sol = Solution::empty(4, 3, 2);
        sol.routes = vec![vec![3, 2], vec![1]];
        sol.boarding = vec![vec![2, 2], vec![2]];
        RouteEvaluator::new(&problem).recompute(&mut sol);
        (problem, sol)
    }

    #[test]
    fn test_recomputed_solution_is_valid() {
        let (problem, sol) = consistent();
        let violations = validate(&problem, &sol, false);
        assert!(violations.is_empty(), "{violations:?}");
    }

    #[test]
    fn test_detects_stale_length() {
        let (problem, mut sol) = consistent();
        sol.route_len[0] += 10.0;
        let violations = validate(&problem, &sol, false);
        assert!(violations.iter().any(|v| matches!(
            v.kind,
            ViolationType::ValueMismatch {
                what: "route length",
                ..
            }
        )));
    }

    #[test]
    fn test_detects_duplicate_and_capacity() {
        let params = RouteParams::default().with_capacity(3);
        let problem = line_problem(3, params);
        let mut sol = Solution::empty(4, 3, 1);
        sol.routes = vec![vec![1, 2, 1]];
        sol.boarding = vec![vec![2, 2, 2]];
        RouteEvaluator::new(&problem).recompute(&mut sol);
        let violations = validate(&problem, &sol, false);
        assert!(violations
            .iter()
            .any(|v| matches!(v.kind, ViolationType::DuplicateStop { stop: 1, .. })));
        assert!(violations
            .iter()
            .any(|v| matches!(v.kind, ViolationType::CapacityExceeded { .. })));
    }

    #[test]
    fn test_detects_school_in_route() {
        let (problem, mut sol) = consistent();
        sol.routes[1].push(SCHOOL);
        sol.boarding[1].push(1);
        let violations = validate(&problem, &sol, false);
        assert!(violations
            .iter()
            .any(|v| matches!(v.kind, ViolationType::InvalidStop { stop: 0, .. })));
    }

    #[test]
    fn test_detects_non_minimal_cover() {
        let problem = line_problem(3, RouteParams::default());
        let mut sol = Solution::empty(4, 3, 1);
        // Stop 2 alone reaches every address; 1 and 3 are redundant.
        sol.routes = vec![vec![2]];
        sol.boarding = vec![vec![6]];
        RouteEvaluator::new(&problem).recompute(&mut sol);
        assert!(validate(&problem, &sol, true).is_empty());

        let mut sol = Solution::empty(4, 3, 1);
        sol.routes = vec![vec![1, 2]];
        sol.boarding = vec![vec![2, 4]];
        RouteEvaluator::new(&problem).recompute(&mut sol);
        assert!(validate(&problem, &sol, false).is_empty());
        assert!(validate(&problem, &sol, true)
            .iter()
            .any(|v| matches!(v.kind, ViolationType::NotMinimal { stop: 1 })));
    }
}
