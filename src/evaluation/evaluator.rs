//! Route evaluator: lengths, loads, costs and the derived solution indices.

use crate::models::{BusProblem, Solution, SCHOOL};

/// Evaluates routes against a problem instance and rebuilds every derived
/// field of a [`Solution`] from its routes and boarding counts.
///
/// # Examples
///
/// ```
/// use school_bus_routing::config::RouteParams;
/// use school_bus_routing::distance::DistanceMatrix;
/// use school_bus_routing::evaluation::RouteEvaluator;
/// use school_bus_routing::models::{Address, BusProblem, DistanceUnit, ProblemInput, Stop, WalkLink};
///
/// let drive = DistanceMatrix::from_data(3, 3, vec![
///     0.0, 100.0, 120.0,
///     100.0, 0.0, 50.0,
///     120.0, 50.0, 0.0,
/// ]).expect("valid");
/// let input = ProblemInput {
///     stops: vec![Stop::new(0.0, 0.0, "School"), Stop::new(1.0, 0.0, "A"), Stop::new(2.0, 0.0, "B")],
///     addresses: vec![Address::new(1.0, 0.1, 2, "x")],
///     distance_unit: DistanceUnit::Kilometres,
///     min_eligibility_distance: 0.0,
///     max_walk_distance: 0.5,
///     drive_distance: drive.clone(),
///     drive_time: drive,
///     walks: vec![WalkLink { address: 0, stop: 1, distance: 0.1, time: 60.0 }],
/// };
/// let problem = BusProblem::new(input, RouteParams::default()).expect("valid");
/// let evaluator = RouteEvaluator::new(&problem);
///
/// // B then A then the school: dwell(0) + 50 + dwell(2) + 100.
/// let len = evaluator.route_length(&[2, 1], &[0, 2]);
/// assert_eq!(len, 15.0 + 50.0 + 25.0 + 100.0);
/// ```
pub struct RouteEvaluator<'a> {
    problem: &'a BusProblem,
}

impl<'a> RouteEvaluator<'a> {
    /// Creates a new evaluator for the given problem.
    pub fn new(problem: &'a BusProblem) -> Self {
        Self { problem }
    }

    /// Journey time of a stop sequence: dwell at every stop, the legs between
    /// consecutive stops and the final leg to the school. An empty route has
    /// length zero.
    pub fn route_length(&self, stops: &[usize], boarding: &[i32]) -> f64 {
        let Some(&last) = stops.last() else {
            return 0.0;
        };
        let params = self.problem.params();
        let mut length = 0.0;
        for (i, &s) in stops.iter().enumerate() {
            length += params.dwell_time(boarding[i]);
            if let Some(&next) = stops.get(i + 1) {
                length += self.problem.drive_time(s, next);
            }
        }
        length + self.problem.drive_time(last, SCHOOL)
    }

    /// Σ passengers × walking time to the given per-address stops.
    pub fn walk_cost(&self, assigned: &[usize]) -> f64 {
        assigned
            .iter()
            .enumerate()
            .map(|(a, &s)| f64::from(self.problem.passengers(a)) * self.problem.walk_time(a, s))
            .sum()
    }

    /// First used stop in the walking adjacency of address `a`.
    pub fn nearest_used_stop(&self, sol: &Solution, a: usize) -> Option<usize> {
        self.problem
            .stops_near(a)
            .iter()
            .copied()
            .find(|&s| sol.stop_used[s])
    }

    /// Rebuilds membership, positions, shared-stop flags, stop activation,
    /// per-stop boarding, assignments, lengths, loads, outlier flags, the
    /// aggregate counters and both costs from the routes and boarding counts.
    pub fn recompute(&self, sol: &mut Solution) {
        let problem = self.problem;
        let params = problem.params();
        let k = sol.routes.len();
        let n = problem.num_stops();

        for rs in &mut sol.routes_of_stop {
            rs.clear();
        }
        sol.position.iter_mut().for_each(|p| *p = None);
        sol.shares_stop.iter_mut().for_each(|f| *f = false);
        sol.num_boarding.iter_mut().for_each(|b| *b = 0);

        for r in 0..k {
            for p in 0..sol.routes[r].len() {
                let s = sol.routes[r][p];
                sol.position[s * k + r] = Some(p);
                sol.routes_of_stop[s].push(r);
                sol.num_boarding[s] += sol.boarding[r][p];
            }
        }
        for s in 0..n {
            let rs = &sol.routes_of_stop[s];
            for (i, &a) in rs.iter().enumerate() {
                for &b in &rs[i + 1..] {
                    sol.shares_stop[a * k + b] = true;
                    sol.shares_stop[b * k + a] = true;
                }
            }
        }

        sol.num_used_stops = 0;
        for s in 0..n {
            sol.stop_used[s] = sol.num_boarding[s] > 0;
            if sol.stop_used[s] {
                sol.num_used_stops += 1;
            }
        }

        for a in 0..problem.num_addresses() {
            sol.assigned_to[a] = self
                .nearest_used_stop(sol, a)
                .unwrap_or(problem.stops_near(a)[0]);
        }

        sol.cost = 0.0;
        sol.num_feasible_routes = 0;
        sol.num_empty_routes = 0;
        sol.num_occurrences = 0;
        sol.num_outlier_routes = 0;
        for r in 0..k {
            let len = self.route_length(&sol.routes[r], &sol.boarding[r]);
            sol.route_len[r] = len;
            sol.route_load[r] = sol.boarding[r].iter().sum();
            sol.has_outlier[r] = sol.routes[r].iter().any(|&s| problem.is_outlier(s));
            sol.cost += params.route_cost(len);
            if params.is_route_feasible(len, sol.has_outlier[r]) {
                sol.num_feasible_routes += 1;
            }
            if sol.has_outlier[r] {
                sol.num_outlier_routes += 1;
            }
            if sol.routes[r].is_empty() {
                sol.num_empty_routes += 1;
            }
            sol.num_occurrences += sol.routes[r].len();
        }
        sol.walk_cost = self.walk_cost(&sol.assigned_to);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RouteParams;
    use crate::test_support::line_problem;

    #[test]
    fn test_route_length_empty() {
        let problem = line_problem(3, RouteParams::default());
        let ev = RouteEvaluator::new(&problem);
        assert_eq!(ev.route_length(&[], &[]), 0.0);
    }

    #[test]
    fn test_route_length_single_stop() {
        let problem = line_problem(3, RouteParams::default());
        let ev = RouteEvaluator::new(&problem);
        // dwell(4) + drive(2 -> school)
        let expected = 15.0 + 20.0 + 230.0;
        assert!((ev.route_length(&[2], &[4]) - expected).abs() < 1e-10);
    }

    #[test]
    fn test_recompute_derives_everything() {
        let problem = line_problem(3, RouteParams::default());
        let ev = RouteEvaluator::new(&problem);
        let mut sol = Solution::empty(4, 3, 2);
        sol.routes = vec![vec![3, 2], vec![2, 1]];
        sol.boarding = vec![vec![2, 1], vec![1, 2]];
        ev.recompute(&mut sol);

        assert_eq!(sol.routes_of_stop(2), &[0, 1]);
        assert_eq!(sol.position_of(2, 1), Some(0));
        assert_eq!(sol.position_of(3, 1), None);
        assert!(sol.shares_stop(0, 1));
        assert_eq!(sol.num_boarding(2), 2);
        assert_eq!(sol.num_used_stops(), 3);
        assert_eq!(sol.num_occurrences(), 4);
        assert_eq!(sol.num_empty_routes(), 0);
        assert_eq!(sol.route_load(0), 3);
        for a in 0..3 {
            assert_eq!(sol.assigned_stop(a), a + 1);
        }
        // Every address walks 60 s and carries 2 passengers.
        assert!((sol.walk_cost() - 360.0).abs() < 1e-10);
        let total = ev.route_length(&[3, 2], &[2, 1]) + ev.route_length(&[2, 1], &[1, 2]);
        assert!((sol.cost() - total).abs() < 1e-10);
        assert!(sol.is_feasible());
    }

    #[test]
    fn test_recompute_counts_infeasible_routes() {
        let params = RouteParams::default().with_max_journey_time(300.0);
        let problem = line_problem(2, params);
        let ev = RouteEvaluator::new(&problem);
        let mut sol = Solution::empty(3, 2, 2);
        // 25 + 130 + 25 + 130 = 310 > 300
        sol.routes = vec![vec![2, 1], vec![]];
        sol.boarding = vec![vec![2, 2], vec![]];
        ev.recompute(&mut sol);
        assert_eq!(sol.num_feasible_routes(), 1);
        assert_eq!(sol.num_empty_routes(), 1);
        assert!(!sol.is_feasible());
        assert!(sol.cost() > sol.route_length(0));
    }
}
