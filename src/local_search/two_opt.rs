//! Intra-route 2-opt section reversal.
//!
//! # Algorithm
//!
//! Reverses the section `[first, last]` of a route. Drive times need not be
//! symmetric, so the internal legs are replaced by their reverse:
//!
//! ```text
//! Δ = link(p, s_last) + d(s_first, n) - link(p, s_first) - d(s_last, n)
//!   + inner_rev - inner
//! ```
//!
//! where p is the stop before the section (none at the head) and n the stop
//! after it (the school at the tail). Dwell times do not change.
//!
//! # Complexity
//!
//! O(1) per evaluation with the inner sums accumulated by the caller.
//!
//! # Reference
//!
//! Croes, G.A. (1958). "A Method for Solving Traveling-Salesman Problems",
//! *Operations Research* 6(6), 791-812.

use super::splice::{link, stop_at, stop_before, Section};
use super::total_cost;
use crate::models::{BusProblem, Solution};

/// Length of `route` after reversing `sec`.
pub(crate) fn reversed_length(problem: &BusProblem, route: &[usize], len: f64, sec: &Section) -> f64 {
    let prev = stop_before(route, sec.start);
    let next = stop_at(route, sec.end);
    let (first, last) = (route[sec.start], route[sec.end - 1]);
    len - link(problem, prev, first) - problem.drive_time(last, next)
        + link(problem, prev, last)
        + problem.drive_time(first, next)
        - sec.inner
        + sec.inner_rev
}

/// Cost after reversing `sec` in route `r`.
pub(crate) fn reverse_cost(problem: &BusProblem, sol: &Solution, r: usize, sec: &Section) -> f64 {
    let len = reversed_length(problem, &sol.routes[r], sol.route_len[r], sec);
    total_cost(problem, sol, &[(r, len)])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RouteParams;
    use crate::evaluation::RouteEvaluator;
    use crate::test_support::{custom_input, line_problem};

    #[test]
    fn test_reversed_length_matches_recomputation() {
        let problem = line_problem(6, RouteParams::default());
        let ev = RouteEvaluator::new(&problem);
        let route = [2, 6, 1, 4, 3];
        let w = [1, 2, 3, 1, 2];
        let len = ev.route_length(&route, &w);
        for i in 0..route.len() {
            let mut sec = Section::empty(i);
            sec.extend(&problem, &route, &w);
            while sec.end < route.len() {
                sec.extend(&problem, &route, &w);
                let mut stops = route.to_vec();
                let mut counts = w.to_vec();
                stops[i..sec.end].reverse();
                counts[i..sec.end].reverse();
                let expected = ev.route_length(&stops, &counts);
                let got = reversed_length(&problem, &route, len, &sec);
                assert!((got - expected).abs() < 1e-9, "[{i}, {}): {got} vs {expected}", sec.end);
            }
        }
    }

    #[test]
    fn test_asymmetric_reversal() {
        // Driving 1 -> 2 is cheap, 2 -> 1 expensive.
        let drive = vec![
            vec![0.0, 100.0, 100.0],
            vec![100.0, 0.0, 10.0],
            vec![100.0, 500.0, 0.0],
        ];
        let input = custom_input(&drive, &[1, 1], &[(0, 1, 10.0), (1, 2, 10.0)]);
        let problem = crate::models::BusProblem::new(input, RouteParams::default()).expect("valid");
        let ev = RouteEvaluator::new(&problem);
        let route = [2, 1];
        let w = [1, 1];
        let len = ev.route_length(&route, &w);
        let mut sec = Section::empty(0);
        sec.extend(&problem, &route, &w);
        sec.extend(&problem, &route, &w);
        let got = reversed_length(&problem, &route, len, &sec);
        assert!((len - got - 490.0).abs() < 1e-10);
    }
}
