//! Intra-route Or-opt section relocation.
//!
//! # Algorithm
//!
//! Cuts the section `[first, last]` out of a route and reinserts it, in its
//! better orientation, in front of position `before`, where `before` lies
//! outside the section and is not the position right after it. The gap is
//! named by positions of the route before the cut; the cut never touches it.
//!
//! # Complexity
//!
//! O(1) per evaluation, O(L³) per route scan.
//!
//! # Reference
//!
//! Or, I. (1976). "Traveling Salesman-Type Combinatorial Problems and Their
//! Relation to the Logistics of Blood Banking". PhD thesis.

use super::splice::{best_splice, cut_length, Gap, Section};
use super::total_cost;
use crate::models::{BusProblem, Solution};

/// Length of `route` after moving `sec` in front of position `before`, and
/// whether the section is reversed.
pub(crate) fn or_opt_length(
    problem: &BusProblem,
    route: &[usize],
    len: f64,
    sec: &Section,
    before: usize,
) -> (f64, bool) {
    debug_assert!(before < sec.start || before > sec.end);
    let cut = cut_length(problem, route, len, sec);
    best_splice(problem, cut, Gap::before(route, before), route, sec)
}

/// Cost after moving `sec` of route `r` in front of position `before`.
pub(crate) fn or_opt_cost(
    problem: &BusProblem,
    sol: &Solution,
    r: usize,
    sec: &Section,
    before: usize,
) -> (f64, bool) {
    let (len, reversed) = or_opt_length(problem, &sol.routes[r], sol.route_len[r], sec, before);
    (total_cost(problem, sol, &[(r, len)]), reversed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RouteParams;
    use crate::evaluation::RouteEvaluator;
    use crate::test_support::line_problem;

    #[test]
    fn test_or_opt_matches_recomputation() {
        let problem = line_problem(7, RouteParams::default());
        let ev = RouteEvaluator::new(&problem);
        let route = [4, 7, 1, 6, 2, 5];
        let w = [2, 1, 2, 3, 1, 2];
        let len = ev.route_length(&route, &w);
        let n = route.len();
        for first in 0..n {
            let mut sec = Section::empty(first);
            while sec.end < n {
                sec.extend(&problem, &route, &w);
                let targets = (0..first).chain(sec.end + 1..=n);
                for before in targets {
                    let (got, reversed) = or_opt_length(&problem, &route, len, &sec, before);
                    let mut piece: Vec<(usize, i32)> =
                        (first..sec.end).map(|p| (route[p], w[p])).collect();
                    if reversed {
                        piece.reverse();
                    }
                    let mut rest: Vec<(usize, i32)> = (0..n)
                        .filter(|&p| !sec.contains(p))
                        .map(|p| (route[p], w[p]))
                        .collect();
                    let at = if before < first { before } else { before - (sec.end - first) };
                    rest.splice(at..at, piece);
                    let stops: Vec<usize> = rest.iter().map(|&(s, _)| s).collect();
                    let counts: Vec<i32> = rest.iter().map(|&(_, c)| c).collect();
                    let expected = ev.route_length(&stops, &counts);
                    assert!(
                        (got - expected).abs() < 1e-9,
                        "[{first}, {}) before {before}: {got} vs {expected}",
                        sec.end
                    );
                }
            }
        }
    }
}
