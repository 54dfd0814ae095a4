//! Section exchange between two routes and stop exchange within a route.
//!
//! # Algorithm
//!
//! **Cross exchange**: sections `[start, end)` of route A and
//! `[to_start, to_end)` of route B trade places, each in its better
//! orientation. A stop that lands in a route already visiting it outside
//! the exchanged window is merged into that visit.
//!
//! **Swap**: two stops of the same route trade positions. Four legs change
//! when they are apart; adjacent stops are a two-stop reversal.
//!
//! ```text
//! Δ_swap = link(p, b) + d(b, a⁺) + d(b⁻, a) + d(a, n)
//!        - link(p, a) - d(a, a⁺) - d(b⁻, b) - d(b, n)
//! ```
//!
//! # Complexity
//!
//! O(1) per evaluation, O(L) when the two routes share a stop.
//!
//! # Reference
//!
//! Taillard, É., Badeau, P., Gendreau, M., Guertin, F. & Potvin, J.-Y.
//! (1997). "A Tabu Search Heuristic for the Vehicle Routing Problem with
//! Soft Time Windows", *Transportation Science* 31(2), 170-186.

use super::splice::{best_splice, cut_length, link, merged_splice, stop_at, stop_before, Gap, Section};
use super::total_cost;
use super::two_opt::reversed_length;
use crate::models::{BusProblem, Solution};

/// Cost of exchanging `a_sec` of route `a` with `b_sec` of route `b`, with
/// the orientation chosen for each section.
pub(crate) fn swap_sections_cost(
    problem: &BusProblem,
    sol: &Solution,
    a: usize,
    a_sec: &Section,
    b: usize,
    b_sec: &Section,
) -> (f64, bool, bool) {
    let route_a = &sol.routes[a];
    let route_b = &sol.routes[b];
    let a_cut = cut_length(problem, route_a, sol.route_len[a], a_sec);
    let b_cut = cut_length(problem, route_b, sol.route_len[b], b_sec);
    let gap_a = Gap::around(route_a, a_sec.start, a_sec.end);
    let gap_b = Gap::around(route_b, b_sec.start, b_sec.end);

    let (mut len_b, a_reversed) = best_splice(problem, b_cut, gap_b, route_a, a_sec);
    let (mut len_a, b_reversed) = best_splice(problem, a_cut, gap_a, route_b, b_sec);

    if sol.shares_stop(a, b) {
        let absent_from_b = |s: usize| sol.position_of(s, b).map_or(true, |p| b_sec.contains(p));
        let absent_from_a = |s: usize| sol.position_of(s, a).map_or(true, |p| a_sec.contains(p));
        if let Some(len) = merged_splice(problem, b_cut, gap_b, route_a, a_sec, a_reversed, absent_from_b) {
            len_b = len;
        }
        if let Some(len) = merged_splice(problem, a_cut, gap_a, route_b, b_sec, b_reversed, absent_from_a) {
            len_a = len;
        }
    }

    let cost = total_cost(problem, sol, &[(a, len_a), (b, len_b)]);
    (cost, a_reversed, b_reversed)
}

/// Length of `route` after swapping the stops at the two ends of `sec`.
pub(crate) fn swapped_length(problem: &BusProblem, route: &[usize], len: f64, sec: &Section) -> f64 {
    let (i, j) = (sec.start, sec.end - 1);
    if j == i + 1 {
        return reversed_length(problem, route, len, sec);
    }
    let d = |u: usize, v: usize| problem.drive_time(u, v);
    let prev = stop_before(route, i);
    let next = stop_at(route, j + 1);
    let (a, b) = (route[i], route[j]);
    let (a_next, b_prev) = (route[i + 1], route[j - 1]);
    len - link(problem, prev, a) - d(a, a_next) - d(b_prev, b) - d(b, next)
        + link(problem, prev, b)
        + d(b, a_next)
        + d(b_prev, a)
        + d(a, next)
}

/// Cost after swapping the stops at the two ends of `sec` in route `r`.
pub(crate) fn swap_stops_cost(problem: &BusProblem, sol: &Solution, r: usize, sec: &Section) -> f64 {
    let len = swapped_length(problem, &sol.routes[r], sol.route_len[r], sec);
    total_cost(problem, sol, &[(r, len)])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RouteParams;
    use crate::evaluation::RouteEvaluator;
    use crate::test_support::line_problem;

    fn section(problem: &BusProblem, route: &[usize], w: &[i32], start: usize, end: usize) -> Section {
        let mut sec = Section::empty(start);
        while sec.end < end {
            sec.extend(problem, route, w);
        }
        sec
    }

    #[test]
    fn test_swapped_length_matches_recomputation() {
        let problem = line_problem(6, RouteParams::default());
        let ev = RouteEvaluator::new(&problem);
        let route = [3, 6, 1, 5, 2];
        let w = [1, 2, 3, 1, 2];
        let len = ev.route_length(&route, &w);
        for i in 0..route.len() {
            for j in i + 1..route.len() {
                let sec = section(&problem, &route, &w, i, j + 1);
                let mut stops = route.to_vec();
                let mut counts = w.to_vec();
                stops.swap(i, j);
                counts.swap(i, j);
                let expected = ev.route_length(&stops, &counts);
                let got = swapped_length(&problem, &route, len, &sec);
                assert!((got - expected).abs() < 1e-9, "({i}, {j}): {got} vs {expected}");
            }
        }
    }

    #[test]
    fn test_swap_sections_matches_recomputation() {
        let problem = line_problem(6, RouteParams::default());
        let ev = RouteEvaluator::new(&problem);
        let mut sol = Solution::empty(7, 6, 2);
        sol.routes = vec![vec![6, 1, 4], vec![2, 5, 3]];
        sol.boarding = vec![vec![2, 2, 2], vec![2, 2, 2]];
        ev.recompute(&mut sol);
        let a_sec = section(&problem, &sol.routes[0], &sol.boarding[0], 1, 3);
        let b_sec = section(&problem, &sol.routes[1], &sol.boarding[1], 0, 1);
        let (cost, a_rev, b_rev) = swap_sections_cost(&problem, &sol, 0, &a_sec, 1, &b_sec);
        let mut moved_a = vec![1, 4];
        if a_rev {
            moved_a.reverse();
        }
        assert!(!b_rev);
        let mut new_a = vec![6];
        new_a.push(2);
        let mut new_b = moved_a.clone();
        new_b.extend([5, 3]);
        let expected = ev.route_length(&new_a, &[2, 2]) + ev.route_length(&new_b, &[2, 2, 2, 2]);
        assert!((cost - expected).abs() < 1e-9, "{cost} vs {expected}");
    }
}
