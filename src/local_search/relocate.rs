//! Inter-route section relocation.
//!
//! # Algorithm
//!
//! A section `[start, end)` of one route is cut out and spliced, in its
//! better orientation, either into an empty route (the whole bus) or in
//! front of any position of a non-empty route, including after its last
//! stop. Stops of the section the target already visits are not visited
//! twice: their passengers join the existing occurrence, which saves the
//! fixed dwell of the duplicate.
//!
//! ```text
//! Δ = rc(cut(L_from)) + rc(splice(L_to)) - rc(L_from) - rc(L_to)
//! ```
//!
//! # Complexity
//!
//! O(1) per evaluation, O(L) when the two routes share a stop.
//!
//! # Reference
//!
//! Savelsbergh, M.W.P. (1992). "The Vehicle Routing Problem with Time
//! Windows: Minimizing Route Duration", *ORSA Journal on Computing* 4(2).

use super::splice::{best_splice, cut_length, merged_splice, Gap, Section};
use super::total_cost;
use crate::models::{BusProblem, Solution};

/// Cost after moving `sec` of route `from` into an empty route, and whether
/// the section is reversed.
pub(crate) fn to_empty_cost(problem: &BusProblem, sol: &Solution, from: usize, to: usize, sec: &Section) -> (f64, bool) {
    let route = &sol.routes[from];
    let (len_to, reversed) = best_splice(problem, 0.0, Gap::empty_route(), route, sec);
    let len_from = cut_length(problem, route, sol.route_len[from], sec);
    let cost = total_cost(problem, sol, &[(from, len_from), (to, len_to)]);
    (cost, reversed)
}

/// Cost after moving `sec` of route `from` in front of position `at` of the
/// non-empty route `to`, and whether the section is reversed.
pub(crate) fn insert_cost(
    problem: &BusProblem,
    sol: &Solution,
    from: usize,
    sec: &Section,
    to: usize,
    at: usize,
) -> (f64, bool) {
    let route = &sol.routes[from];
    let base = sol.route_len[to];
    let gap = Gap::before(&sol.routes[to], at);
    let (mut len_to, reversed) = best_splice(problem, base, gap, route, sec);
    if sol.shares_stop(from, to) {
        let absent = |s: usize| sol.position_of(s, to).is_none();
        if let Some(merged) = merged_splice(problem, base, gap, route, sec, reversed, absent) {
            len_to = merged;
        }
    }
    let len_from = cut_length(problem, route, sol.route_len[from], sec);
    let cost = total_cost(problem, sol, &[(from, len_from), (to, len_to)]);
    (cost, reversed)
}
