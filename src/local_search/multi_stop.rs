//! Multi-stop copy: a second bus serves part of a stop.
//!
//! # Algorithm
//!
//! A stop with more than one boarding passenger on route A hands `t` of
//! them to route B. If B already visits the stop only the dwell moves;
//! otherwise the stop is added to B at its cheapest position (a new route
//! when B is empty). The transfer is the configured amount when A is within
//! the journey limit, else as many passengers as possible, and is always
//! clamped to `[1, min(W - 1, spare capacity of B)]` so A keeps the stop.
//!
//! # Complexity
//!
//! O(1) per evaluation when B visits the stop, O(L) otherwise.

use super::splice::{splice_length, Gap, Piece};
use super::total_cost;
use crate::models::{BusProblem, Solution, SCHOOL};

/// Evaluated multi-stop copy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct CopyPlan {
    pub cost: f64,
    /// Position the stop is added at, `None` if the target already visits it.
    pub insert_at: Option<usize>,
    pub transfer: i32,
}

/// Cheapest position of `v` in the non-empty `route`, and the extra drive
/// time. The first cheapest position wins.
fn cheapest_insertion(problem: &BusProblem, route: &[usize], v: usize) -> (usize, f64) {
    let piece = Piece {
        first: v,
        last: v,
        inner: 0.0,
    };
    let mut best = (0, splice_length(problem, 0.0, Gap::before(route, 0), piece, 0.0));
    for at in 1..=route.len() {
        let extra = splice_length(problem, 0.0, Gap::before(route, at), piece, 0.0);
        if extra < best.1 {
            best = (at, extra);
        }
    }
    best
}

/// Evaluates handing passengers of the stop at `position` of route `from`
/// to route `to`. The stop must carry at least two passengers and `to` must
/// have spare capacity.
pub(crate) fn copy_plan(
    problem: &BusProblem,
    sol: &Solution,
    from: usize,
    position: usize,
    to: usize,
    under_limit_transfer: i32,
) -> CopyPlan {
    let params = problem.params();
    let v = sol.routes[from][position];
    let boarding = sol.boarding[from][position];
    let spare = params.capacity - sol.route_load[to];
    let most = (boarding - 1).min(spare);
    debug_assert!(most >= 1);

    let len_from = sol.route_len[from];
    let len_to = sol.route_len[to];
    let transfer = if len_from < params.max_journey_time {
        under_limit_transfer.clamp(1, most)
    } else {
        most
    };
    let moved_dwell = params.dwell_per_passenger * f64::from(transfer);

    let target = &sol.routes[to];
    let (new_to, insert_at) = if sol.position_of(v, to).is_some() {
        (len_to + moved_dwell, None)
    } else if target.is_empty() {
        (problem.drive_time(v, SCHOOL) + params.dwell_time(transfer), Some(0))
    } else {
        let (at, extra) = cheapest_insertion(problem, target, v);
        (len_to + extra + params.dwell_time(transfer), Some(at))
    };
    let new_from = len_from - moved_dwell;

    CopyPlan {
        cost: total_cost(problem, sol, &[(from, new_from), (to, new_to)]),
        insert_at,
        transfer,
    }
}
