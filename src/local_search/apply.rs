//! Applying a chosen move and bringing the derived indices up to date.

use super::Move;
use crate::evaluation::RouteEvaluator;
use crate::models::{BusProblem, Solution};

/// New stop sequence and boarding counts of one route.
struct RouteChange {
    route: usize,
    stops: Vec<usize>,
    boarding: Vec<i32>,
}

/// Stops and counts of `[start, end)` of route `r`, optionally reversed.
fn section_of(sol: &Solution, r: usize, start: usize, end: usize, reversed: bool) -> (Vec<usize>, Vec<i32>) {
    let mut stops = sol.routes[r][start..end].to_vec();
    let mut counts = sol.boarding[r][start..end].to_vec();
    if reversed {
        stops.reverse();
        counts.reverse();
    }
    (stops, counts)
}

/// Merges the stops of a moving section that `target` already visits
/// outside `window` into `target_counts`, returning the stops still to be
/// spliced in.
fn merge_into(
    sol: &Solution,
    target: usize,
    target_counts: &mut [i32],
    window: (usize, usize),
    stops: Vec<usize>,
    counts: Vec<i32>,
) -> (Vec<usize>, Vec<i32>) {
    let mut kept = (Vec::with_capacity(stops.len()), Vec::with_capacity(counts.len()));
    for (s, w) in stops.into_iter().zip(counts) {
        match sol.position_of(s, target) {
            Some(p) if p < window.0 || p >= window.1 => target_counts[p] += w,
            _ => {
                kept.0.push(s);
                kept.1.push(w);
            }
        }
    }
    kept
}

/// `route[..start] + piece + route[end..]`, with matching counts.
fn splice_route(
    route: &[usize],
    counts: &[i32],
    start: usize,
    end: usize,
    piece: (Vec<usize>, Vec<i32>),
) -> (Vec<usize>, Vec<i32>) {
    let mut stops = route[..start].to_vec();
    stops.extend(piece.0);
    stops.extend_from_slice(&route[end..]);
    let mut w = counts[..start].to_vec();
    w.extend(piece.1);
    w.extend_from_slice(&counts[end..]);
    (stops, w)
}

fn change(route: usize, (stops, boarding): (Vec<usize>, Vec<i32>)) -> RouteChange {
    RouteChange {
        route,
        stops,
        boarding,
    }
}

/// Applies `mv` to `sol`.
pub(crate) fn apply_move(problem: &BusProblem, sol: &mut Solution, mv: &Move) {
    let changes = match *mv {
        Move::ToEmpty {
            from,
            start,
            end,
            to,
            reversed,
        } => {
            let piece = section_of(sol, from, start, end, reversed);
            let rest = splice_route(&sol.routes[from], &sol.boarding[from], start, end, Default::default());
            vec![change(from, rest), change(to, piece)]
        }
        Move::Insert {
            from,
            start,
            end,
            to,
            at,
            reversed,
        } => {
            let (stops, counts) = section_of(sol, from, start, end, reversed);
            let mut to_counts = sol.boarding[to].clone();
            let kept = merge_into(sol, to, &mut to_counts, (at, at), stops, counts);
            let new_to = splice_route(&sol.routes[to], &to_counts, at, at, kept);
            let new_from = splice_route(&sol.routes[from], &sol.boarding[from], start, end, Default::default());
            vec![change(from, new_from), change(to, new_to)]
        }
        Move::SwapSections {
            from,
            start,
            end,
            to,
            to_start,
            to_end,
            reversed_from,
            reversed_to,
        } => {
            let (a_stops, a_counts) = section_of(sol, from, start, end, reversed_from);
            let (b_stops, b_counts) = section_of(sol, to, to_start, to_end, reversed_to);
            let mut from_counts = sol.boarding[from].clone();
            let mut to_counts = sol.boarding[to].clone();
            let a_kept = merge_into(sol, to, &mut to_counts, (to_start, to_end), a_stops, a_counts);
            let b_kept = merge_into(sol, from, &mut from_counts, (start, end), b_stops, b_counts);
            let new_to = splice_route(&sol.routes[to], &to_counts, to_start, to_end, a_kept);
            let new_from = splice_route(&sol.routes[from], &from_counts, start, end, b_kept);
            vec![change(from, new_from), change(to, new_to)]
        }
        Move::SwapStops {
            route,
            first,
            second,
        } => {
            let mut stops = sol.routes[route].clone();
            let mut counts = sol.boarding[route].clone();
            stops.swap(first, second);
            counts.swap(first, second);
            vec![change(route, (stops, counts))]
        }
        Move::Reverse { route, first, last } => {
            let mut stops = sol.routes[route].clone();
            let mut counts = sol.boarding[route].clone();
            stops[first..=last].reverse();
            counts[first..=last].reverse();
            vec![change(route, (stops, counts))]
        }
        Move::OrOpt {
            route,
            first,
            last,
            before,
            reversed,
        } => {
            let (piece, piece_counts) = section_of(sol, route, first, last + 1, reversed);
            let mut stops = sol.routes[route].clone();
            let mut counts = sol.boarding[route].clone();
            stops.drain(first..=last);
            counts.drain(first..=last);
            let at = if before < first {
                before
            } else {
                before - piece.len()
            };
            stops.splice(at..at, piece);
            counts.splice(at..at, piece_counts);
            vec![change(route, (stops, counts))]
        }
        Move::CopyStop {
            from,
            position,
            to,
            insert_at,
            transfer,
        } => {
            let v = sol.routes[from][position];
            let mut from_counts = sol.boarding[from].clone();
            from_counts[position] -= transfer;
            let mut to_stops = sol.routes[to].clone();
            let mut to_counts = sol.boarding[to].clone();
            match (insert_at, sol.position_of(v, to)) {
                (_, Some(p)) => to_counts[p] += transfer,
                (Some(at), None) => {
                    to_stops.insert(at, v);
                    to_counts.insert(at, transfer);
                }
                (None, None) => {
                    to_stops.push(v);
                    to_counts.push(transfer);
                }
            }
            vec![
                change(from, (sol.routes[from].clone(), from_counts)),
                change(to, (to_stops, to_counts)),
            ]
        }
    };
    replace_routes(problem, sol, changes);
}

/// Withdraws route `r` from the indices and aggregate counters.
fn detach(problem: &BusProblem, sol: &mut Solution, r: usize, touched: &mut Vec<usize>) {
    let params = problem.params();
    for p in 0..sol.routes[r].len() {
        let s = sol.routes[r][p];
        sol.set_position(s, r, None);
        if let Some(i) = sol.routes_of_stop[s].iter().position(|&q| q == r) {
            sol.routes_of_stop[s].swap_remove(i);
        }
        sol.num_boarding[s] -= sol.boarding[r][p];
        touched.push(s);
    }
    let len = sol.route_len[r];
    sol.cost -= params.route_cost(len);
    if params.is_route_feasible(len, sol.has_outlier[r]) {
        sol.num_feasible_routes -= 1;
    }
    if sol.has_outlier[r] {
        sol.num_outlier_routes -= 1;
    }
    if sol.routes[r].is_empty() {
        sol.num_empty_routes -= 1;
    }
    sol.num_occurrences -= sol.routes[r].len();
}

/// Installs a new sequence for a detached route and registers it.
fn attach(problem: &BusProblem, sol: &mut Solution, c: RouteChange, touched: &mut Vec<usize>) {
    let params = problem.params();
    let r = c.route;
    for (p, &s) in c.stops.iter().enumerate() {
        sol.set_position(s, r, Some(p));
        sol.routes_of_stop[s].push(r);
        sol.num_boarding[s] += c.boarding[p];
        touched.push(s);
    }
    let len = RouteEvaluator::new(problem).route_length(&c.stops, &c.boarding);
    let outlier = c.stops.iter().any(|&s| problem.is_outlier(s));
    sol.route_len[r] = len;
    sol.route_load[r] = c.boarding.iter().sum();
    sol.has_outlier[r] = outlier;
    sol.cost += params.route_cost(len);
    if params.is_route_feasible(len, outlier) {
        sol.num_feasible_routes += 1;
    }
    if outlier {
        sol.num_outlier_routes += 1;
    }
    if c.stops.is_empty() {
        sol.num_empty_routes += 1;
    }
    sol.num_occurrences += c.stops.len();
    sol.routes[r] = c.stops;
    sol.boarding[r] = c.boarding;
}

/// Replaces whole routes and incrementally refreshes memberships,
/// positions, shared-stop flags, lengths, loads, stop activation and the
/// aggregate counters. Each new route length is recomputed from scratch.
fn replace_routes(problem: &BusProblem, sol: &mut Solution, changes: Vec<RouteChange>) {
    let mut touched = Vec::new();
    let routes: Vec<usize> = changes.iter().map(|c| c.route).collect();
    for &r in &routes {
        detach(problem, sol, r, &mut touched);
    }
    for c in changes {
        attach(problem, sol, c, &mut touched);
    }

    let k = sol.routes.len();
    for &r in &routes {
        for q in (0..k).filter(|&q| q != r) {
            let shared = sol.routes[r].iter().any(|&s| sol.position_of(s, q).is_some());
            sol.set_shares_stop(r, q, shared);
        }
    }

    touched.sort_unstable();
    touched.dedup();
    for s in touched {
        let used = sol.num_boarding[s] > 0;
        if used != sol.stop_used[s] {
            sol.stop_used[s] = used;
            if used {
                sol.num_used_stops += 1;
            } else {
                sol.num_used_stops -= 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RouteParams;
    use crate::evaluation::validate;
    use crate::test_support::line_problem;

    fn solution(problem: &BusProblem, routes: Vec<Vec<usize>>, boarding: Vec<Vec<i32>>) -> Solution {
        let mut sol = Solution::empty(problem.num_stops(), problem.num_addresses(), routes.len());
        sol.routes = routes;
        sol.boarding = boarding;
        RouteEvaluator::new(problem).recompute(&mut sol);
        sol
    }

    fn assert_consistent(problem: &BusProblem, sol: &Solution) {
        let violations = validate(problem, sol, false);
        assert!(violations.is_empty(), "{violations:?}");
    }

    #[test]
    fn test_apply_insert_with_merge() {
        let problem = line_problem(4, RouteParams::default());
        let mut sol = solution(&problem, vec![vec![1, 2], vec![3, 2, 4]], vec![vec![2, 1], vec![2, 1, 2]]);
        let mv = Move::Insert {
            from: 1,
            start: 0,
            end: 2,
            to: 0,
            at: 0,
            reversed: false,
        };
        apply_move(&problem, &mut sol, &mv);
        assert_eq!(sol.route(0), &[3, 1, 2]);
        assert_eq!(sol.boarding(0), &[2, 2, 2]);
        assert_eq!(sol.route(1), &[4]);
        assert!(!sol.shares_stop(0, 1));
        assert_consistent(&problem, &sol);
    }

    #[test]
    fn test_apply_swap_sections() {
        let problem = line_problem(5, RouteParams::default());
        let mut sol = solution(&problem, vec![vec![1, 2, 3], vec![4, 5]], vec![vec![2, 2, 2], vec![2, 2]]);
        let mv = Move::SwapSections {
            from: 0,
            start: 1,
            end: 3,
            to: 1,
            to_start: 0,
            to_end: 1,
            reversed_from: true,
            reversed_to: false,
        };
        apply_move(&problem, &mut sol, &mv);
        assert_eq!(sol.route(0), &[1, 4]);
        assert_eq!(sol.route(1), &[3, 2, 5]);
        assert_consistent(&problem, &sol);
    }

    #[test]
    fn test_apply_to_empty_and_or_opt() {
        let problem = line_problem(5, RouteParams::default());
        let mut sol = solution(&problem, vec![vec![1, 2, 3, 4, 5], vec![]], vec![vec![2; 5], vec![]]);
        apply_move(
            &problem,
            &mut sol,
            &Move::ToEmpty {
                from: 0,
                start: 3,
                end: 5,
                to: 1,
                reversed: true,
            },
        );
        assert_eq!(sol.route(1), &[5, 4]);
        assert_eq!(sol.num_empty_routes(), 0);
        apply_move(
            &problem,
            &mut sol,
            &Move::OrOpt {
                route: 0,
                first: 0,
                last: 0,
                before: 3,
                reversed: false,
            },
        );
        assert_eq!(sol.route(0), &[2, 3, 1]);
        assert_consistent(&problem, &sol);
    }

    #[test]
    fn test_apply_copy_stop() {
        let problem = line_problem(3, RouteParams::default());
        let mut sol = solution(&problem, vec![vec![2, 1], vec![3]], vec![vec![2, 2], vec![2]]);
        apply_move(
            &problem,
            &mut sol,
            &Move::CopyStop {
                from: 0,
                position: 0,
                to: 1,
                insert_at: Some(0),
                transfer: 1,
            },
        );
        assert_eq!(sol.route(1), &[2, 3]);
        assert_eq!(sol.boarding(0), &[1, 2]);
        assert_eq!(sol.boarding(1), &[1, 2]);
        assert!(sol.shares_stop(0, 1));
        assert_eq!(sol.routes_of_stop(2).len(), 2);
        assert_consistent(&problem, &sol);
    }

    #[test]
    fn test_apply_reverse_and_swap() {
        let problem = line_problem(4, RouteParams::default());
        let mut sol = solution(&problem, vec![vec![1, 2, 3, 4]], vec![vec![2; 4]]);
        apply_move(&problem, &mut sol, &Move::Reverse { route: 0, first: 1, last: 3 });
        assert_eq!(sol.route(0), &[1, 4, 3, 2]);
        apply_move(
            &problem,
            &mut sol,
            &Move::SwapStops {
                route: 0,
                first: 0,
                second: 3,
            },
        );
        assert_eq!(sol.route(0), &[2, 4, 3, 1]);
        assert_consistent(&problem, &sol);
    }
}
