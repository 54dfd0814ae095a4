//! Passenger-to-bus assignment by first-fit decreasing with splitting.
//!
//! # Algorithm
//!
//! Items are (stop, passengers) pairs; bins are routes with a common
//! capacity. The heaviest remaining item goes to the first route with
//! enough spare capacity that already visits the stop (its count is merged
//! into that occurrence), or else to the first route with enough spare
//! capacity (a new occurrence is appended). When no route can take the whole
//! item, the emptiest route (preferring one that already visits the stop) is
//! filled to capacity and the residual stays in the worklist.
//!
//! Loads never exceed capacity, and the loop terminates because the total
//! residual weight strictly decreases.
//!
//! # Complexity
//!
//! O(I · k · L) where I = items, k = routes and L = the longest route.
//!
//! # Reference
//!
//! Johnson, D.S. (1973). "Near-Optimal Bin Packing Algorithms", PhD thesis, MIT.

use crate::error::RoutingError;
use crate::models::Solution;

/// Where an item (or part of it) goes.
struct Placement {
    route: usize,
    position: Option<usize>,
}

/// First route with room for `weight` that visits `stop`, else the first
/// route with room.
fn choose_fitting(sol: &Solution, capacity: i32, stop: usize, weight: i32) -> Option<Placement> {
    let mut fallback = None;
    for r in 0..sol.routes.len() {
        if sol.route_load[r] + weight > capacity {
            continue;
        }
        if let Some(p) = sol.routes[r].iter().position(|&s| s == stop) {
            return Some(Placement {
                route: r,
                position: Some(p),
            });
        }
        if fallback.is_none() {
            fallback = Some(Placement {
                route: r,
                position: None,
            });
        }
    }
    fallback
}

/// Emptiest non-full route that visits `stop`, else the emptiest non-full route.
fn choose_emptiest(sol: &Solution, capacity: i32, stop: usize) -> Option<Placement> {
    let mut with_stop: Option<Placement> = None;
    let mut without: Option<usize> = None;
    let mut min_with = capacity;
    let mut min_without = capacity;
    for r in 0..sol.routes.len() {
        let load = sol.route_load[r];
        match sol.routes[r].iter().position(|&s| s == stop) {
            Some(p) if load < min_with => {
                min_with = load;
                with_stop = Some(Placement {
                    route: r,
                    position: Some(p),
                });
            }
            None if load < min_without => {
                min_without = load;
                without = Some(r);
            }
            _ => {}
        }
    }
    with_stop.or(without.map(|route| Placement {
        route,
        position: None,
    }))
}

fn place(sol: &mut Solution, at: &Placement, stop: usize, weight: i32) {
    match at.position {
        Some(p) => sol.boarding[at.route][p] += weight,
        None => {
            sol.routes[at.route].push(stop);
            sol.boarding[at.route].push(weight);
        }
    }
    sol.route_load[at.route] += weight;
}

/// Packs one item, splitting it over several routes when no single route
/// has room for all of it.
fn pack_item(
    sol: &mut Solution,
    capacity: i32,
    stop: usize,
    mut weight: i32,
) -> Result<Option<i32>, RoutingError> {
    if let Some(at) = choose_fitting(sol, capacity, stop, weight) {
        place(sol, &at, stop, weight);
        return Ok(None);
    }
    let at = choose_emptiest(sol, capacity, stop).ok_or_else(|| {
        RoutingError::invariant(format!(
            "no spare capacity left for {weight} passengers at stop {stop}"
        ))
    })?;
    let spare = capacity - sol.route_load[at.route];
    place(sol, &at, stop, spare);
    weight -= spare;
    Ok(Some(weight))
}

/// Packs every `(stop, passengers)` item into the routes of `sol`.
///
/// Only the canonical routes, boarding counts and route loads are updated;
/// the caller recomputes the derived fields afterwards. Items with no
/// passengers are skipped.
///
/// # Errors
///
/// Returns [`RoutingError::Invariant`] when the items do not fit in the
/// total spare capacity.
///
/// # Examples
///
/// ```
/// use school_bus_routing::constructive::pack;
/// use school_bus_routing::models::Solution;
///
/// let mut sol = Solution::empty(3, 0, 2);
/// pack(&mut sol, 5, vec![(1, 6), (2, 3)]).expect("valid");
/// assert_eq!(sol.route(0), &[1]);
/// assert_eq!(sol.boarding(0), &[5]);
/// assert_eq!(sol.route(1), &[2, 1]);
/// assert_eq!(sol.boarding(1), &[3, 1]);
/// ```
pub fn pack(
    sol: &mut Solution,
    capacity: i32,
    mut items: Vec<(usize, i32)>,
) -> Result<(), RoutingError> {
    items.retain(|&(_, w)| w > 0);
    while !items.is_empty() {
        let mut largest = 0;
        for i in 1..items.len() {
            if items[i].1 > items[largest].1 {
                largest = i;
            }
        }
        let (stop, weight) = items[largest];
        match pack_item(sol, capacity, stop, weight)? {
            None => {
                items.swap_remove(largest);
            }
            Some(residual) => items[largest].1 = residual,
        }
    }
    Ok(())
}

/// Packs a single `(stop, passengers)` item.
///
/// # Errors
///
/// Returns [`RoutingError::Invariant`] when the passengers do not fit in the
/// total spare capacity.
pub fn pack_one(
    sol: &mut Solution,
    capacity: i32,
    stop: usize,
    mut weight: i32,
) -> Result<(), RoutingError> {
    while weight > 0 {
        match pack_item(sol, capacity, stop, weight)? {
            None => return Ok(()),
            Some(residual) => weight = residual,
        }
    }
    Ok(())
}
