//! Solution state and violation types.

/// A type of inconsistency or constraint violation in a solution.
#[derive(Debug, Clone, PartialEq)]
pub enum ViolationType {
    /// A route visits the school or a stop index that does not exist.
    InvalidStop {
        /// Route index.
        route: usize,
        /// Offending stop index.
        stop: usize,
    },
    /// A route visits the same stop twice.
    DuplicateStop {
        /// Route index.
        route: usize,
        /// Repeated stop.
        stop: usize,
    },
    /// The stop → routes index disagrees with the routes.
    MembershipMismatch {
        /// Stop index.
        stop: usize,
    },
    /// The position index disagrees with the routes.
    PositionMismatch {
        /// Stop index.
        stop: usize,
        /// Route index.
        route: usize,
    },
    /// The shared-stop matrix disagrees with the routes.
    SharedStopMismatch {
        /// First route.
        first: usize,
        /// Second route.
        second: usize,
    },
    /// The outlier flag of a route disagrees with its stops.
    OutlierMismatch {
        /// Route index.
        route: usize,
    },
    /// A stored occurrence carries no passenger.
    NonPositiveBoarding {
        /// Route index.
        route: usize,
        /// Position in the route.
        position: usize,
        /// Stored boarding count.
        count: i32,
    },
    /// A stop's activation flag disagrees with its routes or boarding.
    UsedStopMismatch {
        /// Stop index.
        stop: usize,
    },
    /// A used, non-required stop could be dropped without losing coverage.
    NotMinimal {
        /// Redundant stop.
        stop: usize,
    },
    /// A stored aggregate count is wrong.
    CountMismatch {
        /// Which counter.
        what: &'static str,
        /// Value derived from the routes.
        expected: usize,
        /// Stored value.
        found: usize,
    },
    /// An address does not walk to its nearest used stop.
    AssignmentNotNearest {
        /// Address index.
        address: usize,
        /// Stored stop.
        assigned: usize,
        /// Nearest used stop.
        nearest: usize,
    },
    /// A stored route load or boarding total is wrong.
    LoadMismatch {
        /// Route or stop index, depending on `what`.
        index: usize,
        /// Which quantity.
        what: &'static str,
        /// Value derived from the routes.
        expected: i32,
        /// Stored value.
        found: i32,
    },
    /// Vehicle capacity exceeded.
    CapacityExceeded {
        /// Route index.
        route: usize,
        /// Passengers on board.
        load: i32,
        /// Vehicle capacity.
        capacity: i32,
    },
    /// A stored length or cost differs from its recomputation.
    ValueMismatch {
        /// Which quantity.
        what: &'static str,
        /// Route index, if the value is per route.
        route: Option<usize>,
        /// Recomputed value.
        expected: f64,
        /// Stored value.
        found: f64,
    },
}

/// A consistency or constraint violation in a solution.
#[derive(Debug, Clone, PartialEq)]
pub struct Violation {
    /// The type of violation.
    pub kind: ViolationType,
}

impl Violation {
    /// Creates a new violation.
    pub fn new(kind: ViolationType) -> Self {
        Self { kind }
    }
}

/// A school bus plan for a fixed number of routes.
///
/// The canonical fields are the ordered stop sequence of each route and the
/// parallel per-position boarding counts. Everything else (stop membership,
/// position index, shared-stop matrix, loads, lengths, aggregates, costs) is
/// derived and kept consistent by the builder and by every local search
/// move. The cross-reference structures are dense arenas indexed by stop
/// and route number.
///
/// A stop never appears twice in the same route but may appear in several
/// routes (a *multi-stop*), each occurrence carrying part of its boarding.
///
/// # Examples
///
/// ```
/// use school_bus_routing::models::Solution;
///
/// let sol = Solution::empty(4, 3, 2);
/// assert_eq!(sol.num_routes(), 2);
/// assert_eq!(sol.num_empty_routes(), 2);
/// assert!(sol.route(0).is_empty());
/// assert_eq!(sol.position_of(1, 0), None);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Solution {
    pub(crate) routes: Vec<Vec<usize>>,
    pub(crate) boarding: Vec<Vec<i32>>,
    pub(crate) routes_of_stop: Vec<Vec<usize>>,
    pub(crate) position: Vec<Option<usize>>,
    pub(crate) shares_stop: Vec<bool>,
    pub(crate) stop_used: Vec<bool>,
    pub(crate) assigned_to: Vec<usize>,
    pub(crate) num_boarding: Vec<i32>,
    pub(crate) route_len: Vec<f64>,
    pub(crate) route_load: Vec<i32>,
    pub(crate) has_outlier: Vec<bool>,
    pub(crate) cost: f64,
    pub(crate) walk_cost: f64,
    pub(crate) num_feasible_routes: usize,
    pub(crate) num_empty_routes: usize,
    pub(crate) num_used_stops: usize,
    pub(crate) num_occurrences: usize,
    pub(crate) num_outlier_routes: usize,
}

impl Solution {
    /// Creates a solution with `k` empty routes.
    pub fn empty(num_stops: usize, num_addresses: usize, k: usize) -> Self {
        Self {
            routes: vec![Vec::new(); k],
            boarding: vec![Vec::new(); k],
            routes_of_stop: vec![Vec::new(); num_stops],
            position: vec![None; num_stops * k],
            shares_stop: vec![false; k * k],
            stop_used: vec![false; num_stops],
            assigned_to: vec![0; num_addresses],
            num_boarding: vec![0; num_stops],
            route_len: vec![0.0; k],
            route_load: vec![0; k],
            has_outlier: vec![false; k],
            cost: 0.0,
            walk_cost: 0.0,
            num_feasible_routes: k,
            num_empty_routes: k,
            num_used_stops: 0,
            num_occurrences: 0,
            num_outlier_routes: 0,
        }
    }

    /// Number of routes (buses).
    #[inline]
    pub fn num_routes(&self) -> usize {
        self.routes.len()
    }

    /// Number of stops in the instance, school included.
    pub fn num_stops(&self) -> usize {
        self.stop_used.len()
    }

    /// All route sequences.
    pub fn routes(&self) -> &[Vec<usize>] {
        &self.routes
    }

    /// Stops of route `r` in visiting order.
    #[inline]
    pub fn route(&self, r: usize) -> &[usize] {
        &self.routes[r]
    }

    /// Boarding count at each position of route `r`.
    #[inline]
    pub fn boarding(&self, r: usize) -> &[i32] {
        &self.boarding[r]
    }

    /// Routes that visit stop `s`.
    pub fn routes_of_stop(&self, s: usize) -> &[usize] {
        &self.routes_of_stop[s]
    }

    /// Position of stop `s` in route `r`, if it is visited there.
    #[inline]
    pub fn position_of(&self, s: usize, r: usize) -> Option<usize> {
        self.position[s * self.routes.len() + r]
    }

    #[inline]
    pub(crate) fn set_position(&mut self, s: usize, r: usize, pos: Option<usize>) {
        let k = self.routes.len();
        self.position[s * k + r] = pos;
    }

    /// Returns `true` if routes `a` and `b` (distinct) visit a common stop.
    #[inline]
    pub fn shares_stop(&self, a: usize, b: usize) -> bool {
        self.shares_stop[a * self.routes.len() + b]
    }

    pub(crate) fn set_shares_stop(&mut self, a: usize, b: usize, value: bool) {
        let k = self.routes.len();
        self.shares_stop[a * k + b] = value;
        self.shares_stop[b * k + a] = value;
    }

    /// Returns `true` if stop `s` is activated (served by at least one route).
    #[inline]
    pub fn is_stop_used(&self, s: usize) -> bool {
        self.stop_used[s]
    }

    /// Activation flag of every stop.
    pub fn stop_activation(&self) -> &[bool] {
        &self.stop_used
    }

    /// Stop that address `a` walks to.
    #[inline]
    pub fn assigned_stop(&self, a: usize) -> usize {
        self.assigned_to[a]
    }

    /// Total number boarding at stop `s` across all its occurrences.
    #[inline]
    pub fn num_boarding(&self, s: usize) -> i32 {
        self.num_boarding[s]
    }

    /// Length of route `r` in seconds (driving plus dwell).
    #[inline]
    pub fn route_length(&self, r: usize) -> f64 {
        self.route_len[r]
    }

    /// Number of passengers on route `r`.
    #[inline]
    pub fn route_load(&self, r: usize) -> i32 {
        self.route_load[r]
    }

    /// Returns `true` if route `r` visits an outlier stop.
    pub fn route_has_outlier(&self, r: usize) -> bool {
        self.has_outlier[r]
    }

    /// Sum of the penalized route costs.
    #[inline]
    pub fn cost(&self) -> f64 {
        self.cost
    }

    /// Σ passengers × walking time to the assigned stop.
    #[inline]
    pub fn walk_cost(&self) -> f64 {
        self.walk_cost
    }

    /// Routes within the journey limit (or exempt through an outlier stop).
    pub fn num_feasible_routes(&self) -> usize {
        self.num_feasible_routes
    }

    /// Routes with no stop.
    pub fn num_empty_routes(&self) -> usize {
        self.num_empty_routes
    }

    /// Distinct activated stops.
    pub fn num_used_stops(&self) -> usize {
        self.num_used_stops
    }

    /// Total stop occurrences across all routes.
    pub fn num_occurrences(&self) -> usize {
        self.num_occurrences
    }

    /// Routes visiting at least one outlier stop.
    pub fn num_outlier_routes(&self) -> usize {
        self.num_outlier_routes
    }

    /// Returns `true` when every route is feasible.
    pub fn is_feasible(&self) -> bool {
        self.num_feasible_routes == self.routes.len()
    }

    /// Stops served by exactly one route.
    pub fn num_singleton_stops(&self) -> usize {
        self.routes_of_stop.iter().filter(|rs| rs.len() == 1).count()
    }

    /// Stops served by more than one route.
    pub fn num_multi_stops(&self) -> usize {
        self.routes_of_stop.iter().filter(|rs| rs.len() > 1).count()
    }

    /// Mean walking time per passenger in seconds.
    pub fn average_walk_time(&self) -> f64 {
        let passengers: i32 = self.num_boarding.iter().sum();
        if passengers == 0 {
            return 0.0;
        }
        self.walk_cost / f64::from(passengers)
    }

    /// Mean route length in seconds.
    pub fn average_route_length(&self) -> f64 {
        if self.routes.is_empty() {
            return 0.0;
        }
        self.route_len.iter().sum::<f64>() / self.routes.len() as f64
    }

    /// Cost per route, the first archive objective.
    pub fn cost_per_route(&self) -> f64 {
        if self.routes.is_empty() {
            return 0.0;
        }
        self.cost / self.routes.len() as f64
    }

    /// Drops every occurrence whose boarding count reached zero.
    pub(crate) fn prune_empty_occurrences(&mut self) {
        for (stops, counts) in self.routes.iter_mut().zip(self.boarding.iter_mut()) {
            let mut keep = counts.iter().map(|&w| w != 0);
            stops.retain(|_| keep.next().unwrap_or(true));
            counts.retain(|&w| w != 0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_route_solution() -> Solution {
        let mut sol = Solution::empty(5, 0, 2);
        sol.routes = vec![vec![1, 2, 3], vec![3, 4]];
        sol.boarding = vec![vec![2, 0, 1], vec![4, 0]];
        sol.route_load = vec![3, 4];
        sol.route_len = vec![100.0, 50.0];
        sol.routes_of_stop[1] = vec![0];
        sol.routes_of_stop[3] = vec![0, 1];
        sol.routes_of_stop[4] = vec![1];
        sol
    }

    #[test]
    fn test_empty_solution() {
        let sol = Solution::empty(3, 2, 4);
        assert_eq!(sol.num_routes(), 4);
        assert_eq!(sol.num_stops(), 3);
        assert_eq!(sol.num_feasible_routes(), 4);
        assert!(sol.is_feasible());
        assert_eq!(sol.cost(), 0.0);
        assert_eq!(sol.average_walk_time(), 0.0);
    }

    #[test]
    fn test_position_and_shares() {
        let mut sol = Solution::empty(4, 0, 3);
        sol.set_position(2, 1, Some(5));
        assert_eq!(sol.position_of(2, 1), Some(5));
        assert_eq!(sol.position_of(2, 0), None);
        sol.set_shares_stop(0, 2, true);
        assert!(sol.shares_stop(2, 0));
        assert!(!sol.shares_stop(0, 1));
    }

    #[test]
    fn test_prune_empty_occurrences() {
        let mut sol = two_route_solution();
        sol.prune_empty_occurrences();
        assert_eq!(sol.route(0), &[1, 3]);
        assert_eq!(sol.boarding(0), &[2, 1]);
        assert_eq!(sol.route(1), &[3]);
        assert_eq!(sol.boarding(1), &[4]);
    }

    #[test]
    fn test_stop_counts() {
        let sol = two_route_solution();
        assert_eq!(sol.num_singleton_stops(), 2);
        assert_eq!(sol.num_multi_stops(), 1);
        assert!((sol.average_route_length() - 75.0).abs() < 1e-10);
    }
}
