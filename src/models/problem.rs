//! Problem instance: input record and the validated, read-only instance.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::{Address, Stop};
use crate::config::RouteParams;
use crate::distance::DistanceMatrix;
use crate::error::RoutingError;

/// Index of the school among the stops. Every route ends there.
pub const SCHOOL: usize = 0;

/// Unit of the distances in the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DistanceUnit {
    /// Kilometres.
    Kilometres,
    /// Miles.
    Miles,
}

impl DistanceUnit {
    /// Short name used in reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            DistanceUnit::Kilometres => "kms",
            DistanceUnit::Miles => "miles",
        }
    }
}

/// Walking distance and time from one address to one stop.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WalkLink {
    /// Address index.
    pub address: usize,
    /// Stop index.
    pub stop: usize,
    /// Walking distance.
    pub distance: f64,
    /// Walking time in seconds.
    pub time: f64,
}

/// Raw instance data as handed over by an input loader.
///
/// Stop 0 must be the school. Walk links that are not listed are treated as
/// unreachable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProblemInput {
    /// School (index 0) followed by the candidate stops.
    pub stops: Vec<Stop>,
    /// Pick-up addresses.
    pub addresses: Vec<Address>,
    /// Unit of every distance value.
    pub distance_unit: DistanceUnit,
    /// Minimum home-to-school distance for transport eligibility (informational).
    pub min_eligibility_distance: f64,
    /// Maximum distance a passenger may walk to a stop.
    pub max_walk_distance: f64,
    /// Stop × stop driving distances.
    pub drive_distance: DistanceMatrix,
    /// Stop × stop driving times in seconds.
    pub drive_time: DistanceMatrix,
    /// Sparse address × stop walking distances and times.
    pub walks: Vec<WalkLink>,
}

/// A validated, read-only school bus routing instance.
///
/// Construction derives the walking adjacency (per address and per stop,
/// ascending by walking time), the `required` and `outlier` stop flags and
/// the total passenger count. Nothing here changes during optimization;
/// every component takes the instance by shared reference.
///
/// # Examples
///
/// ```
/// use school_bus_routing::config::RouteParams;
/// use school_bus_routing::distance::DistanceMatrix;
/// use school_bus_routing::models::{Address, BusProblem, DistanceUnit, ProblemInput, Stop, WalkLink};
///
/// let drive = DistanceMatrix::from_data(3, 3, vec![
///     0.0, 100.0, 120.0,
///     100.0, 0.0, 50.0,
///     120.0, 50.0, 0.0,
/// ]).expect("valid");
/// let input = ProblemInput {
///     stops: vec![Stop::new(0.0, 0.0, "School"), Stop::new(1.0, 0.0, "A"), Stop::new(2.0, 0.0, "B")],
///     addresses: vec![Address::new(1.0, 0.1, 2, "x"), Address::new(2.0, 0.1, 3, "y")],
///     distance_unit: DistanceUnit::Kilometres,
///     min_eligibility_distance: 0.0,
///     max_walk_distance: 0.5,
///     drive_distance: drive.clone(),
///     drive_time: drive,
///     walks: vec![
///         WalkLink { address: 0, stop: 1, distance: 0.1, time: 60.0 },
///         WalkLink { address: 1, stop: 2, distance: 0.1, time: 60.0 },
///         WalkLink { address: 1, stop: 1, distance: 0.4, time: 240.0 },
///     ],
/// };
/// let problem = BusProblem::new(input, RouteParams::default()).expect("valid");
/// assert_eq!(problem.total_passengers(), 5);
/// assert!(problem.is_required(1));
/// assert!(!problem.is_required(2));
/// assert_eq!(problem.stops_near(1), &[2, 1]);
/// assert_eq!(problem.lower_bound_fleet(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct BusProblem {
    stops: Vec<Stop>,
    addresses: Vec<Address>,
    distance_unit: DistanceUnit,
    min_eligibility_distance: f64,
    max_walk_distance: f64,
    drive_distance: DistanceMatrix,
    drive_time: DistanceMatrix,
    walk_distance: DistanceMatrix,
    walk_time: DistanceMatrix,
    reachable: Vec<bool>,
    address_stops: Vec<Vec<usize>>,
    stop_addresses: Vec<Vec<usize>>,
    required: Vec<bool>,
    outlier: Vec<bool>,
    total_passengers: i32,
    params: RouteParams,
}

impl BusProblem {
    /// Validates the input and derives adjacency, required and outlier flags.
    ///
    /// # Errors
    ///
    /// Returns an invalid-input error when the matrices have the wrong shape,
    /// a walk link refers to a missing stop or address, a passenger count is
    /// negative, or an address has no stop within walking distance.
    pub fn new(input: ProblemInput, params: RouteParams) -> Result<Self, RoutingError> {
        params.validate()?;
        let n = input.stops.len();
        let m = input.addresses.len();
        if n < 2 {
            return Err(RoutingError::parameter(
                "stops",
                "need the school and at least one candidate stop",
            ));
        }
        for (what, matrix) in [
            ("drive time matrix", &input.drive_time),
            ("drive distance matrix", &input.drive_distance),
        ] {
            if matrix.rows() != n || matrix.cols() != n {
                return Err(RoutingError::DimensionMismatch {
                    what,
                    expected: n * n,
                    found: matrix.rows() * matrix.cols(),
                });
            }
        }
        if !input.drive_time.is_well_formed() {
            return Err(RoutingError::parameter(
                "drive_time",
                "entries must be non-negative numbers",
            ));
        }
        if !(input.max_walk_distance >= 0.0) {
            return Err(RoutingError::parameter(
                "max_walk_distance",
                "must be non-negative",
            ));
        }
        if let Some(a) = input.addresses.iter().position(|a| a.passengers() < 0) {
            return Err(RoutingError::parameter(
                "passengers",
                format!("address {a} has a negative passenger count"),
            ));
        }

        let mut walk_time = DistanceMatrix::filled(m, n, f64::INFINITY);
        let mut walk_distance = DistanceMatrix::filled(m, n, f64::INFINITY);
        for link in &input.walks {
            if link.address >= m {
                return Err(RoutingError::IndexOutOfRange {
                    what: "walk link address",
                    index: link.address,
                    len: m,
                });
            }
            if link.stop >= n {
                return Err(RoutingError::IndexOutOfRange {
                    what: "walk link stop",
                    index: link.stop,
                    len: n,
                });
            }
            walk_time.set(link.address, link.stop, link.time);
            walk_distance.set(link.address, link.stop, link.distance);
        }

        let mut reachable = vec![false; m * n];
        let mut address_stops = vec![Vec::new(); m];
        let mut stop_addresses = vec![Vec::new(); n];
        for a in 0..m {
            for s in 1..n {
                if walk_distance.get(a, s) <= input.max_walk_distance {
                    reachable[a * n + s] = true;
                    address_stops[a].push(s);
                    stop_addresses[s].push(a);
                }
            }
        }

        let mut required = vec![false; n];
        for (a, near) in address_stops.iter_mut().enumerate() {
            if near.is_empty() {
                return Err(RoutingError::UnreachableAddress {
                    address: a,
                    label: input.addresses[a].label().to_string(),
                });
            }
            near.sort_by(|&s, &t| walk_time.get(a, s).total_cmp(&walk_time.get(a, t)));
            if near.len() == 1 {
                required[near[0]] = true;
            }
        }
        for (s, near) in stop_addresses.iter_mut().enumerate().skip(1) {
            if near.is_empty() {
                warn!(
                    stop = s,
                    label = input.stops[s].label(),
                    "stop is isolated: no address within walking distance"
                );
            }
            near.sort_by(|&a, &b| walk_time.get(a, s).total_cmp(&walk_time.get(b, s)));
        }

        let total_passengers = input.addresses.iter().map(Address::passengers).sum();

        let mut problem = Self {
            stops: input.stops,
            addresses: input.addresses,
            distance_unit: input.distance_unit,
            min_eligibility_distance: input.min_eligibility_distance,
            max_walk_distance: input.max_walk_distance,
            drive_distance: input.drive_distance,
            drive_time: input.drive_time,
            walk_distance,
            walk_time,
            reachable,
            address_stops,
            stop_addresses,
            required,
            outlier: vec![false; n],
            total_passengers,
            params,
        };
        problem.outlier = problem.find_outliers();
        Ok(problem)
    }

    /// A stop is an outlier when the drive to the school alone exceeds the
    /// journey limit, or when it is required and the drive plus the dwell of
    /// the passengers who have no closer stop exceeds it.
    fn find_outliers(&self) -> Vec<bool> {
        let max = self.params.max_journey_time;
        let mut outlier = vec![false; self.stops.len()];
        for s in 1..self.stops.len() {
            let to_school = self.drive_time(s, SCHOOL);
            if to_school > max {
                outlier[s] = true;
                info!(
                    stop = s,
                    label = self.stops[s].label(),
                    minutes = (to_school / 60.0).ceil(),
                    "outlier stop: too far from the school"
                );
            } else if self.required[s] {
                let forced: i32 = self
                    .address_stops
                    .iter()
                    .enumerate()
                    .filter(|(_, near)| near[0] == s)
                    .map(|(a, _)| self.addresses[a].passengers())
                    .sum();
                if to_school + self.params.dwell_time(forced) > max {
                    outlier[s] = true;
                    info!(
                        stop = s,
                        label = self.stops[s].label(),
                        minutes = (to_school / 60.0).ceil(),
                        boarding = forced,
                        "outlier stop: required and too far once its passengers board"
                    );
                }
            }
        }
        outlier
    }

    /// Route parameters this instance was built with.
    pub fn params(&self) -> &RouteParams {
        &self.params
    }

    /// All stops, school first.
    pub fn stops(&self) -> &[Stop] {
        &self.stops
    }

    /// All addresses.
    pub fn addresses(&self) -> &[Address] {
        &self.addresses
    }

    /// Number of stops including the school.
    pub fn num_stops(&self) -> usize {
        self.stops.len()
    }

    /// Number of addresses.
    pub fn num_addresses(&self) -> usize {
        self.addresses.len()
    }

    /// Passenger count of address `a`.
    #[inline]
    pub fn passengers(&self, a: usize) -> i32 {
        self.addresses[a].passengers()
    }

    /// Driving time from stop `from` to stop `to`.
    #[inline]
    pub fn drive_time(&self, from: usize, to: usize) -> f64 {
        self.drive_time.get(from, to)
    }

    /// Driving distance from stop `from` to stop `to`.
    pub fn drive_distance(&self, from: usize, to: usize) -> f64 {
        self.drive_distance.get(from, to)
    }

    /// Walking time from address `a` to stop `s` (`+∞` if not listed).
    #[inline]
    pub fn walk_time(&self, a: usize, s: usize) -> f64 {
        self.walk_time.get(a, s)
    }

    /// Walking distance from address `a` to stop `s` (`+∞` if not listed).
    pub fn walk_distance(&self, a: usize, s: usize) -> f64 {
        self.walk_distance.get(a, s)
    }

    /// Stops within walking distance of address `a`, nearest first.
    #[inline]
    pub fn stops_near(&self, a: usize) -> &[usize] {
        &self.address_stops[a]
    }

    /// Addresses within walking distance of stop `s`, nearest first.
    #[inline]
    pub fn addresses_near(&self, s: usize) -> &[usize] {
        &self.stop_addresses[s]
    }

    /// Returns `true` if stop `s` is within walking distance of address `a`.
    pub fn is_reachable(&self, a: usize, s: usize) -> bool {
        self.reachable[a * self.stops.len() + s]
    }

    /// Returns `true` if `s` is the only stop within reach of some address.
    #[inline]
    pub fn is_required(&self, s: usize) -> bool {
        self.required[s]
    }

    /// Returns `true` if routes through `s` are exempt from the journey limit.
    #[inline]
    pub fn is_outlier(&self, s: usize) -> bool {
        self.outlier[s]
    }

    /// Total number of passengers.
    pub fn total_passengers(&self) -> i32 {
        self.total_passengers
    }

    /// Fewest buses that can carry everyone: ⌈passengers / capacity⌉, at least one.
    pub fn lower_bound_fleet(&self) -> usize {
        let cap = self.params.capacity;
        let k = (self.total_passengers + cap - 1) / cap;
        usize::try_from(k).unwrap_or(0).max(1)
    }

    /// Unit of the distances in this instance.
    pub fn distance_unit(&self) -> DistanceUnit {
        self.distance_unit
    }

    /// Maximum walking distance.
    pub fn max_walk_distance(&self) -> f64 {
        self.max_walk_distance
    }

    /// Minimum eligibility distance.
    pub fn min_eligibility_distance(&self) -> f64 {
        self.min_eligibility_distance
    }

    /// Mean number of reachable stops per address.
    pub fn stops_per_address(&self) -> f64 {
        if self.addresses.is_empty() {
            return 0.0;
        }
        let total: usize = self.address_stops.iter().map(Vec::len).sum();
        total as f64 / self.addresses.len() as f64
    }

    /// Mean number of reachable addresses per candidate stop.
    pub fn addresses_per_stop(&self) -> f64 {
        let total: usize = self.stop_addresses.iter().skip(1).map(Vec::len).sum();
        total as f64 / (self.stops.len() - 1) as f64
    }
}
