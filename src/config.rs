//! Route parameters and search configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::RoutingError;

/// Physical and cost parameters of a bus route.
///
/// All times are in seconds.
///
/// # Examples
///
/// ```
/// use school_bus_routing::config::RouteParams;
///
/// let params = RouteParams::default()
///     .with_capacity(50)
///     .with_max_journey_time(1800.0);
/// assert_eq!(params.capacity, 50);
/// // The excess weight follows the journey limit unless set explicitly.
/// assert_eq!(params.excess_weight, 1800.0);
/// assert_eq!(params.dwell_time(2), 15.0 + 2.0 * 5.0);
/// assert_eq!(params.route_cost(1700.0), 1700.0);
/// assert_eq!(params.route_cost(1810.0), 1800.0 + 1800.0 * 11.0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteParams {
    /// Maximum number of passengers on one bus.
    pub capacity: i32,
    /// Maximum journey time of a route.
    pub max_journey_time: f64,
    /// Dwell time added per boarding passenger.
    pub dwell_per_passenger: f64,
    /// Fixed dwell time added per stop visit.
    pub dwell_per_stop: f64,
    /// Weight of every second beyond the maximum journey time.
    pub excess_weight: f64,
}

impl Default for RouteParams {
    fn default() -> Self {
        Self {
            capacity: 70,
            max_journey_time: 45.0 * 60.0,
            dwell_per_passenger: 5.0,
            dwell_per_stop: 15.0,
            excess_weight: 45.0 * 60.0,
        }
    }
}

impl RouteParams {
    /// Sets the vehicle capacity.
    pub fn with_capacity(mut self, capacity: i32) -> Self {
        self.capacity = capacity;
        self
    }

    /// Sets the maximum journey time; the excess weight is reset to the same value.
    pub fn with_max_journey_time(mut self, seconds: f64) -> Self {
        self.max_journey_time = seconds;
        self.excess_weight = seconds;
        self
    }

    /// Sets the per-passenger and per-stop dwell coefficients.
    pub fn with_dwell(mut self, per_passenger: f64, per_stop: f64) -> Self {
        self.dwell_per_passenger = per_passenger;
        self.dwell_per_stop = per_stop;
        self
    }

    /// Sets the penalty weight for exceeding the maximum journey time.
    pub fn with_excess_weight(mut self, weight: f64) -> Self {
        self.excess_weight = weight;
        self
    }

    /// Time spent at a stop where `passengers` board.
    #[inline]
    pub fn dwell_time(&self, passengers: i32) -> f64 {
        self.dwell_per_stop + f64::from(passengers) * self.dwell_per_passenger
    }

    /// Penalized cost of a route of raw length `length`.
    #[inline]
    pub fn route_cost(&self, length: f64) -> f64 {
        if length > self.max_journey_time {
            self.max_journey_time + self.excess_weight * (length - self.max_journey_time + 1.0)
        } else {
            length
        }
    }

    /// A route is feasible when within the journey limit or when it serves an outlier stop.
    #[inline]
    pub fn is_route_feasible(&self, length: f64, has_outlier: bool) -> bool {
        has_outlier || length <= self.max_journey_time
    }

    /// Checks that every parameter is usable.
    pub fn validate(&self) -> Result<(), RoutingError> {
        if self.capacity <= 0 {
            return Err(RoutingError::parameter("capacity", "must be positive"));
        }
        if !(self.max_journey_time.is_finite() && self.max_journey_time > 0.0) {
            return Err(RoutingError::parameter(
                "max_journey_time",
                "must be positive and finite",
            ));
        }
        if !(self.dwell_per_passenger >= 0.0 && self.dwell_per_stop >= 0.0) {
            return Err(RoutingError::parameter("dwell", "coefficients must be non-negative"));
        }
        if !(self.excess_weight.is_finite() && self.excess_weight >= 0.0) {
            return Err(RoutingError::parameter(
                "excess_weight",
                "must be non-negative and finite",
            ));
        }
        Ok(())
    }
}

/// Budget spent by the iterated local search for each fleet size.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SearchBudget {
    /// Wall-clock time per fleet size.
    Time(Duration),
    /// Number of perturbation + local search rounds per fleet size.
    Iterations(usize),
}

impl SearchBudget {
    /// Interprets a signed value: non-negative means seconds, negative means
    /// an iteration count.
    ///
    /// ```
    /// use std::time::Duration;
    /// use school_bus_routing::config::SearchBudget;
    ///
    /// assert_eq!(SearchBudget::from_signed(10), SearchBudget::Time(Duration::from_secs(10)));
    /// assert_eq!(SearchBudget::from_signed(-50), SearchBudget::Iterations(50));
    /// ```
    pub fn from_signed(value: i64) -> Self {
        if value >= 0 {
            SearchBudget::Time(Duration::from_secs(value.unsigned_abs()))
        } else {
            SearchBudget::Iterations(value.unsigned_abs() as usize)
        }
    }
}

impl Default for SearchBudget {
    fn default() -> Self {
        SearchBudget::Time(Duration::from_secs(10))
    }
}

/// Configuration of the two-stage search.
///
/// # Examples
///
/// ```
/// use school_bus_routing::config::{SearchBudget, SearchConfig};
///
/// let config = SearchConfig::default()
///     .with_seed(7)
///     .with_budget(SearchBudget::Iterations(20))
///     .with_minimal_covers(true);
/// assert_eq!(config.seed, 7);
/// assert!(config.minimal_covers);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Seed of the single random stream.
    pub seed: u64,
    /// ILS budget per fleet size.
    pub budget: SearchBudget,
    /// Rounding resolution of the archive dominance test.
    pub discretization: f64,
    /// Whether stop coverings are reduced to minimal coverings.
    pub minimal_covers: bool,
    /// Fleet size to start from (never below the lower bound).
    pub initial_fleet: Option<usize>,
    /// Skip the archive exploration.
    pub stage_one_only: bool,
    /// Passengers moved by a multi-stop copy when the source route is within
    /// the journey limit.
    pub under_limit_transfer: i32,
    /// Optional wall-clock limit on the archive exploration.
    pub archive_time_limit: Option<Duration>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            seed: 1,
            budget: SearchBudget::default(),
            discretization: 10.0,
            minimal_covers: false,
            initial_fleet: None,
            stage_one_only: false,
            under_limit_transfer: 1,
            archive_time_limit: None,
        }
    }
}

impl SearchConfig {
    /// Sets the random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Sets the per-fleet-size budget.
    pub fn with_budget(mut self, budget: SearchBudget) -> Self {
        self.budget = budget;
        self
    }

    /// Sets the archive rounding resolution.
    pub fn with_discretization(mut self, resolution: f64) -> Self {
        self.discretization = resolution;
        self
    }

    /// Requires minimal stop coverings.
    pub fn with_minimal_covers(mut self, minimal: bool) -> Self {
        self.minimal_covers = minimal;
        self
    }

    /// Sets the starting fleet size.
    pub fn with_initial_fleet(mut self, k: usize) -> Self {
        self.initial_fleet = Some(k);
        self
    }

    /// Runs only the feasibility stage.
    pub fn with_stage_one_only(mut self, only: bool) -> Self {
        self.stage_one_only = only;
        self
    }

    /// Sets the multi-stop transfer amount for routes within the journey limit.
    pub fn with_under_limit_transfer(mut self, passengers: i32) -> Self {
        self.under_limit_transfer = passengers;
        self
    }

    /// Bounds the archive exploration by wall-clock time.
    pub fn with_archive_time_limit(mut self, limit: Duration) -> Self {
        self.archive_time_limit = Some(limit);
        self
    }

    /// Checks that every setting is usable.
    pub fn validate(&self) -> Result<(), RoutingError> {
        if !(self.discretization.is_finite() && self.discretization >= 0.0) {
            return Err(RoutingError::parameter(
                "discretization",
                "must be non-negative and finite",
            ));
        }
        if self.under_limit_transfer < 1 {
            return Err(RoutingError::parameter(
                "under_limit_transfer",
                "must be at least one passenger",
            ));
        }
        if self.initial_fleet == Some(0) {
            return Err(RoutingError::parameter("initial_fleet", "must be positive"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_defaults() {
        let p = RouteParams::default();
        assert_eq!(p.capacity, 70);
        assert_eq!(p.max_journey_time, 2700.0);
        assert_eq!(p.excess_weight, p.max_journey_time);
        assert!(p.validate().is_ok());
    }

    #[test]
    fn test_route_cost_penalty() {
        let p = RouteParams::default()
            .with_max_journey_time(100.0)
            .with_excess_weight(2.0);
        assert_eq!(p.route_cost(100.0), 100.0);
        // 100 + 2 * (105 - 100 + 1)
        assert!((p.route_cost(105.0) - 112.0).abs() < 1e-10);
    }

    #[test]
    fn test_feasibility() {
        let p = RouteParams::default().with_max_journey_time(100.0);
        assert!(p.is_route_feasible(100.0, false));
        assert!(!p.is_route_feasible(100.5, false));
        assert!(p.is_route_feasible(500.0, true));
    }

    #[test]
    fn test_invalid_params() {
        assert!(RouteParams::default().with_capacity(0).validate().is_err());
        assert!(RouteParams::default()
            .with_dwell(-1.0, 0.0)
            .validate()
            .is_err());
        assert!(RouteParams::default()
            .with_max_journey_time(f64::NAN)
            .validate()
            .is_err());
    }

    #[test]
    fn test_search_config_validate() {
        assert!(SearchConfig::default().validate().is_ok());
        assert!(SearchConfig::default()
            .with_discretization(-1.0)
            .validate()
            .is_err());
        assert!(SearchConfig::default()
            .with_under_limit_transfer(0)
            .validate()
            .is_err());
        assert!(SearchConfig::default()
            .with_initial_fleet(0)
            .validate()
            .is_err());
    }

    #[test]
    fn test_budget_from_signed() {
        assert_eq!(
            SearchBudget::from_signed(0),
            SearchBudget::Time(Duration::ZERO)
        );
        assert_eq!(SearchBudget::from_signed(-1), SearchBudget::Iterations(1));
    }

    #[test]
    fn test_config_serde_roundtrip() {
        let config = SearchConfig::default()
            .with_seed(99)
            .with_budget(SearchBudget::Iterations(5));
        let json = serde_json::to_string(&config).expect("serialize");
        let back: SearchConfig = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, config);
    }
}
