//! Two-stage planning: find the smallest feasible fleet, then trade cost
//! against walking time with that fleet.

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::info;

use crate::archive::ArchiveExplorer;
use crate::config::SearchConfig;
use crate::error::RoutingError;
use crate::ils::FleetSearch;
use crate::models::{BusProblem, Solution};
use crate::report::RunReport;

/// Everything a planner run produces.
#[derive(Debug, Clone)]
pub struct PlanOutcome {
    /// Best solution of the fleet search.
    pub best: Solution,
    /// Number of buses.
    pub fleet: usize,
    /// Archive by ascending walk cost, unless stage one ran alone.
    pub archive: Option<Vec<Solution>>,
    /// Run summary.
    pub report: RunReport,
}

/// Runs the fleet search and the archive exploration from one seeded
/// random stream.
///
/// # Examples
///
/// ```
/// use school_bus_routing::config::{SearchBudget, SearchConfig};
/// use school_bus_routing::planner::Planner;
/// # use school_bus_routing::config::RouteParams;
/// # use school_bus_routing::distance::DistanceMatrix;
/// # use school_bus_routing::models::{Address, BusProblem, DistanceUnit, ProblemInput, Stop, WalkLink};
/// # let drive = DistanceMatrix::from_data(3, 3, vec![0.0, 100.0, 120.0, 100.0, 0.0, 50.0, 120.0, 50.0, 0.0]).expect("valid");
/// # let input = ProblemInput {
/// #     stops: vec![Stop::new(0.0, 0.0, "School"), Stop::new(1.0, 0.0, "A"), Stop::new(2.0, 0.0, "B")],
/// #     addresses: vec![Address::new(1.0, 0.1, 2, "x"), Address::new(2.0, 0.1, 3, "y")],
/// #     distance_unit: DistanceUnit::Kilometres,
/// #     min_eligibility_distance: 0.0,
/// #     max_walk_distance: 0.5,
/// #     drive_distance: drive.clone(),
/// #     drive_time: drive,
/// #     walks: vec![
/// #         WalkLink { address: 0, stop: 1, distance: 0.1, time: 60.0 },
/// #         WalkLink { address: 1, stop: 1, distance: 0.4, time: 240.0 },
/// #         WalkLink { address: 1, stop: 2, distance: 0.1, time: 60.0 },
/// #     ],
/// # };
/// # let problem = BusProblem::new(input, RouteParams::default()).expect("valid");
///
/// let config = SearchConfig::default().with_budget(SearchBudget::Iterations(5));
/// let outcome = Planner::new(&problem, config).run().expect("valid");
/// assert_eq!(outcome.fleet, 1);
/// assert!(outcome.best.is_feasible());
/// let archive = outcome.archive.expect("stage two ran");
/// assert!(archive.windows(2).all(|w| w[0].walk_cost() <= w[1].walk_cost()));
/// ```
pub struct Planner<'a> {
    problem: &'a BusProblem,
    config: SearchConfig,
}

impl<'a> Planner<'a> {
    /// Creates a planner for `problem` with `config`.
    pub fn new(problem: &'a BusProblem, config: SearchConfig) -> Self {
        Self { problem, config }
    }

    /// The configuration in use.
    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Runs stage one and, unless disabled or no feasible fleet was found,
    /// stage two.
    ///
    /// # Errors
    ///
    /// Returns [`RoutingError::InvalidParameter`] for an unusable
    /// configuration and propagates invariant violations of either stage.
    pub fn run(&self) -> Result<PlanOutcome, RoutingError> {
        let problem = self.problem;
        problem.params().validate()?;
        self.config.validate()?;
        let mut rng = StdRng::seed_from_u64(self.config.seed);

        let fleet = FleetSearch::new(problem, &self.config).run(&mut rng)?;
        let mut report = RunReport::new(problem, &self.config, &fleet);

        let archive = if self.config.stage_one_only || !fleet.found_feasible {
            None
        } else {
            let outcome = ArchiveExplorer::new(problem, &self.config).explore(fleet.solution.clone(), &mut rng)?;
            report = report.with_archive(problem, &outcome);
            Some(outcome.solutions)
        };

        info!(
            fleet = fleet.fleet_size,
            cost = fleet.solution.cost(),
            archive_size = archive.as_ref().map_or(0, Vec::len),
            "planning finished"
        );
        Ok(PlanOutcome {
            best: fleet.solution,
            fleet: fleet.fleet_size,
            archive,
            report,
        })
    }
}
