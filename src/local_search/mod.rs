//! Best-improvement local search over seven neighbourhoods.
//!
//! - [`Move::ToEmpty`] — a section of a route becomes a new bus
//! - [`Move::Insert`] — a section moves in front of any position of another route
//! - [`Move::SwapSections`] — cross exchange of two sections (Taillard et al., 1997)
//! - [`Move::SwapStops`] — two stops of a route trade places
//! - [`Move::Reverse`] — 2-opt section reversal (Croes, 1958)
//! - [`Move::OrOpt`] — a section moves within its route (Or, 1976)
//! - [`Move::CopyStop`] — a second bus takes some passengers of a stop
//!
//! Every pass evaluates the whole neighbourhood of the current solution and
//! applies one move of least resulting cost, chosen uniformly among ties.
//! The search stops when no move improves the cost.

mod apply;
mod exchange;
mod multi_stop;
mod or_opt;
mod relocate;
mod splice;
mod two_opt;

use rand::Rng;
use serde::Serialize;
use tracing::trace;

use crate::models::{BusProblem, Solution};
use splice::Section;

/// Smallest relative cost decrease accepted as an improvement.
const IMPROVEMENT_EPS: f64 = 1e-9;

/// A neighbourhood move. Positions refer to the routes before the move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Move {
    /// Section `[start, end)` of `from` becomes the whole of the empty route `to`.
    ToEmpty {
        from: usize,
        start: usize,
        end: usize,
        to: usize,
        reversed: bool,
    },
    /// Section `[start, end)` of `from` goes in front of position `at` of `to`.
    Insert {
        from: usize,
        start: usize,
        end: usize,
        to: usize,
        at: usize,
        reversed: bool,
    },
    /// Sections `[start, end)` of `from` and `[to_start, to_end)` of `to` trade places.
    SwapSections {
        from: usize,
        start: usize,
        end: usize,
        to: usize,
        to_start: usize,
        to_end: usize,
        reversed_from: bool,
        reversed_to: bool,
    },
    /// The stops at positions `first` and `second` of `route` trade places.
    SwapStops {
        route: usize,
        first: usize,
        second: usize,
    },
    /// Positions `[first, last]` of `route` are reversed.
    Reverse {
        route: usize,
        first: usize,
        last: usize,
    },
    /// Positions `[first, last]` of `route` move in front of position `before`.
    OrOpt {
        route: usize,
        first: usize,
        last: usize,
        before: usize,
        reversed: bool,
    },
    /// `transfer` passengers of the stop at `position` of `from` board route
    /// `to` instead, at its existing visit or a new one at `insert_at`.
    CopyStop {
        from: usize,
        position: usize,
        to: usize,
        insert_at: Option<usize>,
        transfer: i32,
    },
}

/// Neighbourhood a [`Move`] belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveKind {
    ToEmpty,
    Insert,
    SwapSections,
    SwapStops,
    Reverse,
    OrOpt,
    CopyStop,
}

impl MoveKind {
    /// Every kind.
    pub const ALL: [MoveKind; 7] = [
        MoveKind::ToEmpty,
        MoveKind::Insert,
        MoveKind::SwapSections,
        MoveKind::SwapStops,
        MoveKind::Reverse,
        MoveKind::OrOpt,
        MoveKind::CopyStop,
    ];
}

impl Move {
    /// The neighbourhood of this move.
    pub fn kind(&self) -> MoveKind {
        match self {
            Move::ToEmpty { .. } => MoveKind::ToEmpty,
            Move::Insert { .. } => MoveKind::Insert,
            Move::SwapSections { .. } => MoveKind::SwapSections,
            Move::SwapStops { .. } => MoveKind::SwapStops,
            Move::Reverse { .. } => MoveKind::Reverse,
            Move::OrOpt { .. } => MoveKind::OrOpt,
            Move::CopyStop { .. } => MoveKind::CopyStop,
        }
    }
}

/// Statistics of one local search run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LocalSearchOutcome {
    /// Whether the final solution is feasible.
    pub feasible: bool,
    /// Improving moves applied.
    pub moves: usize,
    /// Applied moves per neighbourhood.
    pub moves_by_kind: Vec<(MoveKind, usize)>,
    /// Inter-route section moves evaluated.
    pub evaluations: u64,
    /// Those of them that respected both capacities.
    pub capacity_feasible_evaluations: u64,
}

impl LocalSearchOutcome {
    /// Share of inter-route evaluations that respected capacity.
    pub fn capacity_feasible_ratio(&self) -> f64 {
        if self.evaluations == 0 {
            0.0
        } else {
            self.capacity_feasible_evaluations as f64 / self.evaluations as f64
        }
    }

    fn record(&mut self, kind: MoveKind) {
        self.moves += 1;
        match self.moves_by_kind.iter_mut().find(|(k, _)| *k == kind) {
            Some((_, n)) => *n += 1,
            None => self.moves_by_kind.push((kind, 1)),
        }
    }

    /// Adds the statistics of another run.
    pub fn absorb(&mut self, other: &LocalSearchOutcome) {
        self.feasible = other.feasible;
        self.evaluations += other.evaluations;
        self.capacity_feasible_evaluations += other.capacity_feasible_evaluations;
        for &(kind, n) in &other.moves_by_kind {
            for _ in 0..n {
                self.record(kind);
            }
        }
    }
}

/// Cost of `sol` once the listed routes take the given lengths.
pub(crate) fn total_cost(problem: &BusProblem, sol: &Solution, lengths: &[(usize, f64)]) -> f64 {
    let params = problem.params();
    let mut cost = sol.cost;
    for &(r, _) in lengths {
        cost -= params.route_cost(sol.route_len[r]);
    }
    for &(_, len) in lengths {
        cost += params.route_cost(len);
    }
    cost
}

/// Best move seen so far; ties are broken uniformly by reservoir sampling.
struct Reservoir {
    cost: f64,
    ties: u32,
    chosen: Option<Move>,
}

impl Reservoir {
    fn new() -> Self {
        Self {
            cost: f64::MAX,
            ties: 0,
            chosen: None,
        }
    }

    #[inline]
    fn offer<R: Rng>(&mut self, cost: f64, rng: &mut R, make: impl FnOnce() -> Move) {
        if cost > self.cost {
            return;
        }
        if cost < self.cost {
            self.ties = 0;
        }
        if rng.random_range(0..self.ties + 1) == 0 {
            self.cost = cost;
            self.chosen = Some(make());
        }
        self.ties += 1;
    }
}

/// Best-improvement local search.
///
/// # Examples
///
/// ```
/// use rand::rngs::StdRng;
/// use rand::SeedableRng;
/// use school_bus_routing::constructive::build;
/// use school_bus_routing::local_search::LocalSearch;
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
/// #         WalkLink { address: 1, stop: 2, distance: 0.1, time: 60.0 },
/// #     ],
/// # };
/// # let problem = BusProblem::new(input, RouteParams::default()).expect("valid");
///
/// let mut sol = build(&problem, 1, &[false, true, true]).expect("valid");
/// let before = sol.cost();
/// let mut rng = StdRng::seed_from_u64(42);
/// let outcome = LocalSearch::new(&problem).run(&mut sol, &mut rng);
/// assert!(sol.cost() <= before);
/// // B then A, ending next to the school.
/// assert_eq!(sol.route(0), &[2, 1]);
/// assert!(outcome.feasible);
/// ```
pub struct LocalSearch<'a> {
    problem: &'a BusProblem,
    under_limit_transfer: i32,
}

impl<'a> LocalSearch<'a> {
    /// Creates a local search moving one passenger per multi-stop copy while
    /// the source route is within the journey limit.
    pub fn new(problem: &'a BusProblem) -> Self {
        Self {
            problem,
            under_limit_transfer: 1,
        }
    }

    /// Sets the multi-stop transfer amount for routes within the journey limit.
    pub fn with_under_limit_transfer(mut self, passengers: i32) -> Self {
        self.under_limit_transfer = passengers.max(1);
        self
    }

    /// Improves `sol` until no move lowers its cost.
    pub fn run<R: Rng>(&self, sol: &mut Solution, rng: &mut R) -> LocalSearchOutcome {
        let mut outcome = LocalSearchOutcome::default();
        loop {
            let mut best = Reservoir::new();
            for x in 0..sol.routes.len() {
                self.scan_sections(sol, x, &mut best, &mut outcome, rng);
                self.scan_copies(sol, x, &mut best, rng);
                self.scan_route(sol, x, &mut best, rng);
            }
            match best.chosen {
                Some(mv) if best.cost < sol.cost - IMPROVEMENT_EPS * sol.cost.abs().max(1.0) => {
                    trace!(kind = ?mv.kind(), from = sol.cost, to = best.cost, "local search move");
                    apply::apply_move(self.problem, sol, &mv);
                    outcome.record(mv.kind());
                }
                _ => break,
            }
        }
        outcome.feasible = sol.is_feasible();
        trace!(
            moves = outcome.moves,
            evaluations = outcome.evaluations,
            capacity_feasible_ratio = outcome.capacity_feasible_ratio(),
            cost = sol.cost,
            feasible = outcome.feasible,
            "local optimum reached"
        );
        outcome
    }

    /// Moves of a section of route `x` into another route: to an empty
    /// route, in front of a position, or in exchange for a section.
    fn scan_sections<R: Rng>(
        &self,
        sol: &Solution,
        x: usize,
        best: &mut Reservoir,
        outcome: &mut LocalSearchOutcome,
        rng: &mut R,
    ) {
        let problem = self.problem;
        let capacity = problem.params().capacity;
        let route_x = &sol.routes[x];
        for y1 in 0..route_x.len() {
            let mut x_sec = Section::empty(y1);
            while x_sec.end < route_x.len() {
                x_sec.extend(problem, route_x, &sol.boarding[x]);
                let mut empty_seen = false;
                for i in (0..sol.routes.len()).filter(|&i| i != x) {
                    let route_i = &sol.routes[i];
                    if route_i.is_empty() {
                        if !empty_seen {
                            empty_seen = true;
                            let (cost, reversed) = relocate::to_empty_cost(problem, sol, x, i, &x_sec);
                            best.offer(cost, rng, || Move::ToEmpty {
                                from: x,
                                start: x_sec.start,
                                end: x_sec.end,
                                to: i,
                                reversed,
                            });
                        }
                        continue;
                    }
                    for j1 in 0..=route_i.len() {
                        let mut i_sec = Section::empty(j1);
                        loop {
                            outcome.evaluations += 1;
                            let fits = sol.route_load[i] - i_sec.passengers + x_sec.passengers <= capacity
                                && sol.route_load[x] - x_sec.passengers + i_sec.passengers <= capacity;
                            if fits {
                                outcome.capacity_feasible_evaluations += 1;
                                self.offer_pair(sol, x, &x_sec, i, &i_sec, best, rng);
                            }
                            if i_sec.end == route_i.len() {
                                break;
                            }
                            i_sec.extend(problem, route_i, &sol.boarding[i]);
                        }
                    }
                }
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn offer_pair<R: Rng>(
        &self,
        sol: &Solution,
        x: usize,
        x_sec: &Section,
        i: usize,
        i_sec: &Section,
        best: &mut Reservoir,
        rng: &mut R,
    ) {
        let problem = self.problem;
        if i_sec.is_empty() {
            let (cost, reversed) = relocate::insert_cost(problem, sol, x, x_sec, i, i_sec.start);
            best.offer(cost, rng, || Move::Insert {
                from: x,
                start: x_sec.start,
                end: x_sec.end,
                to: i,
                at: i_sec.start,
                reversed,
            });
        } else {
            let (cost, reversed_from, reversed_to) =
                exchange::swap_sections_cost(problem, sol, x, x_sec, i, i_sec);
            best.offer(cost, rng, || Move::SwapSections {
                from: x,
                start: x_sec.start,
                end: x_sec.end,
                to: i,
                to_start: i_sec.start,
                to_end: i_sec.end,
                reversed_from,
                reversed_to,
            });
        }
    }

    /// Multi-stop copies into route `x` from stops of other routes carrying
    /// more than one passenger.
    fn scan_copies<R: Rng>(&self, sol: &Solution, x: usize, best: &mut Reservoir, rng: &mut R) {
        if self.problem.params().capacity - sol.route_load[x] < 1 {
            return;
        }
        for i in (0..sol.routes.len()).filter(|&i| i != x) {
            for j in 0..sol.routes[i].len() {
                if sol.boarding[i][j] <= 1 {
                    continue;
                }
                let plan = multi_stop::copy_plan(self.problem, sol, i, j, x, self.under_limit_transfer);
                best.offer(plan.cost, rng, || Move::CopyStop {
                    from: i,
                    position: j,
                    to: x,
                    insert_at: plan.insert_at,
                    transfer: plan.transfer,
                });
            }
        }
    }

    /// Swaps, reversals and Or-opt moves within route `x`.
    fn scan_route<R: Rng>(&self, sol: &Solution, x: usize, best: &mut Reservoir, rng: &mut R) {
        let problem = self.problem;
        let route = &sol.routes[x];
        let n = route.len();
        for y1 in 0..n {
            let mut sec = Section::empty(y1);
            while sec.end < n {
                sec.extend(problem, route, &sol.boarding[x]);
                let y2 = sec.end - 1;
                if y2 > y1 {
                    let cost = exchange::swap_stops_cost(problem, sol, x, &sec);
                    best.offer(cost, rng, || Move::SwapStops {
                        route: x,
                        first: y1,
                        second: y2,
                    });
                    let cost = two_opt::reverse_cost(problem, sol, x, &sec);
                    best.offer(cost, rng, || Move::Reverse {
                        route: x,
                        first: y1,
                        last: y2,
                    });
                }
                for before in (0..y1).chain(y2 + 2..=n) {
                    let (cost, reversed) = or_opt::or_opt_cost(problem, sol, x, &sec, before);
                    best.offer(cost, rng, || Move::OrOpt {
                        route: x,
                        first: y1,
                        last: y2,
                        before,
                        reversed,
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RouteParams;
    use crate::constructive::build;
    use crate::evaluation::{validate, RouteEvaluator};
    use crate::test_support::{custom_input, line_problem, random_problem};
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn solution(problem: &BusProblem, routes: Vec<Vec<usize>>, boarding: Vec<Vec<i32>>) -> Solution {
        let mut sol = Solution::empty(problem.num_stops(), problem.num_addresses(), routes.len());
        sol.routes = routes;
        sol.boarding = boarding;
        RouteEvaluator::new(problem).recompute(&mut sol);
        sol
    }

    #[test]
    fn test_reverses_a_section_to_end_near_the_school() {
        // Stop 2 is next to the school, stop 1 far out.
        let drive = vec![
            vec![0.0, 500.0, 50.0],
            vec![500.0, 0.0, 460.0],
            vec![50.0, 460.0, 0.0],
        ];
        let input = custom_input(&drive, &[1, 1], &[(0, 1, 10.0), (1, 2, 10.0)]);
        let problem = BusProblem::new(input, RouteParams::default()).expect("valid");
        let mut sol = solution(&problem, vec![vec![2, 1]], vec![vec![1, 1]]);
        let before = sol.route_length(0);
        let mut rng = StdRng::seed_from_u64(1);
        let outcome = LocalSearch::new(&problem).run(&mut sol, &mut rng);
        assert_eq!(sol.route(0), &[1, 2]);
        assert!((before - sol.route_length(0) - 450.0).abs() < 1e-10);
        assert_eq!(outcome.moves, 1);
        assert!(validate(&problem, &sol, false).is_empty());
    }

    #[test]
    fn test_splits_an_overlong_route() {
        // Six stops in one bus take 930 s; any five fit in 900 s.
        let params = RouteParams::default().with_max_journey_time(900.0);
        let problem = line_problem(6, params);
        let mut sol = build(&problem, 3, &[false, true, true, true, true, true, true]).expect("valid");
        let mut rng = StdRng::seed_from_u64(5);
        let outcome = LocalSearch::new(&problem).run(&mut sol, &mut rng);
        assert!(outcome.feasible, "{:?}", sol.routes());
        assert!(outcome.moves > 0);
        assert!(validate(&problem, &sol, false).is_empty());
    }

    #[test]
    fn test_no_move_on_a_local_optimum() {
        let problem = line_problem(1, RouteParams::default());
        let mut sol = build(&problem, 1, &[false, true]).expect("valid");
        let mut rng = StdRng::seed_from_u64(1);
        let outcome = LocalSearch::new(&problem).run(&mut sol, &mut rng);
        assert_eq!(outcome.moves, 0);
        assert_eq!(outcome.evaluations, 0);
    }

    #[test]
    fn test_capacity_ratio() {
        let problem = line_problem(5, RouteParams::default().with_capacity(4));
        let mut sol = build(&problem, 3, &[false, true, true, true, true, true]).expect("valid");
        let mut rng = StdRng::seed_from_u64(2);
        let outcome = LocalSearch::new(&problem).run(&mut sol, &mut rng);
        assert!(outcome.evaluations > 0);
        assert!(outcome.capacity_feasible_evaluations <= outcome.evaluations);
        let ratio = outcome.capacity_feasible_ratio();
        assert!((0.0..=1.0).contains(&ratio));
    }

    #[test]
    fn test_reservoir_keeps_strictly_better() {
        let mut rng = StdRng::seed_from_u64(9);
        let mut r = Reservoir::new();
        let a = Move::Reverse { route: 0, first: 0, last: 1 };
        let b = Move::SwapStops { route: 0, first: 0, second: 1 };
        r.offer(10.0, &mut rng, || a);
        r.offer(12.0, &mut rng, || b);
        assert_eq!(r.chosen, Some(a));
        r.offer(9.0, &mut rng, || b);
        assert_eq!(r.chosen, Some(b));
        assert_eq!(r.ties, 1);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(24))]

        #[test]
        fn prop_local_search_keeps_solution_consistent(seed in 0u64..10_000) {
            let params = RouteParams::default().with_capacity(10).with_max_journey_time(1500.0);
            let problem = random_problem(seed, 9, 12, params);
            let k = problem.lower_bound_fleet() + 1;
            let mut used = vec![true; problem.num_stops()];
            used[0] = false;
            let mut sol = build(&problem, k, &used).expect("valid");
            let before = sol.cost();
            let mut rng = StdRng::seed_from_u64(seed);
            LocalSearch::new(&problem).run(&mut sol, &mut rng);
            prop_assert!(sol.cost() <= before + 1e-6);
            let violations = validate(&problem, &sol, false);
            prop_assert!(violations.is_empty(), "{:?}", violations);
            for r in 0..k {
                prop_assert!(sol.route_load(r) <= 10);
            }
        }
    }
}
