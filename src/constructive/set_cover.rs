//! Stop selection by greedy set covering.
//!
//! # Algorithm
//!
//! Each candidate stop is a set: the addresses within walking distance of
//! it. Stops already activated are applied first. The remaining addresses
//! are then covered by repeatedly activating one stop chosen by a
//! [`CoverHeuristic`] and removing its addresses from every other set, until
//! every address is covered.
//!
//! Ties are broken uniformly at random by reservoir sampling, so only the
//! running choice and a tie counter are stored.
//!
//! The optional minimality pass visits the activated stops in random order
//! and drops each stop whose removal leaves every address with at least one
//! other activated stop.
//!
//! # Complexity
//!
//! O(n · (n + A)) per covering, where n = stops and A = reachable
//! (address, stop) pairs.
//!
//! # Reference
//!
//! Chvátal, V. (1979). "A Greedy Heuristic for the Set-Covering Problem",
//! *Mathematics of Operations Research* 4(3), 233-235.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::error::RoutingError;
use crate::models::BusProblem;

/// Rule for choosing the next stop of a covering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoverHeuristic {
    /// Stop with the most uncovered addresses; ties broken at random.
    Greedy,
    /// Any stop with at least one uncovered address, uniformly at random.
    Random,
    /// Every address activates its own nearest stop (minimum walking).
    Nearest,
}

/// Extends `stop_used` to a complete covering of the addresses.
///
/// Stops already set in `stop_used` are kept and their addresses count as
/// covered. `forbidden`, if given, is never activated and is cleared if it
/// was set. With `minimal`, the result is reduced to a minimal covering.
///
/// # Errors
///
/// Returns [`RoutingError::Invariant`] if some address can only be covered
/// by the forbidden stop.
///
/// # Examples
///
/// ```
/// use rand::rngs::StdRng;
/// use rand::SeedableRng;
/// use school_bus_routing::constructive::{cover, CoverHeuristic};
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
/// // Stop 1 reaches both addresses, stop 2 only one.
/// let mut rng = StdRng::seed_from_u64(42);
/// let mut used = vec![false; problem.num_stops()];
/// cover(&problem, &mut used, None, CoverHeuristic::Greedy, false, &mut rng).expect("valid");
/// assert_eq!(used, vec![false, true, false]);
/// ```
pub fn cover<R: Rng>(
    problem: &BusProblem,
    stop_used: &mut [bool],
    forbidden: Option<usize>,
    heuristic: CoverHeuristic,
    minimal: bool,
    rng: &mut R,
) -> Result<(), RoutingError> {
    let n = problem.num_stops();
    let m = problem.num_addresses();
    debug_assert_eq!(stop_used.len(), n);

    if heuristic == CoverHeuristic::Nearest {
        for a in 0..m {
            stop_used[problem.stops_near(a)[0]] = true;
        }
        if minimal {
            make_minimal(problem, stop_used, rng);
        }
        return Ok(());
    }

    let mut eligible = vec![true; n];
    eligible[0] = false;
    if let Some(f) = forbidden {
        if f < n {
            eligible[f] = false;
            stop_used[f] = false;
        }
    }

    // counts[s] = uncovered addresses that stop s would cover.
    let mut counts: Vec<usize> = (0..n)
        .map(|s| {
            if eligible[s] {
                problem.addresses_near(s).len()
            } else {
                0
            }
        })
        .collect();
    let mut covered = vec![false; m];
    let mut num_covered = 0;

    for s in 1..n {
        if stop_used[s] {
            num_covered += mark_covered(problem, s, &eligible, &mut counts, &mut covered);
        }
    }

    while num_covered < m {
        let choice = match heuristic {
            CoverHeuristic::Greedy => choose_biggest(&counts, rng),
            _ => choose_any(&counts, rng),
        };
        let Some(s) = choice else {
            return Err(RoutingError::invariant(format!(
                "{} addresses cannot be covered without the forbidden stop",
                m - num_covered
            )));
        };
        stop_used[s] = true;
        num_covered += mark_covered(problem, s, &eligible, &mut counts, &mut covered);
    }

    if minimal {
        make_minimal(problem, stop_used, rng);
    }
    Ok(())
}

/// Marks the addresses of stop `s` as covered and returns how many were new.
fn mark_covered(
    problem: &BusProblem,
    s: usize,
    eligible: &[bool],
    counts: &mut [usize],
    covered: &mut [bool],
) -> usize {
    let mut newly = 0;
    for &a in problem.addresses_near(s) {
        if covered[a] {
            continue;
        }
        covered[a] = true;
        newly += 1;
        for &t in problem.stops_near(a) {
            if eligible[t] {
                counts[t] -= 1;
            }
        }
    }
    newly
}

/// Stop with the most uncovered addresses, uniform among ties.
fn choose_biggest<R: Rng>(counts: &[usize], rng: &mut R) -> Option<usize> {
    let mut best = None;
    let mut max = 0;
    let mut ties = 0;
    for (s, &c) in counts.iter().enumerate().skip(1) {
        if c == 0 || c < max {
            continue;
        }
        if c > max {
            max = c;
            ties = 0;
        }
        if rng.random_range(0..ties + 1) == 0 {
            best = Some(s);
        }
        ties += 1;
    }
    best
}

/// Any stop with an uncovered address, uniformly at random.
fn choose_any<R: Rng>(counts: &[usize], rng: &mut R) -> Option<usize> {
    let mut choice = None;
    let mut seen = 0;
    for (s, &c) in counts.iter().enumerate().skip(1) {
        if c > 0 {
            if rng.random_range(0..seen + 1) == 0 {
                choice = Some(s);
            }
            seen += 1;
        }
    }
    choice
}

/// Drops activated stops, in random order, whose addresses all remain
/// covered by another activated stop.
pub fn make_minimal<R: Rng>(problem: &BusProblem, stop_used: &mut [bool], rng: &mut R) {
    let mut coverage = vec![0u32; problem.num_addresses()];
    let mut used: Vec<usize> = (1..stop_used.len()).filter(|&s| stop_used[s]).collect();
    for &s in &used {
        for &a in problem.addresses_near(s) {
            coverage[a] += 1;
        }
    }
    used.shuffle(rng);
    for s in used {
        let near = problem.addresses_near(s);
        if near.iter().all(|&a| coverage[a] != 1) {
            for &a in near {
                coverage[a] -= 1;
            }
            stop_used[s] = false;
        }
    }
}

/// Returns `true` when every address reaches at least one activated stop.
pub fn is_cover(problem: &BusProblem, stop_used: &[bool]) -> bool {
    (0..problem.num_addresses()).all(|a| problem.stops_near(a).iter().any(|&s| stop_used[s]))
}
