//! Stop-removal perturbation.
//!
//! # Algorithm
//!
//! The activated stops that are not required are shuffled. The first one is
//! always closed, every other one with probability `3 / count`. The covering
//! is then completed again by the random heuristic with the first closed
//! stop forbidden, so the new covering always differs, and the solution is
//! rebuilt around it.
//!
//! # Reference
//!
//! Lourenço, H.R., Martin, O.C. & Stützle, T. (2003). "Iterated Local
//! Search", in *Handbook of Metaheuristics*, 320-353.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::constructive::{cover, rebuild, CoverHeuristic};
use crate::error::RoutingError;
use crate::models::{BusProblem, Solution};

/// Expected number of stops closed per perturbation.
const EXPECTED_REMOVALS: f64 = 3.0;

/// Closes a random subset of the non-required activated stops of `sol`,
/// repairs the covering and rebuilds the routes.
///
/// Returns the number of stops closed; `0` (and no change) when every
/// activated stop is required.
///
/// # Errors
///
/// Propagates covering and rebuild failures.
pub fn perturb<R: Rng>(
    problem: &BusProblem,
    sol: &mut Solution,
    minimal: bool,
    rng: &mut R,
) -> Result<usize, RoutingError> {
    let mut candidates: Vec<usize> = (1..problem.num_stops())
        .filter(|&s| sol.is_stop_used(s) && !problem.is_required(s))
        .collect();
    candidates.shuffle(rng);
    let Some(&first) = candidates.first() else {
        return Ok(0);
    };

    let p = EXPECTED_REMOVALS / candidates.len() as f64;
    let mut closed = vec![first];
    for &s in &candidates[1..] {
        if rng.random::<f64>() <= p {
            closed.push(s);
        }
    }

    let mut stop_used = sol.stop_activation().to_vec();
    for &s in &closed {
        stop_used[s] = false;
    }
    cover(problem, &mut stop_used, Some(first), CoverHeuristic::Random, minimal, rng)?;
    rebuild(problem, sol, &stop_used)?;
    Ok(closed.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RouteParams;
    use crate::constructive::{build, is_cover};
    use crate::evaluation::validate;
    use crate::test_support::{line_input, line_problem, random_problem};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_perturb_changes_covering() {
        let problem = line_problem(6, RouteParams::default());
        let mut sol = build(&problem, 1, &[false, true, true, true, true, true, true]).expect("valid");
        let before = sol.stop_activation().to_vec();
        let mut rng = StdRng::seed_from_u64(4);
        let removed = perturb(&problem, &mut sol, false, &mut rng).expect("valid");
        assert!(removed >= 1);
        assert_ne!(sol.stop_activation(), &before[..]);
        assert!(is_cover(&problem, sol.stop_activation()));
        assert!(validate(&problem, &sol, false).is_empty());
    }

    #[test]
    fn test_perturb_all_required() {
        // Every address reaches only its home stop.
        let mut input = line_input(3);
        input.walks.retain(|w| w.stop == w.address + 1);
        let problem = BusProblem::new(input, RouteParams::default()).expect("valid");
        let mut sol = build(&problem, 1, &[false, true, true, true]).expect("valid");
        let before = sol.clone();
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(perturb(&problem, &mut sol, false, &mut rng).expect("valid"), 0);
        assert_eq!(sol, before);
    }

    #[test]
    fn test_perturb_random_instances_stay_valid() {
        for seed in 0..15 {
            let problem = random_problem(seed, 12, 16, RouteParams::default().with_capacity(15));
            let k = problem.lower_bound_fleet() + 1;
            let mut used = vec![true; problem.num_stops()];
            used[0] = false;
            let mut sol = build(&problem, k, &used).expect("valid");
            let mut rng = StdRng::seed_from_u64(seed);
            for _ in 0..5 {
                perturb(&problem, &mut sol, seed % 2 == 0, &mut rng).expect("valid");
                let violations = validate(&problem, &sol, false);
                assert!(violations.is_empty(), "seed {seed}: {violations:?}");
            }
        }
    }
}
