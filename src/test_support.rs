//! Small synthetic instances shared by the unit tests.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::RouteParams;
use crate::distance::DistanceMatrix;
use crate::models::{Address, BusProblem, DistanceUnit, ProblemInput, Stop, WalkLink};

/// Builds an input from explicit drive times, passenger counts and
/// `(address, stop, walk_time)` links. Every listed link is within range.
pub fn custom_input(
    drive: &[Vec<f64>],
    passengers: &[i32],
    links: &[(usize, usize, f64)],
) -> ProblemInput {
    let drive = DistanceMatrix::from_rows(drive).expect("square drive matrix");
    let stops = (0..drive.rows())
        .map(|s| Stop::new(s as f64, 0.0, format!("stop {s}")))
        .collect();
    let addresses = passengers
        .iter()
        .enumerate()
        .map(|(a, &p)| Address::new(a as f64, 1.0, p, format!("address {a}")))
        .collect();
    let walks = links
        .iter()
        .map(|&(address, stop, time)| WalkLink {
            address,
            stop,
            distance: time / 100_000.0,
            time,
        })
        .collect();
    ProblemInput {
        stops,
        addresses,
        distance_unit: DistanceUnit::Kilometres,
        min_eligibility_distance: 0.0,
        max_walk_distance: 1.0,
        drive_distance: drive.clone(),
        drive_time: drive,
        walks,
    }
}

/// `n` candidate stops on a line, 100 s apart, with the school at the origin.
/// Address `i` (2 passengers) sits next to stop `i + 1` and can also walk to
/// the neighbouring stops.
pub fn line_input(n: usize) -> ProblemInput {
    let drive: Vec<Vec<f64>> = (0..=n)
        .map(|a| {
            (0..=n)
                .map(|b| {
                    if a == b {
                        0.0
                    } else {
                        30.0 + 100.0 * (a as f64 - b as f64).abs()
                    }
                })
                .collect()
        })
        .collect();
    let mut links = Vec::new();
    for a in 0..n {
        let home = a + 1;
        links.push((a, home, 60.0));
        if home > 1 {
            links.push((a, home - 1, 240.0));
        }
        if home < n {
            links.push((a, home + 1, 250.0));
        }
    }
    custom_input(&drive, &vec![2; n], &links)
}

/// [`line_input`] turned into a problem.
pub fn line_problem(n: usize, params: RouteParams) -> BusProblem {
    BusProblem::new(line_input(n), params).expect("valid line instance")
}

/// A random planar instance: drive times are scaled Euclidean distances,
/// each address reaches its nearest stop plus any stop within the radius.
pub fn random_problem(
    seed: u64,
    num_stops: usize,
    num_addresses: usize,
    params: RouteParams,
) -> BusProblem {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut points: Vec<(f64, f64)> = vec![(0.0, 0.0)];
    for _ in 0..num_stops {
        points.push((rng.random_range(-10.0..10.0), rng.random_range(-10.0..10.0)));
    }
    let n = points.len();
    let drive: Vec<Vec<f64>> = (0..n)
        .map(|a| {
            (0..n)
                .map(|b| {
                    let (dx, dy) = (points[a].0 - points[b].0, points[a].1 - points[b].1);
                    60.0 * (dx * dx + dy * dy).sqrt()
                })
                .collect()
        })
        .collect();
    let mut passengers = Vec::with_capacity(num_addresses);
    let mut links = Vec::new();
    for a in 0..num_addresses {
        passengers.push(rng.random_range(1..=4));
        let home = (rng.random_range(-10.0..10.0), rng.random_range(-10.0..10.0));
        let walk = |s: usize| {
            let (dx, dy) = (home.0 - points[s].0, home.1 - points[s].1);
            300.0 * (dx * dx + dy * dy).sqrt()
        };
        let nearest = (1..n)
            .min_by(|&s, &t| walk(s).total_cmp(&walk(t)))
            .expect("at least one stop");
        for s in 1..n {
            if s == nearest || walk(s) < 1200.0 {
                links.push((a, s, walk(s)));
            }
        }
    }
    BusProblem::new(custom_input(&drive, &passengers, &links), params)
        .expect("valid random instance")
}
