//! Discretized Pareto archive over (cost per bus, walk time per passenger).
//!
//! Both objectives are minimized. Before comparison each objective is
//! rounded down to a multiple of the archive resolution, so solutions that
//! differ by less than one resolution step compete as equals and the front
//! stays small. A resolution of `0` compares exact values.
//!
//! A candidate is rejected if some member weakly dominates it after
//! rounding; otherwise every member it weakly dominates after rounding is
//! evicted and the candidate joins unvisited. No two members therefore
//! weakly dominate each other at the archive resolution.
//!
//! # Reference
//!
//! Laumanns, M., Thiele, L., Deb, K. & Zitzler, E. (2002). "Combining
//! Convergence and Diversity in Evolutionary Multiobjective Optimization",
//! *Evolutionary Computation* 10(3), 263-282.

use rand::Rng;

use crate::models::Solution;

#[derive(Debug, Clone)]
struct Entry {
    solution: Solution,
    /// Rounded (cost per bus, walk time per passenger).
    key: (f64, f64),
    visited: bool,
}

/// Mutually non-dominated solutions with visited flags.
///
/// # Examples
///
/// ```
/// use school_bus_routing::archive::Archive;
///
/// let archive = Archive::new(10.0, 40);
/// assert!(archive.is_empty());
/// assert_eq!(archive.resolution(), 10.0);
/// ```
#[derive(Debug, Clone)]
pub struct Archive {
    entries: Vec<Entry>,
    resolution: f64,
    passengers: f64,
}

/// Rounds `x` down to a multiple of `base`; `base == 0` leaves `x` as is.
fn round_down(x: f64, base: f64) -> f64 {
    if base > 0.0 {
        (x / base).floor() * base
    } else {
        x
    }
}

/// `a` is no worse than `b` in both objectives.
fn weakly_dominates(a: (f64, f64), b: (f64, f64)) -> bool {
    a.0 <= b.0 && a.1 <= b.1
}

impl Archive {
    /// Creates an empty archive for an instance with `total_passengers`
    /// passengers, comparing objectives at `resolution`.
    pub fn new(resolution: f64, total_passengers: i32) -> Self {
        Self {
            entries: Vec::new(),
            resolution: resolution.max(0.0),
            passengers: f64::from(total_passengers.max(1)),
        }
    }

    /// Rounding resolution.
    pub fn resolution(&self) -> f64 {
        self.resolution
    }

    /// Rounded (cost per bus, walk time per passenger) of `sol`.
    pub fn objectives(&self, sol: &Solution) -> (f64, f64) {
        (
            round_down(sol.cost_per_route(), self.resolution),
            round_down(sol.walk_cost() / self.passengers, self.resolution),
        )
    }

    /// Offers `sol` to the archive. Returns whether it was added.
    pub fn insert(&mut self, sol: Solution) -> bool {
        let key = self.objectives(&sol);
        if self.entries.iter().any(|e| weakly_dominates(e.key, key)) {
            return false;
        }
        self.entries.retain(|e| !weakly_dominates(key, e.key));
        self.entries.push(Entry {
            solution: sol,
            key,
            visited: false,
        });
        true
    }

    /// Number of members.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the archive has no members.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of members already explored.
    pub fn num_visited(&self) -> usize {
        self.entries.iter().filter(|e| e.visited).count()
    }

    /// Number of feasible members.
    pub fn num_feasible(&self) -> usize {
        self.entries.iter().filter(|e| e.solution.is_feasible()).count()
    }

    /// Members in insertion order.
    pub fn solutions(&self) -> impl Iterator<Item = &Solution> {
        self.entries.iter().map(|e| &e.solution)
    }

    /// Feasible members in insertion order.
    pub fn feasible(&self) -> Vec<&Solution> {
        self.solutions().filter(|s| s.is_feasible()).collect()
    }

    /// Marks a uniformly random unvisited member as visited and returns a
    /// copy of it, or `None` once every member has been visited.
    pub(crate) fn take_unvisited<R: Rng>(&mut self, rng: &mut R) -> Option<Solution> {
        let mut chosen = None;
        let mut seen = 0;
        for (i, e) in self.entries.iter().enumerate() {
            if !e.visited {
                seen += 1;
                if rng.random_range(0..seen) == 0 {
                    chosen = Some(i);
                }
            }
        }
        let entry = &mut self.entries[chosen?];
        entry.visited = true;
        Some(entry.solution.clone())
    }

    /// Consumes the archive, returning its members by ascending walk cost.
    pub fn into_sorted(self) -> Vec<Solution> {
        let mut solutions: Vec<Solution> = self.entries.into_iter().map(|e| e.solution).collect();
        solutions.sort_by(|a, b| a.walk_cost().total_cmp(&b.walk_cost()));
        solutions
    }
}
