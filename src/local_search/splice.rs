//! Length arithmetic for cutting a section out of a route and splicing one
//! into a gap.
//!
//! A route has no leg before its first stop and ends with a leg to the
//! school, so the "stop before" the head is `None` and the "stop after" the
//! tail is [`SCHOOL`]. With those conventions a single pair of formulas
//! covers heads, tails, interiors and empty routes:
//!
//! ```text
//! cut:    L - link(prev, first) - d(last, next) + link(prev, next) - inner - dwell
//! splice: L + link(prev, first) + d(last, next) - link(prev, next) + inner + dwell
//! ```
//!
//! where `link(None, _) = 0`.

use crate::models::{BusProblem, SCHOOL};

/// Drive time of the leg into `to`.
#[inline]
pub(crate) fn link(problem: &BusProblem, from: Option<usize>, to: usize) -> f64 {
    from.map_or(0.0, |f| problem.drive_time(f, to))
}

/// Stop before position `pos`, `None` at the head of the route.
#[inline]
pub(crate) fn stop_before(route: &[usize], pos: usize) -> Option<usize> {
    pos.checked_sub(1).map(|p| route[p])
}

/// Stop at position `pos`, the school past the end of the route.
#[inline]
pub(crate) fn stop_at(route: &[usize], pos: usize) -> usize {
    route.get(pos).copied().unwrap_or(SCHOOL)
}

/// Where a section is spliced in: between `prev` and `next`.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Gap {
    pub prev: Option<usize>,
    pub next: usize,
}

impl Gap {
    /// The gap in front of position `pos` of `route`.
    pub fn before(route: &[usize], pos: usize) -> Self {
        Self {
            prev: stop_before(route, pos),
            next: stop_at(route, pos),
        }
    }

    /// The gap left behind once positions `[start, end)` are cut out.
    pub fn around(route: &[usize], start: usize, end: usize) -> Self {
        Self {
            prev: stop_before(route, start),
            next: stop_at(route, end),
        }
    }

    /// The only gap of an empty route.
    pub fn empty_route() -> Self {
        Self {
            prev: None,
            next: SCHOOL,
        }
    }
}

/// End stops and internal drive time of a section in one orientation.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Piece {
    pub first: usize,
    pub last: usize,
    pub inner: f64,
}

/// A contiguous section `[start, end)` of a route with running totals.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Section {
    pub start: usize,
    pub end: usize,
    /// Drive time along the section, front to back.
    pub inner: f64,
    /// Drive time along the section, back to front.
    pub inner_rev: f64,
    pub dwell: f64,
    pub passengers: i32,
}

impl Section {
    pub fn empty(start: usize) -> Self {
        Self {
            start,
            end: start,
            inner: 0.0,
            inner_rev: 0.0,
            dwell: 0.0,
            passengers: 0,
        }
    }

    /// Grows the section by the stop at position `end`.
    pub fn extend(&mut self, problem: &BusProblem, route: &[usize], boarding: &[i32]) {
        let p = self.end;
        if p > self.start {
            self.inner += problem.drive_time(route[p - 1], route[p]);
            self.inner_rev += problem.drive_time(route[p], route[p - 1]);
        }
        self.dwell += problem.params().dwell_time(boarding[p]);
        self.passengers += boarding[p];
        self.end += 1;
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.end == self.start
    }

    #[inline]
    pub fn contains(&self, pos: usize) -> bool {
        pos >= self.start && pos < self.end
    }

    /// The section as seen when travelled forwards or backwards.
    pub fn piece(&self, route: &[usize], reversed: bool) -> Piece {
        let (a, b) = (route[self.start], route[self.end - 1]);
        if reversed {
            Piece {
                first: b,
                last: a,
                inner: self.inner_rev,
            }
        } else {
            Piece {
                first: a,
                last: b,
                inner: self.inner,
            }
        }
    }
}

/// Length of a route of length `len` once the non-empty `sec` is cut out.
pub(crate) fn cut_length(problem: &BusProblem, route: &[usize], len: f64, sec: &Section) -> f64 {
    let gap = Gap::around(route, sec.start, sec.end);
    len - link(problem, gap.prev, route[sec.start])
        - problem.drive_time(route[sec.end - 1], gap.next)
        + link(problem, gap.prev, gap.next)
        - sec.inner
        - sec.dwell
}

/// Length of a route of length `base` once `piece` (with total dwell
/// `dwell`) is spliced into `gap`.
pub(crate) fn splice_length(problem: &BusProblem, base: f64, gap: Gap, piece: Piece, dwell: f64) -> f64 {
    base + link(problem, gap.prev, piece.first) + problem.drive_time(piece.last, gap.next)
        - link(problem, gap.prev, gap.next)
        + piece.inner
        + dwell
}

/// Splices `sec` of `route` into `gap` in its better orientation. The
/// section is reversed only when that is strictly shorter.
pub(crate) fn best_splice(
    problem: &BusProblem,
    base: f64,
    gap: Gap,
    route: &[usize],
    sec: &Section,
) -> (f64, bool) {
    let forward = splice_length(problem, base, gap, sec.piece(route, false), sec.dwell);
    let backward = splice_length(problem, base, gap, sec.piece(route, true), sec.dwell);
    if backward < forward {
        (backward, true)
    } else {
        (forward, false)
    }
}

/// Splice length when the stops of `sec` failing `keep` are merged into
/// their existing occurrence in the target route instead of being visited
/// again. Every merged stop saves one fixed dwell.
///
/// Returns `None` if every stop is kept.
pub(crate) fn merged_splice(
    problem: &BusProblem,
    base: f64,
    gap: Gap,
    route: &[usize],
    sec: &Section,
    reversed: bool,
    keep: impl Fn(usize) -> bool,
) -> Option<f64> {
    let mut merged = 0usize;
    let mut ends: Option<(usize, usize)> = None;
    let mut inner = 0.0;
    for i in 0..sec.end - sec.start {
        let p = if reversed { sec.end - 1 - i } else { sec.start + i };
        let s = route[p];
        if !keep(s) {
            merged += 1;
            continue;
        }
        ends = match ends {
            None => Some((s, s)),
            Some((first, last)) => {
                inner += problem.drive_time(last, s);
                Some((first, s))
            }
        };
    }
    if merged == 0 {
        return None;
    }
    let saving = merged as f64 * problem.params().dwell_per_stop;
    let length = match ends {
        Some((first, last)) => {
            splice_length(problem, base, gap, Piece { first, last, inner }, sec.dwell)
        }
        None => base + sec.dwell,
    };
    Some(length - saving)
}
