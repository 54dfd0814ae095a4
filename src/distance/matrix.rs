//! Dense rectangular matrix of travel times or distances.

use serde::{Deserialize, Serialize};

/// A dense `rows × cols` matrix stored in row-major order.
///
/// Drive matrices are square (stop × stop); walking matrices are
/// rectangular (address × stop) and use `f64::INFINITY` for pairs that are
/// not within walking range.
///
/// # Examples
///
/// ```
/// use school_bus_routing::distance::DistanceMatrix;
///
/// let dm = DistanceMatrix::from_data(2, 3, vec![
///     0.0, 5.0, 7.0,
///     5.0, 0.0, 2.0,
/// ]).expect("valid");
/// assert_eq!(dm.get(1, 2), 2.0);
/// assert_eq!(dm.rows(), 2);
/// assert_eq!(dm.cols(), 3);
/// assert!(!dm.is_square());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistanceMatrix {
    data: Vec<f64>,
    rows: usize,
    cols: usize,
}

impl DistanceMatrix {
    /// Creates a square matrix of the given size, initialized to zero.
    pub fn new(size: usize) -> Self {
        Self::filled(size, size, 0.0)
    }

    /// Creates a `rows × cols` matrix with every entry set to `value`.
    pub fn filled(rows: usize, cols: usize, value: f64) -> Self {
        Self {
            data: vec![value; rows * cols],
            rows,
            cols,
        }
    }

    /// Creates a matrix from an explicit row-major grid.
    ///
    /// Returns `None` if the data length doesn't match `rows * cols`.
    pub fn from_data(rows: usize, cols: usize, data: Vec<f64>) -> Option<Self> {
        if data.len() != rows * cols {
            return None;
        }
        Some(Self { data, rows, cols })
    }

    /// Creates a square matrix from nested rows.
    ///
    /// Returns `None` if any row length differs from the number of rows.
    pub fn from_rows(rows: &[Vec<f64>]) -> Option<Self> {
        let n = rows.len();
        if rows.iter().any(|r| r.len() != n) {
            return None;
        }
        Some(Self {
            data: rows.iter().flatten().copied().collect(),
            rows: n,
            cols: n,
        })
    }

    /// Returns the entry from `row` to `col`.
    ///
    /// # Panics
    ///
    /// Panics if either index is out of bounds.
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[row * self.cols + col]
    }

    /// Sets the entry from `row` to `col`.
    #[inline]
    pub fn set(&mut self, row: usize, col: usize, value: f64) {
        self.data[row * self.cols + col] = value;
    }

    /// Number of rows.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns.
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Returns `true` if the matrix has as many rows as columns.
    pub fn is_square(&self) -> bool {
        self.rows == self.cols
    }

    /// Returns `true` if the matrix is square and symmetric within the given tolerance.
    pub fn is_symmetric(&self, tol: f64) -> bool {
        if !self.is_square() {
            return false;
        }
        for i in 0..self.rows {
            for j in (i + 1)..self.cols {
                if (self.get(i, j) - self.get(j, i)).abs() > tol {
                    return false;
                }
            }
        }
        true
    }

    /// Returns `true` if every entry is finite or `+∞` (no NaN, no negative values).
    pub fn is_well_formed(&self) -> bool {
        self.data.iter().all(|&v| !v.is_nan() && v >= 0.0)
    }
}
