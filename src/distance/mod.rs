//! Drive and walking time matrices.
//!
//! Provides a dense, row-major matrix used both for the square stop × stop
//! drive matrices and the rectangular address × stop walking matrices.

mod matrix;

pub use matrix::DistanceMatrix;
