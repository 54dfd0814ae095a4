//! Route evaluation and solution consistency checking.
//!
//! - [`RouteEvaluator`] computes route lengths and walking cost and rebuilds
//!   every derived field of a solution from its routes
//! - [`validate`] recomputes everything independently and reports the
//!   differences as [`Violation`](crate::models::Violation)s

mod evaluator;
mod validator;

pub use evaluator::RouteEvaluator;
pub use validator::validate;
