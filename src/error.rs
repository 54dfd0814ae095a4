//! Error type shared by every stage of the optimizer.

use std::fmt;

/// Errors raised while building a problem instance or optimizing it.
///
/// Two classes exist. Invalid input (an unreachable address, mismatched
/// matrix sizes, a nonsensical parameter) is reported back to the caller.
/// [`RoutingError::Invariant`] signals an internal defect: an incremental
/// structure disagreed with the canonical routes, and no partial result of
/// the computation should be trusted.
///
/// # Examples
///
/// ```
/// use school_bus_routing::RoutingError;
///
/// let err = RoutingError::UnreachableAddress { address: 3, label: "12 Elm St".into() };
/// assert!(err.is_invalid_input());
/// assert!(err.to_string().contains("12 Elm St"));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum RoutingError {
    /// An address has no stop within its maximum walking distance.
    UnreachableAddress {
        /// Address index.
        address: usize,
        /// Address label.
        label: String,
    },
    /// A matrix or list does not have the size implied by the instance.
    DimensionMismatch {
        /// Which structure is malformed.
        what: &'static str,
        /// Expected length.
        expected: usize,
        /// Actual length.
        found: usize,
    },
    /// An index in the input refers to a stop or address that does not exist.
    IndexOutOfRange {
        /// Which index is out of range.
        what: &'static str,
        /// Offending index.
        index: usize,
        /// Number of valid entries.
        len: usize,
    },
    /// A configuration value is outside its valid domain.
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Why the value was rejected.
        reason: String,
    },
    /// Internal invariant violated (boarding ledger underflow, no spare
    /// capacity left while packing, and so on).
    Invariant(String),
}

impl RoutingError {
    /// Returns `true` for errors caused by the caller's input or configuration.
    pub fn is_invalid_input(&self) -> bool {
        !matches!(self, RoutingError::Invariant(_))
    }

    pub(crate) fn invariant(msg: impl Into<String>) -> Self {
        RoutingError::Invariant(msg.into())
    }

    pub(crate) fn parameter(name: &'static str, reason: impl Into<String>) -> Self {
        RoutingError::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for RoutingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoutingError::UnreachableAddress { address, label } => write!(
                f,
                "address {address} ({label}) has no bus stop within walking distance"
            ),
            RoutingError::DimensionMismatch {
                what,
                expected,
                found,
            } => write!(f, "{what}: expected {expected} entries, found {found}"),
            RoutingError::IndexOutOfRange { what, index, len } => {
                write!(f, "{what} index {index} out of range (len {len})")
            }
            RoutingError::InvalidParameter { name, reason } => {
                write!(f, "invalid parameter `{name}`: {reason}")
            }
            RoutingError::Invariant(msg) => write!(f, "internal invariant violated: {msg}"),
        }
    }
}

impl std::error::Error for RoutingError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        assert!(RoutingError::parameter("capacity", "must be positive").is_invalid_input());
        assert!(RoutingError::DimensionMismatch {
            what: "drive time matrix",
            expected: 9,
            found: 4
        }
        .is_invalid_input());
        assert!(!RoutingError::invariant("ledger underflow").is_invalid_input());
    }

    #[test]
    fn test_display() {
        let err = RoutingError::IndexOutOfRange {
            what: "walk link stop",
            index: 7,
            len: 4,
        };
        assert_eq!(err.to_string(), "walk link stop index 7 out of range (len 4)");
        let err = RoutingError::invariant("boom");
        assert_eq!(err.to_string(), "internal invariant violated: boom");
    }

    #[test]
    fn test_is_std_error() {
        fn takes_error(_: &dyn std::error::Error) {}
        takes_error(&RoutingError::invariant("x"));
    }
}
