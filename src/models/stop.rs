//! Bus stop and address types.

use serde::{Deserialize, Serialize};

/// A candidate bus stop (or the school, which is always stop 0).
///
/// Whether a stop is *required* or an *outlier* depends on the whole
/// instance and is derived by [`BusProblem`](super::BusProblem).
///
/// # Examples
///
/// ```
/// use school_bus_routing::models::Stop;
///
/// let school = Stop::new(53.48, -3.17, "School");
/// assert_eq!(school.label(), "School");
/// assert_eq!(school.x(), 53.48);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stop {
    x: f64,
    y: f64,
    label: String,
}

impl Stop {
    /// Creates a stop at the given coordinates.
    pub fn new(x: f64, y: f64, label: impl Into<String>) -> Self {
        Self {
            x,
            y,
            label: label.into(),
        }
    }

    /// X-coordinate (longitude).
    pub fn x(&self) -> f64 {
        self.x
    }

    /// Y-coordinate (latitude).
    pub fn y(&self) -> f64 {
        self.y
    }

    /// Human-readable name.
    pub fn label(&self) -> &str {
        &self.label
    }
}

/// A pick-up address: a location with a number of passengers.
///
/// # Examples
///
/// ```
/// use school_bus_routing::models::Address;
///
/// let a = Address::new(1.0, 2.0, 3, "4 Park Rd");
/// assert_eq!(a.passengers(), 3);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Address {
    x: f64,
    y: f64,
    passengers: i32,
    label: String,
}

impl Address {
    /// Creates an address.
    pub fn new(x: f64, y: f64, passengers: i32, label: impl Into<String>) -> Self {
        Self {
            x,
            y,
            passengers,
            label: label.into(),
        }
    }

    /// X-coordinate (longitude).
    pub fn x(&self) -> f64 {
        self.x
    }

    /// Y-coordinate (latitude).
    pub fn y(&self) -> f64 {
        self.y
    }

    /// Number of passengers living at this address.
    pub fn passengers(&self) -> i32 {
        self.passengers
    }

    /// Human-readable name.
    pub fn label(&self) -> &str {
        &self.label
    }
}
