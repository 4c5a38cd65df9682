//! Geometry primitives for the 2-D cell floor
//!
//! Distances are metres on a flat Cartesian plane. The only motion
//! primitive is a straight-line step towards a target that never
//! overshoots: the final step of a leg is clipped so the remaining
//! distance is driven to exactly zero.

use serde::{Deserialize, Serialize};

/// A point on the cell floor (metres)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const ORIGIN: Point = Point { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Both coordinates are finite numbers
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl From<(f64, f64)> for Point {
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y }
    }
}

/// Euclidean distance between two points
///
/// # Example
/// ```
/// use cell_simulator_core_rs::core::geometry::{distance, Point};
///
/// let d = distance(Point::new(0.0, 0.0), Point::new(3.0, 4.0));
/// assert_eq!(d, 5.0);
/// ```
pub fn distance(a: Point, b: Point) -> f64 {
    (b.x - a.x).hypot(b.y - a.y)
}

/// Result of a single step towards a target
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Step {
    /// Position after the step
    pub position: Point,

    /// Distance actually covered by this step
    pub covered: f64,

    /// Heading of travel in degrees, `None` when nothing moved
    pub heading_deg: Option<f64>,

    /// Target reached (remaining distance is exactly zero)
    pub arrived: bool,
}

/// Residual distance (metres) below which a step counts as reaching the target
pub const ARRIVAL_TOLERANCE: f64 = 1e-9;

/// Advance `from` towards `target` by at most `max_step`
///
/// When the remaining distance is within `max_step` (plus
/// [`ARRIVAL_TOLERANCE`] of accumulated floating point drift) the position
/// snaps onto the target, so a leg of length `n * max_step` always takes
/// exactly `n` steps and never leaves a residual distance behind.
///
/// # Example
/// ```
/// use cell_simulator_core_rs::core::geometry::{step_towards, Point};
///
/// let step = step_towards(Point::new(0.0, 0.0), Point::new(1.0, 0.0), 0.4);
/// assert!(!step.arrived);
/// assert!((step.position.x - 0.4).abs() < 1e-12);
///
/// let last = step_towards(Point::new(0.8, 0.0), Point::new(1.0, 0.0), 0.4);
/// assert!(last.arrived);
/// assert_eq!(last.position, Point::new(1.0, 0.0));
/// ```
pub fn step_towards(from: Point, target: Point, max_step: f64) -> Step {
    let dx = target.x - from.x;
    let dy = target.y - from.y;
    let remaining = dx.hypot(dy);

    if remaining == 0.0 {
        return Step {
            position: target,
            covered: 0.0,
            heading_deg: None,
            arrived: true,
        };
    }

    let heading_deg = Some(dy.atan2(dx).to_degrees());

    if remaining - max_step <= ARRIVAL_TOLERANCE {
        return Step {
            position: target,
            covered: remaining,
            heading_deg,
            arrived: true,
        };
    }

    let ux = dx / remaining;
    let uy = dy / remaining;
    Step {
        position: Point::new(from.x + ux * max_step, from.y + uy * max_step),
        covered: max_step,
        heading_deg,
        arrived: false,
    }
}

/// Round to 6 decimal places (billing precision)
pub fn round6(value: f64) -> f64 {
    (value * 1_000_000.0).round() / 1_000_000.0
}
