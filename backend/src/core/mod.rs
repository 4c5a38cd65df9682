//! Geometry and time primitives shared by both simulators

pub mod geometry;
pub mod time;
