//! Orchestrator - cycle engine and its façade
//!
//! See `engine.rs` for the five-leg cycle, `checkpoint.rs` for snapshots
//! and `scenarios.rs` for the scripted demonstrations.

pub mod checkpoint;
pub mod engine;
pub mod scenarios;

// Re-export main types for convenience
pub use engine::{CellStatus, CycleTicket, Orchestrator, ScenarioTicket};

// Re-export checkpoint types
pub use checkpoint::{compute_config_hash, validate_snapshot, StateSnapshot};
