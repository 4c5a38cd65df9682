//! Production Cell Simulator Core - Rust Engine
//!
//! Simulates a two-asset production cell: a stationary laser engraver and
//! a mobile transporter (AGV) that together fulfil text-engraving orders
//! and accrue usage-based billing.
//!
//! # Architecture
//!
//! - **core**: Geometry primitives, simulated clock and pacing
//! - **models**: Domain types (Job, JobQueue, devices, events, summaries)
//! - **sim**: Motion and engraving simulators
//! - **orchestrator**: Five-leg cycle engine, checkpoints, scenarios
//! - **tracking**: Run history and cumulative billing
//! - **composer**: Direct and batch submissions
//!
//! # Critical Invariants
//!
//! 1. At most one cycle runs at a time, whatever its site
//! 2. Transporter distance is billed only on DOCK → site → DOCK legs
//! 3. Device ledgers are cycle-scoped; cumulative totals live in tracking
//! 4. The core performs no file or network I/O

// Module declarations
pub mod composer;
pub mod config;
pub mod core;
pub mod error;
pub mod models;
pub mod orchestrator;
pub mod sim;
pub mod tracking;

// Re-exports for convenience
pub use composer::Submission;
pub use config::{CellConfig, ConfigUpdate, CoordinateTable, EngraverConfig, TransporterConfig};
pub use core::geometry::Point;
pub use core::time::{Pacer, TickSender};
pub use error::SimulationError;
pub use models::{
    device::{Engraver, OperationMode, OrderState, Transporter},
    event::{Event, EventLog, Leg},
    job::{Job, JobSource},
    queue::JobQueue,
    summary::CycleSummary,
};
pub use orchestrator::{CellStatus, CycleTicket, Orchestrator, ScenarioTicket, StateSnapshot};
pub use tracking::{
    BillingOrigin, CombinedBilling, CumulativeBilling, HistoryStats, JobBillingRecord, RunEntry,
    RunStatus,
};
