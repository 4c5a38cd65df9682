//! Domain models for the production cell

pub mod device;
pub mod event;
pub mod job;
pub mod queue;
pub mod summary;

// Re-exports
pub use device::{Engraver, OperationMode, OrderState, Transporter};
pub use event::{Event, EventLog, Leg};
pub use job::{Job, JobSource};
pub use queue::JobQueue;
pub use summary::CycleSummary;
