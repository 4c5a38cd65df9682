//! Run tracking and cumulative billing
//!
//! Both live outside the cycle engine proper: they consume finished
//! [`CycleSummary`](crate::models::summary::CycleSummary) values and never
//! touch device state.

pub mod billing;
pub mod runs;

pub use billing::{
    BillingAggregator, BillingBucket, BillingOrigin, CombinedBilling, CumulativeBilling,
    JobBillingRecord,
};
pub use runs::{new_run_id, HistoryStats, RunEntry, RunStatus, RunTracker};
