//! Cycle summary
//!
//! Built once at the end of a successful cycle and never mutated afterwards.
//! Run tracking and billing aggregation both consume it.

use crate::sim::JobResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Totals and per-job details of one completed cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleSummary {
    /// Cycle sequence number
    pub cycle: u64,

    pub site: String,

    /// Processed order ids, in processing order
    pub job_ids: Vec<String>,

    pub jobs: Vec<JobResult>,

    /// Transporter distance on the two billed legs (metres)
    pub billed_distance_m: f64,

    pub transport_cost: f64,
    pub engraver_energy_kwh: f64,
    pub engraver_co2_g: f64,
    pub engraver_cost: f64,

    /// `engraver_cost + transport_cost`, rounded to 6 decimals
    pub combined_cost: f64,

    pub currency: String,

    /// `BATCH-<YYYYmmdd-HHMMSS>-<cycle>`
    pub reference_id: String,

    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,

    /// Simulated seconds spent in pacing points
    pub simulated_duration_s: f64,
}

impl CycleSummary {
    pub fn job_count(&self) -> usize {
        self.job_ids.len()
    }
}
