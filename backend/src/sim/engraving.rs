//! Engraving simulator
//!
//! A job takes `max(1, letters * seconds_per_letter)` simulated seconds,
//! split evenly over `ceil(100 / progress_step)` progress increments so the
//! increments always add up to the full job duration.
//!
//! # Billing Formula
//!
//! ```text
//! energy = base_idle_energy + laser_rate * duration
//! co2    = energy * emission_factor
//! cost   = energy * cost_per_energy_unit
//! ```
//!
//! Each figure is rounded to 6 decimals per job and then added to the
//! engraver's ledger. The simulator is the only writer of that ledger, so a
//! job is counted exactly once.

use super::TickContext;
use crate::config::EngraverConfig;
use crate::core::geometry::round6;
use crate::core::time::secs;
use crate::error::SimulationError;
use crate::models::device::{BillingStatus, Engraver, OperationMode, OrderState};
use crate::models::event::Event;
use crate::models::job::Job;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// Per-job billing figures, each rounded to 6 decimals
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JobBilling {
    pub energy_kwh: f64,
    pub co2_g: f64,
    pub cost: f64,
}

/// Price one job of `duration_s` seconds
///
/// # Example
/// ```
/// use cell_simulator_core_rs::sim::compute_job_billing;
///
/// // 0.1 kWh base + 0.01 kWh/s over one second, 500 g/kWh, 0.5 per kWh
/// let billing = compute_job_billing(1.0, 0.1, 0.01, 500.0, 0.5);
/// assert_eq!(billing.energy_kwh, 0.11);
/// assert_eq!(billing.co2_g, 55.0);
/// assert_eq!(billing.cost, 0.055);
/// ```
pub fn compute_job_billing(
    duration_s: f64,
    base_energy_kwh: f64,
    laser_rate_kwh_per_s: f64,
    emission_factor: f64,
    cost_per_energy_unit: f64,
) -> JobBilling {
    let energy = base_energy_kwh + laser_rate_kwh_per_s * duration_s;
    JobBilling {
        energy_kwh: round6(energy),
        co2_g: round6(energy * emission_factor),
        cost: round6(energy * cost_per_energy_unit),
    }
}

/// Result of one engraving job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobResult {
    pub order_id: String,
    pub text: String,
    pub letter_count: usize,

    /// Simulated job duration (seconds)
    pub duration_s: f64,

    pub billing: JobBilling,
    pub completed_at: DateTime<Utc>,
}

/// Engraver totals at cycle close, rounded to 6 decimals
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct EngraverTotals {
    pub energy_kwh: f64,
    pub co2_g: f64,
    pub cost: f64,
}

/// Laser engraver job runner
#[derive(Debug, Clone)]
pub struct EngravingSimulator {
    config: EngraverConfig,
    progress_step: u32,
}

impl EngravingSimulator {
    pub fn new(config: EngraverConfig, progress_step: u32) -> Self {
        Self {
            config,
            progress_step: progress_step.clamp(1, 100),
        }
    }

    /// Simulated seconds needed to engrave `letters` characters
    pub fn job_duration_s(&self, letters: usize) -> f64 {
        (letters as f64 * self.config.seconds_per_letter).max(1.0)
    }

    /// Number of progress increments per job
    pub fn increments(&self) -> u32 {
        (100 + self.progress_step - 1) / self.progress_step
    }

    /// Zero the per-cycle accruals and stamp the cycle's rates
    pub fn open_ledger(device: &RwLock<Engraver>, currency: &str, config: &EngraverConfig) {
        let mut engraver = device.write();
        engraver.billing.reset_accruals();
        engraver.billing.currency = currency.to_string();
        engraver.billing.emission_factor = config.emission_factor_g_per_kwh;
        engraver.billing.cost_per_energy_unit = config.cost_per_energy_unit;
    }

    /// Round the ledger and stamp the cycle reference
    pub fn close_ledger(device: &RwLock<Engraver>, reference_id: &str) -> EngraverTotals {
        let mut engraver = device.write();
        let now = Utc::now();
        let ledger = &mut engraver.billing;
        ledger.energy_consumed_kwh = round6(ledger.energy_consumed_kwh);
        ledger.co2_grams_emitted = round6(ledger.co2_grams_emitted);
        ledger.cost_accrued = round6(ledger.cost_accrued);
        ledger.reference_id = Some(reference_id.to_string());
        ledger.status = BillingStatus::Open;
        ledger.last_billed_at = Some(now);
        ledger.last_updated = now;

        EngraverTotals {
            energy_kwh: ledger.energy_consumed_kwh,
            co2_g: ledger.co2_grams_emitted,
            cost: ledger.cost_accrued,
        }
    }

    /// Engrave one job and add its billing to the engraver ledger
    ///
    /// The ledger's stamped rates price the job. The order stays `Created`
    /// while the laser runs and becomes `Done` on completion.
    ///
    /// # Errors
    ///
    /// `SimulationFault` when pacing fails. The order is marked `Error`,
    /// the device is left in `Error` mode and nothing is billed for the
    /// interrupted job.
    pub async fn run_job(
        &self,
        device: &RwLock<Engraver>,
        job: &Job,
        ctx: &TickContext<'_>,
    ) -> Result<JobResult, SimulationError> {
        let result = self.engrave(device, job, ctx).await;
        if result.is_err() {
            let mut engraver = device.write();
            engraver.operational.status.mode = OperationMode::Error;
            engraver.operational.order.state = OrderState::Error;
            engraver.operational.order.last_changed_at = Utc::now();
        }
        result
    }

    async fn engrave(
        &self,
        device: &RwLock<Engraver>,
        job: &Job,
        ctx: &TickContext<'_>,
    ) -> Result<JobResult, SimulationError> {
        let letter_count = job.letter_count();
        let duration_s = self.job_duration_s(letter_count);
        let increments = self.increments();
        let dt = secs(duration_s / f64::from(increments))?;

        {
            let mut engraver = device.write();
            let now = Utc::now();
            let order = &mut engraver.operational.order;
            order.order_id = job.order_id().to_string();
            order.text = Some(job.text().to_string());
            order.state = OrderState::Created;
            order.last_changed_at = now;

            let status = &mut engraver.operational.status;
            status.mode = OperationMode::Running;
            status.progress_percent = 0;
        }

        log::debug!(
            "cycle {}: engraving {} ({} letters, {:.2}s)",
            ctx.cycle,
            job.order_id(),
            letter_count,
            duration_s
        );

        for i in 1..=increments {
            let progress = {
                let mut engraver = device.write();
                let status = &mut engraver.operational.status;
                status.bump_heartbeat();
                status.progress_percent = (i * self.progress_step).min(100) as u8;
                status.progress_percent
            };

            ctx.record(Event::EngravingTick {
                cycle: ctx.cycle,
                order_id: job.order_id().to_string(),
                progress,
            });

            ctx.pacer.pace(dt).await?;
        }

        let (billing, completed_at) = {
            let mut engraver = device.write();
            let now = Utc::now();
            let billing = compute_job_billing(
                duration_s,
                self.config.base_idle_energy_kwh,
                self.config.laser_energy_rate_kwh_per_s,
                engraver.billing.emission_factor,
                engraver.billing.cost_per_energy_unit,
            );

            engraver.operational.order.state = OrderState::Done;
            engraver.operational.order.last_changed_at = now;
            engraver.operational.status.mode = OperationMode::Idle;
            engraver.operational.status.progress_percent = 100;

            let ledger = &mut engraver.billing;
            ledger.energy_consumed_kwh += billing.energy_kwh;
            ledger.co2_grams_emitted += billing.co2_g;
            ledger.cost_accrued += billing.cost;
            ledger.status = BillingStatus::Open;
            ledger.reference_id = Some(job.order_id().to_string());
            ledger.last_billed_at = Some(now);
            ledger.last_updated = now;

            (billing, now)
        };

        ctx.record(Event::JobCompleted {
            cycle: ctx.cycle,
            order_id: job.order_id().to_string(),
            energy_kwh: billing.energy_kwh,
            cost: billing.cost,
        });

        Ok(JobResult {
            order_id: job.order_id().to_string(),
            text: job.text().to_string(),
            letter_count,
            duration_s,
            billing,
            completed_at,
        })
    }
}
