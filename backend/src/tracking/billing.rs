//! Cumulative billing
//!
//! Folds completed cycles into two independent running totals, one for
//! user submissions and one for scripted scenarios, and keeps a billing
//! record per processed job.
//!
//! # Critical Invariants
//!
//! 1. **Bucket independence**: a cycle is folded into exactly one bucket,
//!    chosen by its [`JobSource`]
//! 2. **Completed cycles only**: faulted cycles never reach the aggregator
//! 3. **Equal apportioning**: each job of a cycle carries
//!    `transport_total / job_count` of the transporter distance and cost,
//!    independent of how long the job took

use crate::core::geometry::round6;
use crate::models::device::{Engraver, Transporter};
use crate::models::job::JobSource;
use crate::models::summary::CycleSummary;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Running totals for one job source
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BillingBucket {
    pub energy_kwh: f64,
    pub co2_g: f64,
    pub engraver_cost: f64,
    pub distance_m: f64,
    pub transport_cost: f64,
    pub total_cost: f64,
    pub job_ids: Vec<String>,
    pub last_updated: Option<DateTime<Utc>>,
}

impl BillingBucket {
    fn fold(&mut self, summary: &CycleSummary) {
        self.energy_kwh = round6(self.energy_kwh + summary.engraver_energy_kwh);
        self.co2_g = round6(self.co2_g + summary.engraver_co2_g);
        self.engraver_cost = round6(self.engraver_cost + summary.engraver_cost);
        self.distance_m = round6(self.distance_m + summary.billed_distance_m);
        self.transport_cost = round6(self.transport_cost + summary.transport_cost);
        self.total_cost = round6(self.engraver_cost + self.transport_cost);
        self.job_ids.extend(summary.job_ids.iter().cloned());
        self.last_updated = Some(Utc::now());
    }

    pub fn has_jobs(&self) -> bool {
        !self.job_ids.is_empty()
    }
}

/// The two cumulative buckets
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CumulativeBilling {
    pub user_jobs: BillingBucket,
    pub scenario_jobs: BillingBucket,
}

impl CumulativeBilling {
    pub fn bucket(&self, source: JobSource) -> &BillingBucket {
        if source.is_user() {
            &self.user_jobs
        } else {
            &self.scenario_jobs
        }
    }

    fn bucket_mut(&mut self, source: JobSource) -> &mut BillingBucket {
        if source.is_user() {
            &mut self.user_jobs
        } else {
            &mut self.scenario_jobs
        }
    }
}

/// Billing record for one processed job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobBillingRecord {
    pub order_id: String,
    pub text: String,
    pub letter_count: usize,
    pub site: String,
    pub source: JobSource,
    pub run_id: Option<String>,
    pub reference_id: String,
    pub currency: String,
    pub energy_kwh: f64,
    pub co2_g: f64,
    pub engraver_cost: f64,

    /// Equal share of the cycle's billed transporter distance
    pub transport_distance_share_m: f64,

    /// Equal share of the cycle's transporter cost
    pub transport_cost_share: f64,

    pub total_cost: f64,
    pub completed_at: DateTime<Utc>,
    pub recorded_at: DateTime<Utc>,
}

/// Where a [`CombinedBilling`] view was taken from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillingOrigin {
    UserJobs,
    ScenarioJobs,
    DeviceLedgers,
}

/// Single billing view for displays
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombinedBilling {
    pub origin: BillingOrigin,
    pub currency: String,
    pub energy_kwh: f64,
    pub co2_g: f64,
    pub engraver_cost: f64,
    pub distance_m: f64,
    pub transport_cost: f64,
    pub total_cost: f64,
    pub job_count: usize,
}

impl CombinedBilling {
    fn from_bucket(origin: BillingOrigin, bucket: &BillingBucket, currency: &str) -> Self {
        Self {
            origin,
            currency: currency.to_string(),
            energy_kwh: bucket.energy_kwh,
            co2_g: bucket.co2_g,
            engraver_cost: bucket.engraver_cost,
            distance_m: bucket.distance_m,
            transport_cost: bucket.transport_cost,
            total_cost: bucket.total_cost,
            job_count: bucket.job_ids.len(),
        }
    }

    /// View of the devices' current cycle ledgers
    pub fn from_ledgers(engraver: &Engraver, transporter: &Transporter) -> Self {
        let e = &engraver.billing;
        let t = &transporter.billing;
        Self {
            origin: BillingOrigin::DeviceLedgers,
            currency: e.currency.clone(),
            energy_kwh: round6(e.energy_consumed_kwh),
            co2_g: round6(e.co2_grams_emitted),
            engraver_cost: round6(e.cost_accrued),
            distance_m: round6(t.distance_traveled_m),
            transport_cost: round6(t.cost_accrued),
            total_cost: round6(e.cost_accrued + t.cost_accrued),
            job_count: 0,
        }
    }
}

/// Cumulative buckets plus per-job records
#[derive(Debug, Clone, Default)]
pub struct BillingAggregator {
    cumulative: CumulativeBilling,
    records: Vec<JobBillingRecord>,
}

impl BillingAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from stored state (checkpoint restore)
    pub fn from_parts(cumulative: CumulativeBilling, records: Vec<JobBillingRecord>) -> Self {
        Self {
            cumulative,
            records,
        }
    }

    /// Fold a completed cycle into the bucket for `source`
    pub fn record_cycle(&mut self, summary: &CycleSummary, source: JobSource, run_id: Option<&str>) {
        self.cumulative.bucket_mut(source).fold(summary);

        let count = summary.jobs.len().max(1) as f64;
        let distance_share = round6(summary.billed_distance_m / count);
        let cost_share = round6(summary.transport_cost / count);
        let recorded_at = Utc::now();

        for job in &summary.jobs {
            self.records.push(JobBillingRecord {
                order_id: job.order_id.clone(),
                text: job.text.clone(),
                letter_count: job.letter_count,
                site: summary.site.clone(),
                source,
                run_id: run_id.map(str::to_string),
                reference_id: summary.reference_id.clone(),
                currency: summary.currency.clone(),
                energy_kwh: job.billing.energy_kwh,
                co2_g: job.billing.co2_g,
                engraver_cost: job.billing.cost,
                transport_distance_share_m: distance_share,
                transport_cost_share: cost_share,
                total_cost: round6(job.billing.cost + cost_share),
                completed_at: job.completed_at,
                recorded_at,
            });
        }
    }

    pub fn cumulative(&self) -> &CumulativeBilling {
        &self.cumulative
    }

    /// Per-job records, optionally only those routed to `source`'s bucket
    pub fn records(&self, source: Option<JobSource>) -> Vec<JobBillingRecord> {
        self.records
            .iter()
            .filter(|r| source.map_or(true, |s| s.is_user() == r.source.is_user()))
            .cloned()
            .collect()
    }

    /// User bucket if it has jobs, else the scenario bucket if it has jobs
    pub fn combined(&self, currency: &str) -> Option<CombinedBilling> {
        if self.cumulative.user_jobs.has_jobs() {
            Some(CombinedBilling::from_bucket(
                BillingOrigin::UserJobs,
                &self.cumulative.user_jobs,
                currency,
            ))
        } else if self.cumulative.scenario_jobs.has_jobs() {
            Some(CombinedBilling::from_bucket(
                BillingOrigin::ScenarioJobs,
                &self.cumulative.scenario_jobs,
                currency,
            ))
        } else {
            None
        }
    }

    /// Zero both buckets and drop every record
    pub fn reset(&mut self) {
        self.cumulative = CumulativeBilling::default();
        self.records.clear();
    }
}
