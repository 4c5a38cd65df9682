//! Run tracking
//!
//! Every tracked cycle invocation gets a [`RunEntry`]. The entry is created
//! in `running` state before the cycle lock is requested, so a caller can
//! poll it by id straight away, and moves to exactly one terminal state
//! once the cycle finishes:
//!
//! ```text
//! running ──► completed   (summary attached)
//!         ├─► no_jobs     (nothing queued for the site at execution time)
//!         └─► error       (fault message attached)
//! ```
//!
//! Entries are only removed by [`RunTracker::clear`].

use crate::config::CellConfig;
use crate::core::geometry::round6;
use crate::error::SimulationError;
use crate::models::job::JobSource;
use crate::models::summary::CycleSummary;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle status of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Running,
    Completed,
    Error,
    NoJobs,
}

impl RunStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, RunStatus::Running)
    }
}

/// Lifecycle record of one tracked cycle invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunEntry {
    pub run_id: String,
    pub site: String,
    pub source: JobSource,
    pub status: RunStatus,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,

    /// Order ids processed by the cycle (empty until completion)
    pub job_ids: Vec<String>,

    pub cycle_summary: Option<CycleSummary>,

    /// Configuration in force when the run was requested
    pub config_snapshot: CellConfig,

    pub error: Option<String>,
}

/// Aggregates over completed runs
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct HistoryStats {
    pub total_runs: usize,
    pub completed_runs: usize,
    pub error_runs: usize,
    pub total_jobs: usize,
    pub total_energy_kwh: f64,
    pub total_co2_g: f64,
    pub total_cost: f64,
    pub avg_cost_per_run: f64,
}

#[derive(Serialize)]
struct HistoryExport<'a> {
    exported_at: DateTime<Utc>,
    total_runs: usize,
    runs: Vec<&'a RunEntry>,
}

/// Build a run id: `<kind>_<YYYYmmdd_HHMMSS>_<qualifier>_<8 hex chars>`
///
/// # Example
/// ```
/// use cell_simulator_core_rs::tracking::new_run_id;
///
/// let id = new_run_id("run", "JOB_POS1");
/// assert!(id.starts_with("run_"));
/// assert!(id.contains("_JOB_POS1_"));
/// ```
pub fn new_run_id(kind: &str, qualifier: &str) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!(
        "{}_{}_{}_{}",
        kind,
        Utc::now().format("%Y%m%d_%H%M%S"),
        qualifier,
        &suffix[..8]
    )
}

/// Registry of run entries in creation order
#[derive(Debug, Clone, Default)]
pub struct RunTracker {
    entries: Vec<RunEntry>,
}

impl RunTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from stored entries (checkpoint restore)
    pub fn from_entries(entries: Vec<RunEntry>) -> Self {
        Self { entries }
    }

    /// Register a new run in `running` state
    pub fn start(
        &mut self,
        run_id: impl Into<String>,
        site: impl Into<String>,
        source: JobSource,
        config_snapshot: CellConfig,
    ) -> RunEntry {
        let entry = RunEntry {
            run_id: run_id.into(),
            site: site.into(),
            source,
            status: RunStatus::Running,
            started_at: Utc::now(),
            ended_at: None,
            job_ids: Vec::new(),
            cycle_summary: None,
            config_snapshot,
            error: None,
        };
        self.entries.push(entry.clone());
        entry
    }

    pub fn get(&self, run_id: &str) -> Option<&RunEntry> {
        self.entries.iter().find(|e| e.run_id == run_id)
    }

    fn get_mut(&mut self, run_id: &str) -> Option<&mut RunEntry> {
        self.entries.iter_mut().find(|e| e.run_id == run_id)
    }

    /// Move a run to `completed` with its summary
    ///
    /// Returns `None` if the run was cleared while the cycle ran.
    pub fn complete(&mut self, run_id: &str, summary: CycleSummary) -> Option<RunEntry> {
        let entry = self.get_mut(run_id)?;
        entry.status = RunStatus::Completed;
        entry.ended_at = Some(summary.ended_at);
        entry.job_ids = summary.job_ids.clone();
        entry.cycle_summary = Some(summary);
        Some(entry.clone())
    }

    pub fn mark_no_jobs(&mut self, run_id: &str) -> Option<RunEntry> {
        let entry = self.get_mut(run_id)?;
        entry.status = RunStatus::NoJobs;
        entry.ended_at = Some(Utc::now());
        Some(entry.clone())
    }

    pub fn fail(&mut self, run_id: &str, error: impl Into<String>) -> Option<RunEntry> {
        let entry = self.get_mut(run_id)?;
        entry.status = RunStatus::Error;
        entry.ended_at = Some(Utc::now());
        entry.error = Some(error.into());
        Some(entry.clone())
    }

    /// Fail every run still marked `running`; returns how many were changed
    pub fn interrupt_running(&mut self, reason: &str) -> usize {
        let now = Utc::now();
        let mut count = 0;
        for entry in self
            .entries
            .iter_mut()
            .filter(|e| e.status == RunStatus::Running)
        {
            entry.status = RunStatus::Error;
            entry.ended_at = Some(now);
            entry.error = Some(reason.to_string());
            count += 1;
        }
        count
    }

    /// Entries newest first, at most `limit` of them (`None` = all)
    pub fn history(&self, limit: Option<usize>) -> Vec<RunEntry> {
        self.entries
            .iter()
            .rev()
            .take(limit.unwrap_or(usize::MAX))
            .cloned()
            .collect()
    }

    /// Entries in creation order
    pub fn entries(&self) -> &[RunEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every entry; returns how many were removed
    pub fn clear(&mut self) -> usize {
        let count = self.entries.len();
        self.entries.clear();
        count
    }

    pub fn stats(&self) -> HistoryStats {
        let completed: Vec<&CycleSummary> = self
            .entries
            .iter()
            .filter(|e| e.status == RunStatus::Completed)
            .filter_map(|e| e.cycle_summary.as_ref())
            .collect();

        let total_energy_kwh: f64 = completed.iter().map(|s| s.engraver_energy_kwh).sum();
        let total_co2_g: f64 = completed.iter().map(|s| s.engraver_co2_g).sum();
        let total_cost: f64 = completed.iter().map(|s| s.combined_cost).sum();
        let avg_cost_per_run = if completed.is_empty() {
            0.0
        } else {
            total_cost / completed.len() as f64
        };

        HistoryStats {
            total_runs: self.entries.len(),
            completed_runs: completed.len(),
            error_runs: self
                .entries
                .iter()
                .filter(|e| e.status == RunStatus::Error)
                .count(),
            total_jobs: completed.iter().map(|s| s.job_count()).sum(),
            total_energy_kwh: round6(total_energy_kwh),
            total_co2_g: round6(total_co2_g),
            total_cost: round6(total_cost),
            avg_cost_per_run: round6(avg_cost_per_run),
        }
    }

    /// Pretty-printed JSON export of the newest `limit` entries
    pub fn export_json(&self, limit: Option<usize>) -> Result<String, SimulationError> {
        let runs: Vec<&RunEntry> = self
            .entries
            .iter()
            .rev()
            .take(limit.unwrap_or(usize::MAX))
            .collect();
        let export = HistoryExport {
            exported_at: Utc::now(),
            total_runs: runs.len(),
            runs,
        };
        Ok(serde_json::to_string_pretty(&export)?)
    }
}
