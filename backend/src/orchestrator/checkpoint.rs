//! Checkpoint - Save/Load Cell State
//!
//! Captures everything a restarted process needs to carry on where the
//! previous one stopped: configuration, devices, queue, billing and run
//! history. The library performs no I/O; callers persist the JSON.
//!
//! # Critical Invariants
//!
//! - **Config Matching**: a snapshot is only accepted if its stored hash
//!   matches its configuration
//! - **Queue Integrity**: every queued job targets a site of the snapshot's
//!   coordinate table
//! - **No Phantom Runs**: runs still `running` at snapshot time can never
//!   finish, so restore marks them `error`

use crate::config::CellConfig;
use crate::error::SimulationError;
use crate::models::device::{Engraver, Transporter, ENGRAVER_ID, TRANSPORTER_ID};
use crate::models::job::Job;
use crate::models::queue::JobQueue;
use crate::orchestrator::engine::Orchestrator;
use crate::tracking::{BillingAggregator, CumulativeBilling, JobBillingRecord, RunEntry, RunTracker};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::atomic::Ordering;

/// Reason recorded on runs that a restore finds still running
pub const INTERRUPTED: &str = "interrupted before completion";

// ============================================================================
// Snapshot Structures
// ============================================================================

/// Complete cell state snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub config: CellConfig,

    /// SHA256 hash of `config` (for validation)
    pub config_hash: String,

    pub engraver: Engraver,
    pub transporter: Transporter,

    /// Queued jobs in FIFO order
    pub queue: Vec<Job>,

    pub cumulative_billing: CumulativeBilling,
    pub job_records: Vec<JobBillingRecord>,

    /// Run entries in creation order
    pub runs: Vec<RunEntry>,

    /// Last cycle sequence number handed out
    pub cycle_seq: u64,

    pub taken_at: DateTime<Utc>,
}

impl StateSnapshot {
    pub fn to_json(&self) -> Result<String, SimulationError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, SimulationError> {
        Ok(serde_json::from_str(json)?)
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// SHA-256 hex digest of a configuration's compact JSON
///
/// Struct fields serialize in declaration order and the coordinate table
/// is a `BTreeMap`, so equal configurations always hash alike.
pub fn compute_config_hash<T: Serialize>(config: &T) -> Result<String, SimulationError> {
    let json = serde_json::to_string(config).map_err(|e| {
        SimulationError::SerializationError(format!("Config serialization failed: {}", e))
    })?;
    Ok(format!("{:x}", Sha256::digest(json.as_bytes())))
}

// ============================================================================
// Validation Functions
// ============================================================================

/// Validate snapshot integrity
///
/// Checks the config hash, the configuration itself, device identities
/// and that every queued job targets a known site.
pub fn validate_snapshot(snapshot: &StateSnapshot) -> Result<(), SimulationError> {
    let actual = compute_config_hash(&snapshot.config)?;
    if actual != snapshot.config_hash {
        return Err(SimulationError::StateValidationError(format!(
            "Config hash mismatch: snapshot says {}, config hashes to {}",
            snapshot.config_hash, actual
        )));
    }

    snapshot.config.validate().map_err(|e| {
        SimulationError::StateValidationError(format!("Snapshot config invalid: {}", e))
    })?;

    if snapshot.engraver.id != ENGRAVER_ID || snapshot.transporter.id != TRANSPORTER_ID {
        return Err(SimulationError::StateValidationError(format!(
            "Unexpected device ids: {} / {}",
            snapshot.engraver.id, snapshot.transporter.id
        )));
    }

    if let Some(job) = snapshot
        .queue
        .iter()
        .find(|job| !snapshot.config.coords.contains(job.target_site()))
    {
        return Err(SimulationError::StateValidationError(format!(
            "Queued job {} targets unknown site {}",
            job.order_id(),
            job.target_site()
        )));
    }

    Ok(())
}

// ============================================================================
// Orchestrator Integration
// ============================================================================

impl Orchestrator {
    /// Capture the current state
    ///
    /// Taken between cycles this is exact. Taken during a cycle each
    /// component is consistent at a tick boundary, and the running cycle's
    /// run entry is captured as `running`.
    pub fn snapshot(&self) -> Result<StateSnapshot, SimulationError> {
        let config = self.config();
        let config_hash = compute_config_hash(&config)?;
        let (cumulative_billing, job_records) = {
            let billing = self.shared.billing.lock();
            (billing.cumulative().clone(), billing.records(None))
        };

        Ok(StateSnapshot {
            config,
            config_hash,
            engraver: self.engraver(),
            transporter: self.transporter(),
            queue: self.queue(),
            cumulative_billing,
            job_records,
            runs: self.shared.runs.lock().entries().to_vec(),
            cycle_seq: self.shared.cycle_seq.load(Ordering::SeqCst),
            taken_at: Utc::now(),
        })
    }

    /// Replace the current state with `snapshot`
    ///
    /// Waits for a running cycle to finish. Returns how many runs were
    /// marked as interrupted.
    ///
    /// # Errors
    ///
    /// `StateValidationError` if the snapshot fails [`validate_snapshot`];
    /// the current state is left untouched.
    pub async fn restore(&self, snapshot: StateSnapshot) -> Result<usize, SimulationError> {
        validate_snapshot(&snapshot)?;
        let _cycle = self.shared.cycle_lock.lock().await;

        let mut runs = RunTracker::from_entries(snapshot.runs);
        let interrupted = runs.interrupt_running(INTERRUPTED);

        *self.shared.config.write() = snapshot.config;
        *self.shared.engraver.write() = snapshot.engraver;
        *self.shared.transporter.write() = snapshot.transporter;
        *self.shared.queue.lock() = JobQueue::from_jobs(snapshot.queue);
        *self.shared.billing.lock() =
            BillingAggregator::from_parts(snapshot.cumulative_billing, snapshot.job_records);
        *self.shared.runs.lock() = runs;
        self.shared.events.lock().clear();
        self.shared.window.set(false);
        self.shared
            .cycle_seq
            .fetch_max(snapshot.cycle_seq, Ordering::SeqCst);

        log::info!(
            "restored snapshot taken at {} ({} run(s) interrupted)",
            snapshot.taken_at,
            interrupted
        );
        Ok(interrupted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CoordinateTable;
    use crate::core::geometry::Point;
    use crate::models::job::JobSource;
    use crate::tracking::RunStatus;

    #[test]
    fn test_compute_config_hash_deterministic() {
        let hash1 = compute_config_hash(&CellConfig::default()).unwrap();
        let hash2 = compute_config_hash(&CellConfig::default()).unwrap();
        assert_eq!(hash1, hash2, "Same config should produce same hash");
        assert_eq!(hash1.len(), 64);
    }

    #[test]
    fn test_config_hash_ignores_site_insertion_order() {
        let mut forward = CellConfig::default();
        forward.coords = CoordinateTable::new();
        forward.coords.insert("HOME", Point::ORIGIN);
        forward.coords.insert("DOCK", Point::new(5.0, 0.0));
        forward.coords.insert("JOB_POS1", Point::new(12.0, 8.0));

        let mut reversed = forward.clone();
        reversed.coords = CoordinateTable::new();
        reversed.coords.insert("JOB_POS1", Point::new(12.0, 8.0));
        reversed.coords.insert("DOCK", Point::new(5.0, 0.0));
        reversed.coords.insert("HOME", Point::ORIGIN);

        assert_eq!(
            compute_config_hash(&forward).unwrap(),
            compute_config_hash(&reversed).unwrap()
        );
    }

    #[test]
    fn test_compute_config_hash_different_for_different_configs() {
        let mut other = CellConfig::default();
        other.transporter.cost_per_meter = 0.03;

        assert_ne!(
            compute_config_hash(&CellConfig::default()).unwrap(),
            compute_config_hash(&other).unwrap(),
            "Different configs should produce different hashes"
        );
    }

    #[tokio::test]
    async fn test_tampered_config_is_rejected() {
        let cell = Orchestrator::new(CellConfig::default()).unwrap();
        let mut snapshot = cell.snapshot().unwrap();
        snapshot.config.engraver.cost_per_energy_unit = 9.0;

        let err = cell.restore(snapshot).await.unwrap_err();
        assert!(matches!(err, SimulationError::StateValidationError(_)));
    }

    #[tokio::test]
    async fn test_queued_job_for_unknown_site_is_rejected() {
        let cell = Orchestrator::new(CellConfig::default()).unwrap();
        let mut snapshot = cell.snapshot().unwrap();
        snapshot.queue.push(Job::new("E-1", "A", "NOWHERE"));

        assert!(validate_snapshot(&snapshot).is_err());
    }

    #[tokio::test]
    async fn test_restore_interrupts_running_runs() {
        let cell = Orchestrator::new(CellConfig::default()).unwrap();
        cell.enqueue(Job::new("E-1", "HI", "JOB_POS2")).unwrap();
        let planned = cell.plan_run("run", "JOB_POS2", "JOB_POS2", None, JobSource::Direct);

        let snapshot = cell.snapshot().unwrap();
        let json = snapshot.to_json().unwrap();

        let fresh = Orchestrator::new(CellConfig::default()).unwrap();
        let interrupted = fresh
            .restore(StateSnapshot::from_json(&json).unwrap())
            .await
            .unwrap();

        assert_eq!(interrupted, 1);
        let entry = fresh.run(&planned.run_id).unwrap();
        assert_eq!(entry.status, RunStatus::Error);
        assert_eq!(entry.error.as_deref(), Some(INTERRUPTED));
        assert_eq!(fresh.queue_len(), 1);
    }
}
