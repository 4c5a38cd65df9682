//! Orchestrator Engine
//!
//! Turns queued jobs into a time-stepped production cycle for one site and
//! wraps every tracked cycle in a run entry.
//!
//! # Five-Leg Cycle
//!
//! ```text
//! 1. HOME → DOCK    transporter, not billed
//! 2. DOCK → site    transporter, billed
//! 3. engrave every job of the batch in FIFO order, in place
//! 4. site → DOCK    transporter, billed
//! 5. DOCK → HOME    transporter, not billed
//! ```
//!
//! No leg is skipped, even when the transporter already stands on its
//! target.
//!
//! # Critical Invariants
//!
//! 1. **At most one cycle**: the cycle lock is held across all five legs,
//!    for every site, so ticks of two cycles never interleave
//! 2. **No-jobs before mutation**: a cycle with nothing queued for its site
//!    returns `NoMatchingJobs` before touching a device, ledger or the queue
//! 3. **Cycle-scoped ledgers**: device ledgers are zeroed when a cycle opens;
//!    cumulative totals live only in the billing aggregator
//! 4. **No rollback**: a fault leaves accrued ledger values in place and the
//!    aggregator untouched
//!
//! # Example
//!
//! ```rust
//! use cell_simulator_core_rs::{CellConfig, Job, JobSource, Orchestrator, RunStatus};
//!
//! let runtime = tokio::runtime::Builder::new_current_thread()
//!     .enable_all()
//!     .build()
//!     .unwrap();
//!
//! runtime.block_on(async {
//!     let cell = Orchestrator::new(CellConfig::default()).unwrap();
//!     cell.enqueue(Job::new("E-1001", "HELLO", "JOB_POS1")).unwrap();
//!
//!     let ticket = cell.trigger_cycle("JOB_POS1", None, JobSource::Direct).unwrap();
//!     let entry = ticket.wait().await.unwrap();
//!
//!     assert_eq!(entry.status, RunStatus::Completed);
//!     assert_eq!(cell.queue_len(), 0);
//! });
//! ```

use crate::config::{CellConfig, ConfigUpdate, DOCK, HOME};
use crate::core::geometry::{round6, Point};
use crate::core::time::Pacer;
use crate::error::SimulationError;
use crate::models::device::{
    Engraver, OperationMode, Pose, Transporter, ENGRAVER_ID, TRANSPORTER_ID,
};
use crate::models::event::{Event, EventLog, Leg};
use crate::models::job::{Job, JobSource};
use crate::models::queue::JobQueue;
use crate::models::summary::CycleSummary;
use crate::sim::{BillingWindow, EngravingSimulator, JobResult, MotionSimulator, TickContext};
use crate::tracking::{
    new_run_id, BillingAggregator, CombinedBilling, CumulativeBilling, HistoryStats,
    JobBillingRecord, RunEntry, RunStatus, RunTracker,
};
use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;

// ============================================================================
// Shared State
// ============================================================================

/// State behind an [`Orchestrator`] handle
///
/// Everything except the cycle lock is behind a `parking_lot` lock that is
/// held for one short critical section and never across an `.await`.
pub(crate) struct Shared {
    pub(crate) config: RwLock<CellConfig>,
    pub(crate) engraver: RwLock<Engraver>,
    pub(crate) transporter: RwLock<Transporter>,
    pub(crate) queue: Mutex<JobQueue>,
    pub(crate) runs: Mutex<RunTracker>,
    pub(crate) billing: Mutex<BillingAggregator>,
    pub(crate) events: Mutex<EventLog>,
    pub(crate) window: BillingWindow,

    /// Serializes cycles; held across every tick of a cycle
    pub(crate) cycle_lock: tokio::sync::Mutex<()>,

    /// Sequence number of the last cycle that took a batch
    pub(crate) cycle_seq: AtomicU64,

    /// Counter behind composer order ids
    pub(crate) submission_seq: AtomicU64,

    pub(crate) pacer: Pacer,
}

/// Devices in their power-on state, transporter parked at HOME
pub(crate) fn fresh_devices(config: &CellConfig) -> (Engraver, Transporter) {
    let engraver = Engraver::new(
        ENGRAVER_ID,
        &config.currency,
        config.engraver.emission_factor_g_per_kwh,
        config.engraver.cost_per_energy_unit,
    );

    let mut transporter = Transporter::new(
        TRANSPORTER_ID,
        &config.currency,
        config.transporter.cost_per_meter,
    );
    let home = config.coords.get(HOME).unwrap_or(Point::ORIGIN);
    transporter.operational.pose.x = home.x;
    transporter.operational.pose.y = home.y;

    (engraver, transporter)
}

/// A tracked cycle registered with the run tracker but not yet executed
#[derive(Debug, Clone)]
pub(crate) struct PlannedRun {
    pub(crate) run_id: String,
    pub(crate) site: String,
    pub(crate) limit: Option<usize>,
    pub(crate) source: JobSource,

    /// Jobs that replace the whole queue once the cycle lock is held
    pub(crate) seed: Option<Vec<Job>>,
}

impl PlannedRun {
    pub(crate) fn seeded(mut self, jobs: Vec<Job>) -> Self {
        self.seed = Some(jobs);
        self
    }
}

impl Shared {
    /// Execute one cycle for `site`
    ///
    /// The caller must hold the cycle lock.
    async fn execute_cycle(
        &self,
        site: &str,
        limit: Option<usize>,
    ) -> Result<CycleSummary, SimulationError> {
        let config = self.config.read().clone();
        let site_point = config.coords.resolve(site)?;
        let home = config.coords.resolve(HOME)?;
        let dock = config.coords.resolve(DOCK)?;

        let jobs = {
            let mut queue = self.queue.lock();
            if !queue.has_jobs_for(site) {
                log::warn!("no jobs queued for {}, cycle skipped", site);
                return Err(SimulationError::NoMatchingJobs {
                    site: site.to_string(),
                });
            }
            queue.take_batch(site, limit)
        };

        let cycle = self.cycle_seq.fetch_add(1, Ordering::SeqCst) + 1;
        let started_at = Utc::now();
        let sim_start = self.pacer.clock().elapsed_secs();
        let job_ids: Vec<String> = jobs.iter().map(|j| j.order_id().to_string()).collect();

        MotionSimulator::open_ledger(
            &self.transporter,
            &config.currency,
            config.transporter.cost_per_meter,
        );
        EngravingSimulator::open_ledger(&self.engraver, &config.currency, &config.engraver);

        self.events.lock().log(Event::CycleStarted {
            cycle,
            site: site.to_string(),
            order_ids: job_ids.clone(),
            at: started_at,
        });
        log::info!(
            "cycle {} started for {} with {} job(s): {:?}",
            cycle,
            site,
            jobs.len(),
            job_ids
        );

        let ctx = TickContext {
            cycle,
            pacer: &self.pacer,
            events: &self.events,
            window: &self.window,
        };
        let outcome = self
            .drive_legs(&config, &ctx, &jobs, site_point, dock, home)
            .await;
        self.window.set(false);

        let results = match outcome {
            Ok(results) => results,
            Err(err) => {
                self.events.lock().log(Event::CycleFailed {
                    cycle,
                    error: err.to_string(),
                    at: Utc::now(),
                });
                log::warn!("cycle {} for {} failed: {}", cycle, site, err);
                return Err(err);
            }
        };

        let ended_at = Utc::now();
        let reference_id = format!("BATCH-{}-{:04}", ended_at.format("%Y%m%d-%H%M%S"), cycle);
        let (billed_distance_m, transport_cost) =
            MotionSimulator::close_ledger(&self.transporter, &reference_id);
        let engraver = EngravingSimulator::close_ledger(&self.engraver, &reference_id);

        let summary = CycleSummary {
            cycle,
            site: site.to_string(),
            job_ids,
            jobs: results,
            billed_distance_m,
            transport_cost,
            engraver_energy_kwh: engraver.energy_kwh,
            engraver_co2_g: engraver.co2_g,
            engraver_cost: engraver.cost,
            combined_cost: round6(engraver.cost + transport_cost),
            currency: config.currency.clone(),
            reference_id: reference_id.clone(),
            started_at,
            ended_at,
            simulated_duration_s: round6(self.pacer.clock().elapsed_secs() - sim_start),
        };

        self.events.lock().log(Event::CycleCompleted {
            cycle,
            reference_id,
            at: ended_at,
        });
        log::info!(
            "cycle {} finished: {} job(s), {:.3}m billed, total {:.6} {}",
            cycle,
            summary.job_count(),
            summary.billed_distance_m,
            summary.combined_cost,
            summary.currency
        );

        Ok(summary)
    }

    async fn drive_legs(
        &self,
        config: &CellConfig,
        ctx: &TickContext<'_>,
        jobs: &[Job],
        site: Point,
        dock: Point,
        home: Point,
    ) -> Result<Vec<JobResult>, SimulationError> {
        let motion = MotionSimulator::from_config(&config.transporter, config.tick_interval_s);
        let engraving = EngravingSimulator::new(config.engraver.clone(), config.progress_step);

        for (leg, target) in [(Leg::HomeToDock, dock), (Leg::DockToSite, site)] {
            motion
                .move_to(&self.transporter, leg, target, leg.is_billed(), ctx)
                .await?;
        }
        self.window.set(false);

        let mut results = Vec::with_capacity(jobs.len());
        for job in jobs {
            results.push(engraving.run_job(&self.engraver, job, ctx).await?);
        }

        for (leg, target) in [(Leg::SiteToDock, dock), (Leg::DockToHome, home)] {
            motion
                .move_to(&self.transporter, leg, target, leg.is_billed(), ctx)
                .await?;
        }

        Ok(results)
    }

    /// Run planned cycles back to back under one hold of the cycle lock
    ///
    /// A seeded run swaps the queue contents before its cycle, so no other
    /// run can take the seeded jobs or see the queue half replaced.
    async fn run_plan(&self, plan: &[PlannedRun]) -> Vec<RunEntry> {
        let _cycle = self.cycle_lock.lock().await;
        let mut finished = Vec::with_capacity(plan.len());
        for run in plan {
            if let Some(jobs) = &run.seed {
                self.reseed_queue(&run.run_id, jobs);
            }
            if let Some(entry) = self.run_tracked(run).await {
                finished.push(entry);
            }
        }
        finished
    }

    fn reseed_queue(&self, run_id: &str, jobs: &[Job]) {
        let mut queue = self.queue.lock();
        let dropped = queue.clear();
        if dropped > 0 {
            log::info!("run {} dropped {} queued job(s)", run_id, dropped);
        }
        for job in jobs {
            queue.enqueue(job.clone());
        }
    }

    /// Run one planned cycle and move its entry to a terminal state
    ///
    /// The caller must hold the cycle lock.
    async fn run_tracked(&self, run: &PlannedRun) -> Option<RunEntry> {
        let outcome = self.execute_cycle(&run.site, run.limit).await;
        if let Ok(summary) = &outcome {
            self.billing
                .lock()
                .record_cycle(summary, run.source, Some(&run.run_id));
        }

        let mut runs = self.runs.lock();
        match outcome {
            Ok(summary) => {
                log::info!("run {} completed", run.run_id);
                runs.complete(&run.run_id, summary)
            }
            Err(SimulationError::NoMatchingJobs { .. }) => {
                log::info!("run {} found no jobs", run.run_id);
                runs.mark_no_jobs(&run.run_id)
            }
            Err(err) => {
                log::warn!("run {} failed: {}", run.run_id, err);
                runs.fail(&run.run_id, err.to_string())
            }
        }
    }
}

// ============================================================================
// Tickets
// ============================================================================

fn collect_entries(
    shared: &Shared,
    run_ids: &[String],
    finished: Vec<RunEntry>,
) -> Result<Vec<RunEntry>, SimulationError> {
    run_ids
        .iter()
        .map(|run_id| {
            finished
                .iter()
                .find(|e| &e.run_id == run_id)
                .cloned()
                .or_else(|| shared.runs.lock().get(run_id).cloned())
                .ok_or_else(|| SimulationError::RunNotFound(run_id.clone()))
        })
        .collect()
}

/// Handle to one tracked cycle running in the background
pub struct CycleTicket {
    run_id: String,
    handle: JoinHandle<Vec<RunEntry>>,
    shared: Arc<Shared>,
}

impl CycleTicket {
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the cycle and return its terminal run entry
    ///
    /// # Errors
    ///
    /// `RunNotFound` if the history was cleared while the cycle ran.
    pub async fn wait(self) -> Result<RunEntry, SimulationError> {
        let CycleTicket {
            run_id,
            handle,
            shared,
        } = self;
        let finished = handle.await.unwrap_or_default();
        let mut entries = collect_entries(&shared, std::slice::from_ref(&run_id), finished)?;
        entries
            .pop()
            .ok_or(SimulationError::RunNotFound(run_id))
    }
}

/// Handle to several tracked cycles running one after another
pub struct ScenarioTicket {
    run_ids: Vec<String>,
    handle: JoinHandle<Vec<RunEntry>>,
    shared: Arc<Shared>,
}

impl ScenarioTicket {
    /// Run ids in execution order
    pub fn run_ids(&self) -> &[String] {
        &self.run_ids
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for every cycle and return the terminal entries in order
    pub async fn wait(self) -> Result<Vec<RunEntry>, SimulationError> {
        let finished = self.handle.await.unwrap_or_default();
        collect_entries(&self.shared, &self.run_ids, finished)
    }
}

// ============================================================================
// Status
// ============================================================================

/// Point-in-time view for pollers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellStatus {
    pub engraver_mode: OperationMode,
    pub engraver_progress: u8,
    pub engraver_order_id: String,
    pub transporter_mode: OperationMode,
    pub transporter_progress: u8,
    pub transporter_pose: Pose,
    pub queue_len: usize,
    pub billing_window_open: bool,
    pub cycle_in_progress: bool,

    /// Cycles that have taken a batch since start-up
    pub cycles_started: u64,
}

// ============================================================================
// Orchestrator
// ============================================================================

/// Handle to the production cell
///
/// Cloning is cheap; every clone drives the same devices, queue and
/// history.
#[derive(Clone)]
pub struct Orchestrator {
    pub(crate) shared: Arc<Shared>,
}

impl Orchestrator {
    /// Create a cell that runs cycles without wall-clock delay
    pub fn new(config: CellConfig) -> Result<Self, SimulationError> {
        Self::with_pacer(config, Pacer::instant())
    }

    /// Create a cell paced by `pacer`
    pub fn with_pacer(config: CellConfig, pacer: Pacer) -> Result<Self, SimulationError> {
        config.validate()?;
        let (engraver, transporter) = fresh_devices(&config);

        Ok(Self {
            shared: Arc::new(Shared {
                config: RwLock::new(config),
                engraver: RwLock::new(engraver),
                transporter: RwLock::new(transporter),
                queue: Mutex::new(JobQueue::new()),
                runs: Mutex::new(RunTracker::new()),
                billing: Mutex::new(BillingAggregator::new()),
                events: Mutex::new(EventLog::new()),
                window: BillingWindow::new(),
                cycle_lock: tokio::sync::Mutex::new(()),
                cycle_seq: AtomicU64::new(0),
                submission_seq: AtomicU64::new(0),
                pacer,
            }),
        })
    }

    pub fn pacer(&self) -> &Pacer {
        &self.shared.pacer
    }

    // ------------------------------------------------------------------
    // Queue
    // ------------------------------------------------------------------

    /// Queue a job after checking its site against the coordinate table
    pub fn enqueue(&self, job: Job) -> Result<(), SimulationError> {
        self.shared.config.read().coords.resolve(job.target_site())?;
        log::debug!("queued {} for {}", job.order_id(), job.target_site());
        self.shared.queue.lock().enqueue(job);
        Ok(())
    }

    pub fn queue(&self) -> Vec<Job> {
        self.shared.queue.lock().jobs()
    }

    pub fn queue_len(&self) -> usize {
        self.shared.queue.lock().len()
    }

    pub fn remove_job(&self, order_id: &str) -> bool {
        self.shared.queue.lock().remove_by_id(order_id)
    }

    pub fn clear_queue(&self) -> usize {
        self.shared.queue.lock().clear()
    }

    pub fn select_batch(&self, site: &str, limit: Option<usize>) -> Vec<Job> {
        self.shared.queue.lock().select_batch(site, limit)
    }

    // ------------------------------------------------------------------
    // Cycles
    // ------------------------------------------------------------------

    /// Check a site exists and has queued work
    fn check_triggerable(&self, site: &str) -> Result<(), SimulationError> {
        self.shared.config.read().coords.resolve(site)?;
        if !self.shared.queue.lock().has_jobs_for(site) {
            log::warn!("cycle for {} rejected: nothing queued", site);
            return Err(SimulationError::NoMatchingJobs {
                site: site.to_string(),
            });
        }
        Ok(())
    }

    /// Register a run entry in `running` state
    pub(crate) fn plan_run(
        &self,
        kind: &str,
        qualifier: &str,
        site: &str,
        limit: Option<usize>,
        source: JobSource,
    ) -> PlannedRun {
        let run_id = new_run_id(kind, qualifier);
        let config = self.config();
        self.shared
            .runs
            .lock()
            .start(run_id.clone(), site, source, config);
        log::info!("run {} registered for {}", run_id, site);

        PlannedRun {
            run_id,
            site: site.to_string(),
            limit,
            source,
            seed: None,
        }
    }

    /// Execute planned runs sequentially in a detached task
    ///
    /// The whole plan holds the cycle lock from its first cycle to its
    /// last. The cycles run in a nested task so that a panic is caught here and
    /// turned into `error` entries instead of leaving them `running`.
    pub(crate) fn spawn_runs(&self, plan: Vec<PlannedRun>) -> JoinHandle<Vec<RunEntry>> {
        let shared = Arc::clone(&self.shared);

        tokio::spawn(async move {
            let worker_shared = Arc::clone(&shared);
            let worker_plan = plan.clone();
            let worker =
                tokio::spawn(async move { worker_shared.run_plan(&worker_plan).await });

            match worker.await {
                Ok(finished) => finished,
                Err(err) => {
                    let message = format!("cycle task aborted: {}", err);
                    log::error!("{}", message);
                    let mut runs = shared.runs.lock();
                    plan.iter()
                        .filter_map(|run| {
                            let status = runs.get(&run.run_id).map(|e| e.status);
                            match status {
                                Some(RunStatus::Running) => runs.fail(&run.run_id, message.clone()),
                                Some(_) => runs.get(&run.run_id).cloned(),
                                None => None,
                            }
                        })
                        .collect()
                }
            }
        })
    }

    pub(crate) fn ticket_for(&self, run: PlannedRun) -> CycleTicket {
        let run_id = run.run_id.clone();
        CycleTicket {
            run_id,
            handle: self.spawn_runs(vec![run]),
            shared: Arc::clone(&self.shared),
        }
    }

    pub(crate) fn scenario_ticket_for(&self, plan: Vec<PlannedRun>) -> ScenarioTicket {
        let run_ids = plan.iter().map(|r| r.run_id.clone()).collect();
        ScenarioTicket {
            run_ids,
            handle: self.spawn_runs(plan),
            shared: Arc::clone(&self.shared),
        }
    }

    /// Start a tracked cycle for `site` in the background
    ///
    /// # Errors
    ///
    /// `InvalidSite` or `NoMatchingJobs`, reported before any run entry is
    /// created. Faults during the cycle only show up in the run entry.
    pub fn trigger_cycle(
        &self,
        site: &str,
        limit: Option<usize>,
        source: JobSource,
    ) -> Result<CycleTicket, SimulationError> {
        self.check_triggerable(site)?;
        let run = self.plan_run("run", site, site, limit, source);
        Ok(self.ticket_for(run))
    }

    /// Run one cycle on the calling task, without a run entry
    ///
    /// Waits for the cycle lock. Billing is not folded into the cumulative
    /// buckets.
    pub async fn run_cycle_for_site(
        &self,
        site: &str,
        limit: Option<usize>,
    ) -> Result<CycleSummary, SimulationError> {
        let _cycle = self.shared.cycle_lock.lock().await;
        self.shared.execute_cycle(site, limit).await
    }

    // ------------------------------------------------------------------
    // Devices and configuration
    // ------------------------------------------------------------------

    pub fn engraver(&self) -> Engraver {
        self.shared.engraver.read().clone()
    }

    pub fn transporter(&self) -> Transporter {
        self.shared.transporter.read().clone()
    }

    pub fn status(&self) -> CellStatus {
        let engraver = self.engraver();
        let transporter = self.transporter();

        CellStatus {
            engraver_mode: engraver.operational.status.mode,
            engraver_progress: engraver.operational.status.progress_percent,
            engraver_order_id: engraver.operational.order.order_id,
            transporter_mode: transporter.operational.status.mode,
            transporter_progress: transporter.operational.status.progress_percent,
            transporter_pose: transporter.operational.pose,
            queue_len: self.queue_len(),
            billing_window_open: self.shared.window.is_open(),
            cycle_in_progress: self.shared.cycle_lock.try_lock().is_err(),
            cycles_started: self.shared.cycle_seq.load(Ordering::SeqCst),
        }
    }

    /// Current configuration (a copy)
    pub fn config(&self) -> CellConfig {
        self.shared.config.read().clone()
    }

    /// Apply a partial update; takes effect from the next cycle
    pub fn update_config(&self, update: &ConfigUpdate) -> Result<CellConfig, SimulationError> {
        let mut config = self.shared.config.write();
        let next = config.apply(update)?;
        *config = next.clone();
        log::info!("configuration updated");
        Ok(next)
    }

    /// Insert or overwrite named sites
    pub fn update_coords(
        &self,
        updates: impl IntoIterator<Item = (String, Point)>,
    ) -> Result<CellConfig, SimulationError> {
        let mut config = self.shared.config.write();
        let next = config.with_coords(updates)?;
        *config = next.clone();
        log::info!("coordinates updated: {:?}", next.coords.sites());
        Ok(next)
    }

    // ------------------------------------------------------------------
    // Runs
    // ------------------------------------------------------------------

    pub fn run(&self, run_id: &str) -> Result<RunEntry, SimulationError> {
        self.shared
            .runs
            .lock()
            .get(run_id)
            .cloned()
            .ok_or_else(|| SimulationError::RunNotFound(run_id.to_string()))
    }

    /// Run entries newest first
    pub fn history(&self, limit: Option<usize>) -> Vec<RunEntry> {
        self.shared.runs.lock().history(limit)
    }

    pub fn history_stats(&self) -> HistoryStats {
        self.shared.runs.lock().stats()
    }

    pub fn clear_history(&self) -> usize {
        let removed = self.shared.runs.lock().clear();
        log::info!("cleared {} run(s) from history", removed);
        removed
    }

    pub fn export_history_json(&self, limit: Option<usize>) -> Result<String, SimulationError> {
        self.shared.runs.lock().export_json(limit)
    }

    // ------------------------------------------------------------------
    // Billing
    // ------------------------------------------------------------------

    pub fn cumulative_billing(&self) -> CumulativeBilling {
        self.shared.billing.lock().cumulative().clone()
    }

    /// Per-job records; `Some(source)` keeps only that source's bucket
    pub fn job_records(&self, source: Option<JobSource>) -> Vec<JobBillingRecord> {
        self.shared.billing.lock().records(source)
    }

    /// User totals, else scenario totals, else the current device ledgers
    pub fn combined_billing(&self) -> CombinedBilling {
        let currency = self.shared.config.read().currency.clone();
        if let Some(combined) = self.shared.billing.lock().combined(&currency) {
            return combined;
        }
        CombinedBilling::from_ledgers(&self.engraver(), &self.transporter())
    }

    /// Zero cumulative billing, job records and device ledgers
    ///
    /// Waits for a running cycle to finish first.
    pub async fn reset_billing(&self) {
        let _cycle = self.shared.cycle_lock.lock().await;
        self.shared.billing.lock().reset();
        self.shared.engraver.write().billing.reset_accruals();
        self.shared.transporter.write().billing.reset_accruals();
        log::info!("billing reset");
    }

    /// Restore default configuration, fresh devices and empty records
    ///
    /// The cycle sequence keeps counting so reference ids stay unique.
    pub async fn reset_to_defaults(&self) {
        let _cycle = self.shared.cycle_lock.lock().await;
        let config = CellConfig::default();
        let (engraver, transporter) = fresh_devices(&config);

        *self.shared.engraver.write() = engraver;
        *self.shared.transporter.write() = transporter;
        *self.shared.config.write() = config;
        self.shared.queue.lock().clear();
        self.shared.runs.lock().clear();
        self.shared.billing.lock().reset();
        self.shared.events.lock().clear();
        self.shared.window.set(false);
        log::info!("cell reset to defaults");
    }

    /// Copy of the event log
    pub fn events(&self) -> Vec<Event> {
        self.shared.events.lock().events().to_vec()
    }

    /// Events of one cycle, in order
    pub fn events_for_cycle(&self, cycle: u64) -> Vec<Event> {
        self.shared
            .events
            .lock()
            .events_for_cycle(cycle)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Drop logged events of cycles numbered below `cycle`
    ///
    /// The log already keeps only its retention window; this trims further.
    pub fn prune_events(&self, cycle: u64) -> usize {
        self.shared.events.lock().prune_before(cycle)
    }
}
