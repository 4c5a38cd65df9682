//! Motion simulator for the transporter
//!
//! Advances the transporter's pose towards a target in fixed ticks. Each
//! tick covers `speed * tick_interval` metres (the final tick is clipped
//! onto the target). Distance is added to the transporter ledger only
//! while the billing window is open: billing is a side effect of motion,
//! not a separate pass.

use super::TickContext;
use crate::config::TransporterConfig;
use crate::core::geometry::{distance, round6, step_towards, Point};
use crate::core::time::secs;
use crate::error::SimulationError;
use crate::models::device::{BillingStatus, OperationMode, Transporter};
use crate::models::event::{Event, Leg};
use chrono::Utc;
use parking_lot::RwLock;
use std::time::Duration;

/// Outcome of one leg
#[derive(Debug, Clone, PartialEq)]
pub struct LegReport {
    pub leg: Leg,

    /// Straight-line length of the leg (metres)
    pub length_m: f64,

    /// Ticks taken, the arrival tick included
    pub ticks: u64,

    /// Distance added to the ledger on this leg
    pub billed_m: f64,
}

/// Transporter motion in fixed time increments
#[derive(Debug, Clone)]
pub struct MotionSimulator {
    speed_m_per_s: f64,
    tick_interval_s: f64,
}

impl MotionSimulator {
    pub fn new(speed_m_per_s: f64, tick_interval_s: f64) -> Self {
        Self {
            speed_m_per_s,
            tick_interval_s,
        }
    }

    pub fn from_config(config: &TransporterConfig, tick_interval_s: f64) -> Self {
        Self::new(config.speed_m_per_s, tick_interval_s)
    }

    /// Distance covered by one full tick
    pub fn step_length(&self) -> f64 {
        self.speed_m_per_s * self.tick_interval_s
    }

    fn tick_duration(&self) -> Result<Duration, SimulationError> {
        secs(self.tick_interval_s)
    }

    /// Zero the per-cycle accruals and stamp the cycle's rates
    pub fn open_ledger(device: &RwLock<Transporter>, currency: &str, cost_per_meter: f64) {
        let mut agv = device.write();
        agv.billing.reset_accruals();
        agv.billing.currency = currency.to_string();
        agv.billing.cost_per_meter = cost_per_meter;
    }

    /// Round the billed distance, price it and stamp the cycle reference
    ///
    /// Returns `(distance_m, cost)`.
    pub fn close_ledger(device: &RwLock<Transporter>, reference_id: &str) -> (f64, f64) {
        let mut agv = device.write();
        let now = Utc::now();
        let ledger = &mut agv.billing;
        ledger.distance_traveled_m = round6(ledger.distance_traveled_m);
        ledger.cost_accrued = round6(ledger.distance_traveled_m * ledger.cost_per_meter);
        ledger.reference_id = Some(reference_id.to_string());
        ledger.status = BillingStatus::Open;
        ledger.last_billed_at = Some(now);
        ledger.last_updated = now;
        (ledger.distance_traveled_m, ledger.cost_accrued)
    }

    /// Drive the transporter to `target`
    ///
    /// Sets the billing window to `billed`, then ticks until arrival. A
    /// zero-length leg arrives on its first tick. The device is `Running`
    /// for the duration of the leg and returns to `Idle` with progress 100.
    ///
    /// # Errors
    ///
    /// `SimulationFault` when the leg fails to converge within its tick
    /// budget, the pose becomes non-finite, or pacing fails. The device is
    /// left in `Error` mode and whatever distance was billed stays billed.
    pub async fn move_to(
        &self,
        device: &RwLock<Transporter>,
        leg: Leg,
        target: Point,
        billed: bool,
        ctx: &TickContext<'_>,
    ) -> Result<LegReport, SimulationError> {
        ctx.window.set(billed);

        let result = self.drive(device, leg, target, ctx).await;
        if result.is_err() {
            device.write().operational.status.mode = OperationMode::Error;
        }
        result
    }

    async fn drive(
        &self,
        device: &RwLock<Transporter>,
        leg: Leg,
        target: Point,
        ctx: &TickContext<'_>,
    ) -> Result<LegReport, SimulationError> {
        let step_len = self.step_length();
        if !(step_len.is_finite() && step_len > 0.0) {
            return Err(SimulationError::SimulationFault(format!(
                "transporter step length must be positive, got {}",
                step_len
            )));
        }
        if !target.is_finite() {
            return Err(SimulationError::SimulationFault(format!(
                "leg {:?} has a non-finite target",
                leg
            )));
        }

        let start = {
            let mut agv = device.write();
            agv.operational.status.mode = OperationMode::Running;
            agv.position()
        };

        let length_m = distance(start, target);
        let progress_base = if length_m > 0.0 { length_m } else { 1.0 };
        let tick_budget = (length_m / step_len).ceil() as u64 + 2;

        ctx.record(Event::LegStarted {
            cycle: ctx.cycle,
            leg,
            from: start,
            to: target,
            billed: ctx.window.is_open(),
        });
        log::debug!(
            "cycle {}: leg {:?} {:.3}m (billed: {})",
            ctx.cycle,
            leg,
            length_m,
            ctx.window.is_open()
        );

        let mut ticks = 0u64;
        let mut billed_m = 0.0;

        loop {
            ticks += 1;
            if ticks > tick_budget {
                return Err(SimulationError::SimulationFault(format!(
                    "leg {:?} did not arrive within {} ticks",
                    leg, tick_budget
                )));
            }

            let (position, billed_delta_m, arrived) = {
                let mut agv = device.write();
                let step = step_towards(agv.position(), target, step_len);
                if !step.position.is_finite() {
                    return Err(SimulationError::SimulationFault(format!(
                        "transporter pose became non-finite on leg {:?}",
                        leg
                    )));
                }

                let pose = &mut agv.operational.pose;
                pose.x = step.position.x;
                pose.y = step.position.y;
                if let Some(heading) = step.heading_deg {
                    pose.heading = heading;
                }

                let billed_delta_m = if ctx.window.is_open() { step.covered } else { 0.0 };
                let ledger = &mut agv.billing;
                ledger.distance_traveled_m += billed_delta_m;
                ledger.cost_accrued = ledger.distance_traveled_m * ledger.cost_per_meter;

                let status = &mut agv.operational.status;
                status.bump_heartbeat();
                status.set_progress(distance(start, step.position) / progress_base * 100.0);

                (step.position, billed_delta_m, step.arrived)
            };

            billed_m += billed_delta_m;
            ctx.record(Event::TransportTick {
                cycle: ctx.cycle,
                leg,
                position,
                billed_delta_m,
            });

            if arrived {
                break;
            }

            ctx.pacer.pace(self.tick_duration()?).await?;
        }

        {
            let mut agv = device.write();
            agv.operational.status.mode = OperationMode::Idle;
            agv.operational.status.set_progress(100.0);
        }

        Ok(LegReport {
            leg,
            length_m,
            ticks,
            billed_m,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::time::Pacer;
    use crate::models::device::TRANSPORTER_ID;
    use crate::models::event::EventLog;
    use crate::sim::BillingWindow;
    use parking_lot::Mutex;

    struct Harness {
        pacer: Pacer,
        events: Mutex<EventLog>,
        window: BillingWindow,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                pacer: Pacer::instant(),
                events: Mutex::new(EventLog::new()),
                window: BillingWindow::new(),
            }
        }

        fn ctx(&self) -> TickContext<'_> {
            TickContext {
                cycle: 1,
                pacer: &self.pacer,
                events: &self.events,
                window: &self.window,
            }
        }
    }

    fn agv() -> RwLock<Transporter> {
        RwLock::new(Transporter::new(TRANSPORTER_ID, "EUR", 0.1))
    }

    #[tokio::test]
    async fn test_billed_leg_accrues_exact_distance() {
        let h = Harness::new();
        let device = agv();
        let sim = MotionSimulator::new(1.0, 0.1);

        let report = sim
            .move_to(&device, Leg::DockToSite, Point::new(10.0, 0.0), true, &h.ctx())
            .await
            .unwrap();

        let agv = device.read();
        assert!((agv.billing.distance_traveled_m - 10.0).abs() < 1e-9);
        assert!((report.billed_m - 10.0).abs() < 1e-9);
        assert_eq!(report.ticks, 100);
        assert_eq!(agv.position(), Point::new(10.0, 0.0));
        assert_eq!(agv.operational.status.mode, OperationMode::Idle);
        assert_eq!(agv.operational.status.progress_percent, 100);
        assert_eq!(agv.operational.status.heartbeat_count, 100);
    }

    #[tokio::test]
    async fn test_unbilled_leg_moves_without_billing() {
        let h = Harness::new();
        let device = agv();
        let sim = MotionSimulator::new(0.5, 0.1);

        sim.move_to(&device, Leg::HomeToDock, Point::new(5.0, 0.0), false, &h.ctx())
            .await
            .unwrap();

        let agv = device.read();
        assert_eq!(agv.billing.distance_traveled_m, 0.0);
        assert_eq!(agv.position(), Point::new(5.0, 0.0));
        assert!(!h.window.is_open());
    }

    #[tokio::test]
    async fn test_zero_length_leg_arrives_immediately() {
        let h = Harness::new();
        let device = agv();
        let sim = MotionSimulator::new(0.5, 0.1);

        let report = sim
            .move_to(&device, Leg::DockToHome, Point::ORIGIN, false, &h.ctx())
            .await
            .unwrap();

        assert_eq!(report.ticks, 1);
        assert_eq!(report.length_m, 0.0);
        assert_eq!(h.pacer.clock().ticks(), 0);
        assert_eq!(device.read().operational.status.progress_percent, 100);
    }

    #[tokio::test]
    async fn test_final_step_is_clipped() {
        let h = Harness::new();
        let device = agv();
        // 0.3m steps over a 1m leg: 0.3, 0.6, 0.9, then a clipped 0.1
        let sim = MotionSimulator::new(3.0, 0.1);

        let report = sim
            .move_to(&device, Leg::DockToSite, Point::new(1.0, 0.0), true, &h.ctx())
            .await
            .unwrap();

        assert_eq!(report.ticks, 4);
        assert!((device.read().billing.distance_traveled_m - 1.0).abs() < 1e-12);
        // Pacing only happens between ticks
        assert_eq!(h.pacer.clock().ticks(), 3);
    }

    #[tokio::test]
    async fn test_pacing_fault_leaves_partial_distance_and_error_mode() {
        let (pacer, ticks) = Pacer::stepped();
        let events = Mutex::new(EventLog::new());
        let window = BillingWindow::new();
        let ctx = TickContext {
            cycle: 7,
            pacer: &pacer,
            events: &events,
            window: &window,
        };
        let device = agv();
        let sim = MotionSimulator::new(1.0, 0.1);

        ticks.step(3);
        drop(ticks);

        let err = sim
            .move_to(&device, Leg::DockToSite, Point::new(10.0, 0.0), true, &ctx)
            .await
            .unwrap_err();

        assert!(matches!(err, SimulationError::SimulationFault(_)));
        let agv = device.read();
        assert!((agv.billing.distance_traveled_m - 0.4).abs() < 1e-9);
        assert!((agv.billing.cost_accrued - 0.04).abs() < 1e-9);
        assert_eq!(agv.operational.status.mode, OperationMode::Error);
    }

    #[tokio::test]
    async fn test_ticks_are_logged_with_cycle_number() {
        let h = Harness::new();
        let device = agv();
        let sim = MotionSimulator::new(1.0, 0.5);

        sim.move_to(&device, Leg::DockToSite, Point::new(0.0, 2.0), true, &h.ctx())
            .await
            .unwrap();

        let log = h.events.lock();
        assert_eq!(log.events_of_type("LegStarted").len(), 1);
        assert_eq!(log.events_of_type("TransportTick").len(), 4);
        assert!(log.events().iter().all(|e| e.cycle() == 1));
        assert!((device.read().operational.pose.heading - 90.0).abs() < 1e-9);
    }

    #[test]
    fn test_close_ledger_prices_rounded_distance() {
        let device = agv();
        device.write().billing.distance_traveled_m = 20.00000000001;

        let (distance_m, cost) = MotionSimulator::close_ledger(&device, "BATCH-1");
        assert_eq!(distance_m, 20.0);
        assert_eq!(cost, 2.0);
        assert_eq!(device.read().billing.reference_id.as_deref(), Some("BATCH-1"));
    }
}
