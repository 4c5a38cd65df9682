//! Device models for the two simulated assets
//!
//! The cell has exactly one stationary engraver and one mobile transporter
//! (AGV). Both share the same operational record (status, current order,
//! pose) and differ only in the shape of their usage-billing ledger.
//!
//! # Ownership
//!
//! Device records are mutated only by the simulator that owns them: the
//! engraving simulator for the engraver, the motion simulator for the
//! transporter. Everybody else reads cloned snapshots.
//!
//! Ledgers are cycle-scoped. They are zeroed when a cycle opens its
//! billing window; cumulative totals live in the billing aggregator.

use crate::core::geometry::Point;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const ENGRAVER_ID: &str = "engraver-001";
pub const TRANSPORTER_ID: &str = "agv-001";

/// Device category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeviceKind {
    Engraver,
    Transporter,
}

/// Operation mode reported by a device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationMode {
    Idle,
    Running,
    Error,
}

/// Kind of order a device is working on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderKind {
    LaserEngraving,
    Transport,
}

/// Lifecycle state of the current order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderState {
    Created,
    InProcess,
    Done,
    Error,
}

/// Ledger settlement state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BillingStatus {
    Open,
    Billed,
    Waived,
}

/// Live status of a device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceStatus {
    /// Progress of the current leg or job, 0..=100
    pub progress_percent: u8,

    pub mode: OperationMode,

    /// Incremented on every simulated tick
    pub heartbeat_count: u64,

    pub heartbeat_at: DateTime<Utc>,
}

impl DeviceStatus {
    fn new(now: DateTime<Utc>) -> Self {
        Self {
            progress_percent: 0,
            mode: OperationMode::Idle,
            heartbeat_count: 0,
            heartbeat_at: now,
        }
    }

    /// Record one tick
    pub fn bump_heartbeat(&mut self) {
        self.heartbeat_count += 1;
        self.heartbeat_at = Utc::now();
    }

    /// Set progress, rounding and clamping into 0..=100
    pub fn set_progress(&mut self, percent: f64) {
        let clamped = if percent.is_nan() {
            0.0
        } else {
            percent.round().clamp(0.0, 100.0)
        };
        self.progress_percent = clamped as u8;
    }
}

/// Order currently assigned to a device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentOrder {
    pub order_id: String,
    pub kind: OrderKind,
    pub text: Option<String>,
    pub requires_transport: bool,
    pub state: OrderState,
    pub last_changed_at: DateTime<Utc>,
}

/// Position and heading on the cell floor
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Pose {
    pub x: f64,
    pub y: f64,

    /// Degrees, counter-clockwise from the +x axis
    pub heading: f64,
}

impl Pose {
    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

/// Operational record shared by both device kinds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationalData {
    pub status: DeviceStatus,
    pub order: CurrentOrder,
    pub pose: Pose,
}

impl OperationalData {
    fn new(kind: OrderKind, now: DateTime<Utc>) -> Self {
        Self {
            status: DeviceStatus::new(now),
            order: CurrentOrder {
                order_id: String::new(),
                kind,
                text: None,
                requires_transport: kind == OrderKind::Transport,
                state: OrderState::Created,
                last_changed_at: now,
            },
            pose: Pose::default(),
        }
    }
}

// ============================================================================
// Billing Ledgers
// ============================================================================

/// Engraver usage ledger for the current cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngraverLedger {
    pub currency: String,
    pub energy_consumed_kwh: f64,
    pub co2_grams_emitted: f64,
    pub cost_accrued: f64,

    /// g CO2 per kWh, stamped from the cycle's configuration
    pub emission_factor: f64,

    /// Price per kWh, stamped from the cycle's configuration
    pub cost_per_energy_unit: f64,

    pub status: BillingStatus,
    pub reference_id: Option<String>,
    pub last_billed_at: Option<DateTime<Utc>>,
    pub last_updated: DateTime<Utc>,
}

impl EngraverLedger {
    /// Zero the per-cycle accruals
    pub fn reset_accruals(&mut self) {
        self.energy_consumed_kwh = 0.0;
        self.co2_grams_emitted = 0.0;
        self.cost_accrued = 0.0;
        self.last_updated = Utc::now();
    }
}

/// Transporter usage ledger for the current cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransporterLedger {
    pub currency: String,

    /// Metres travelled while the billing window was open
    pub distance_traveled_m: f64,

    pub cost_accrued: f64,

    /// Price per metre, stamped from the cycle's configuration
    pub cost_per_meter: f64,

    pub status: BillingStatus,
    pub reference_id: Option<String>,
    pub last_billed_at: Option<DateTime<Utc>>,
    pub last_updated: DateTime<Utc>,
}

impl TransporterLedger {
    /// Zero the per-cycle accruals
    pub fn reset_accruals(&mut self) {
        self.distance_traveled_m = 0.0;
        self.cost_accrued = 0.0;
        self.last_updated = Utc::now();
    }
}

// ============================================================================
// Devices
// ============================================================================

/// Stationary laser engraver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Engraver {
    pub id: String,
    pub kind: DeviceKind,
    pub operational: OperationalData,
    pub billing: EngraverLedger,
}

impl Engraver {
    pub fn new(id: impl Into<String>, currency: &str, emission_factor: f64, cost_per_energy_unit: f64) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            kind: DeviceKind::Engraver,
            operational: OperationalData::new(OrderKind::LaserEngraving, now),
            billing: EngraverLedger {
                currency: currency.to_string(),
                energy_consumed_kwh: 0.0,
                co2_grams_emitted: 0.0,
                cost_accrued: 0.0,
                emission_factor,
                cost_per_energy_unit,
                status: BillingStatus::Open,
                reference_id: None,
                last_billed_at: None,
                last_updated: now,
            },
        }
    }
}

/// Mobile transporter (AGV)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transporter {
    pub id: String,
    pub kind: DeviceKind,
    pub operational: OperationalData,
    pub billing: TransporterLedger,
}

impl Transporter {
    pub fn new(id: impl Into<String>, currency: &str, cost_per_meter: f64) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            kind: DeviceKind::Transporter,
            operational: OperationalData::new(OrderKind::Transport, now),
            billing: TransporterLedger {
                currency: currency.to_string(),
                distance_traveled_m: 0.0,
                cost_accrued: 0.0,
                cost_per_meter,
                status: BillingStatus::Open,
                reference_id: None,
                last_billed_at: None,
                last_updated: now,
            },
        }
    }

    pub fn position(&self) -> Point {
        self.operational.pose.position()
    }
}
