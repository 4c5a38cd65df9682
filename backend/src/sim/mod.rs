//! Device simulators
//!
//! - **motion**: drives the transporter along one leg, accruing billed distance
//! - **engraving**: runs one engraving job and prices it
//!
//! Both simulators hold their device's write lock only for the duration of
//! a single tick and release it before pacing, so status pollers always
//! read a record that is consistent at a tick boundary.

pub mod engraving;
pub mod motion;

use crate::core::time::Pacer;
use crate::models::event::{Event, EventLog};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

pub use engraving::{compute_job_billing, EngraverTotals, EngravingSimulator, JobBilling, JobResult};
pub use motion::{LegReport, MotionSimulator};

/// Flag that is true only during legs whose distance is billed
///
/// Toggled immediately before each leg and read by the motion simulator
/// on every tick.
#[derive(Debug, Default)]
pub struct BillingWindow {
    open: AtomicBool,
}

impl BillingWindow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, open: bool) {
        self.open.store(open, Ordering::SeqCst);
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }
}

/// Everything a simulator needs besides its device
pub struct TickContext<'a> {
    /// Sequence number of the running cycle
    pub cycle: u64,

    pub pacer: &'a Pacer,

    pub events: &'a Mutex<EventLog>,

    pub window: &'a BillingWindow,
}

impl TickContext<'_> {
    pub(crate) fn record(&self, event: Event) {
        self.events.lock().log(event);
    }
}
