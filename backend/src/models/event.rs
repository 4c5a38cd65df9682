//! Event logging for cycle replay and auditing.
//!
//! Every state change inside a cycle is recorded as an [`Event`] tagged with
//! the cycle's sequence number. Because cycles are serialized by the cycle
//! lock, the events of one cycle always form a contiguous block in the log;
//! pollers and tests use this to verify that no two cycles ever interleave.
//!
//! The log keeps the most recent [`DEFAULT_RETAINED_CYCLES`] cycles; older
//! blocks are dropped when a new cycle starts.
//!
//! # Event Types
//!
//! - **CycleStarted / CycleCompleted / CycleFailed**: cycle boundaries
//! - **LegStarted / TransportTick**: transporter motion
//! - **EngravingTick / JobCompleted**: engraver progress
//!
//! # Example
//!
//! ```rust
//! use cell_simulator_core_rs::models::event::{Event, EventLog};
//!
//! let mut log = EventLog::new();
//! log.log(Event::EngravingTick {
//!     cycle: 3,
//!     order_id: "E-1001".to_string(),
//!     progress: 25,
//! });
//!
//! assert_eq!(log.events_for_cycle(3).len(), 1);
//! assert_eq!(log.events()[0].event_type(), "EngravingTick");
//! ```

use crate::core::geometry::Point;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One segment of the five-leg production cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Leg {
    /// HOME → DOCK, not billed
    HomeToDock,

    /// DOCK → site, billed
    DockToSite,

    /// site → DOCK, billed
    SiteToDock,

    /// DOCK → HOME, not billed
    DockToHome,
}

impl Leg {
    /// Transporter distance on this leg is billed
    pub fn is_billed(&self) -> bool {
        matches!(self, Leg::DockToSite | Leg::SiteToDock)
    }
}

/// Cycle event capturing a state change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    /// Cycle acquired the lock and took its batch
    CycleStarted {
        cycle: u64,
        site: String,
        order_ids: Vec<String>,
        at: DateTime<Utc>,
    },

    /// Transporter leg begins; `billed` mirrors the billing window
    LegStarted {
        cycle: u64,
        leg: Leg,
        from: Point,
        to: Point,
        billed: bool,
    },

    /// One transporter tick
    TransportTick {
        cycle: u64,
        leg: Leg,
        position: Point,
        /// Distance added to the ledger this tick (zero outside the billing window)
        billed_delta_m: f64,
    },

    /// One engraving progress increment
    EngravingTick {
        cycle: u64,
        order_id: String,
        progress: u8,
    },

    /// Engraver finished a job
    JobCompleted {
        cycle: u64,
        order_id: String,
        energy_kwh: f64,
        cost: f64,
    },

    /// All five legs finished and the summary was stamped
    CycleCompleted {
        cycle: u64,
        reference_id: String,
        at: DateTime<Utc>,
    },

    /// Cycle aborted by a fault; accrued billing is kept
    CycleFailed {
        cycle: u64,
        error: String,
        at: DateTime<Utc>,
    },
}

impl Event {
    /// Sequence number of the cycle that produced the event
    pub fn cycle(&self) -> u64 {
        match self {
            Event::CycleStarted { cycle, .. }
            | Event::LegStarted { cycle, .. }
            | Event::TransportTick { cycle, .. }
            | Event::EngravingTick { cycle, .. }
            | Event::JobCompleted { cycle, .. }
            | Event::CycleCompleted { cycle, .. }
            | Event::CycleFailed { cycle, .. } => *cycle,
        }
    }

    /// Variant name
    pub fn event_type(&self) -> &'static str {
        match self {
            Event::CycleStarted { .. } => "CycleStarted",
            Event::LegStarted { .. } => "LegStarted",
            Event::TransportTick { .. } => "TransportTick",
            Event::EngravingTick { .. } => "EngravingTick",
            Event::JobCompleted { .. } => "JobCompleted",
            Event::CycleCompleted { .. } => "CycleCompleted",
            Event::CycleFailed { .. } => "CycleFailed",
        }
    }

    /// Order the event refers to, if any
    pub fn order_id(&self) -> Option<&str> {
        match self {
            Event::EngravingTick { order_id, .. } | Event::JobCompleted { order_id, .. } => {
                Some(order_id)
            }
            _ => None,
        }
    }
}

/// Cycles kept by [`EventLog::new`]
pub const DEFAULT_RETAINED_CYCLES: u64 = 64;

/// Append-only record of cycle events, bounded to the latest cycles
#[derive(Debug, Clone)]
pub struct EventLog {
    events: Vec<Event>,
    retained_cycles: u64,
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new()
    }
}

impl EventLog {
    /// Create a new empty event log
    pub fn new() -> Self {
        Self::with_retention(DEFAULT_RETAINED_CYCLES)
    }

    /// Create a log that keeps the events of the last `cycles` cycles
    ///
    /// A retention of zero is treated as one.
    pub fn with_retention(cycles: u64) -> Self {
        Self {
            events: Vec::new(),
            retained_cycles: cycles.max(1),
        }
    }

    pub fn retained_cycles(&self) -> u64 {
        self.retained_cycles
    }

    /// Add an event to the log
    ///
    /// A `CycleStarted` event first drops every cycle that falls out of the
    /// retention window.
    pub fn log(&mut self, event: Event) {
        if let Event::CycleStarted { cycle, .. } = &event {
            let oldest_kept = (cycle + 1).saturating_sub(self.retained_cycles);
            self.prune_before(oldest_kept);
        }
        self.events.push(event);
    }

    /// Drop the events of every cycle numbered below `cycle`
    ///
    /// Returns the number of events removed.
    pub fn prune_before(&mut self, cycle: u64) -> usize {
        let before = self.events.len();
        self.events.retain(|e| e.cycle() >= cycle);
        let removed = before - self.events.len();
        if removed > 0 {
            log::debug!("event log pruned {} event(s) before cycle {}", removed, cycle);
        }
        removed
    }

    /// Get the number of events logged
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Check if the log is empty
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Get all events
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Get events for a specific cycle
    pub fn events_for_cycle(&self, cycle: u64) -> Vec<&Event> {
        self.events.iter().filter(|e| e.cycle() == cycle).collect()
    }

    /// Get events of a specific type
    pub fn events_of_type(&self, event_type: &str) -> Vec<&Event> {
        self.events
            .iter()
            .filter(|e| e.event_type() == event_type)
            .collect()
    }

    /// Get events for a specific order
    pub fn events_for_order(&self, order_id: &str) -> Vec<&Event> {
        self.events
            .iter()
            .filter(|e| e.order_id() == Some(order_id))
            .collect()
    }

    /// Clear all events
    pub fn clear(&mut self) {
        self.events.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tick(cycle: u64, order_id: &str, progress: u8) -> Event {
        Event::EngravingTick {
            cycle,
            order_id: order_id.to_string(),
            progress,
        }
    }

    fn started(cycle: u64) -> Event {
        Event::CycleStarted {
            cycle,
            site: "JOB_POS1".to_string(),
            order_ids: vec![format!("E-{}", cycle)],
            at: Utc::now(),
        }
    }

    #[test]
    fn test_leg_billing_flags() {
        assert!(!Leg::HomeToDock.is_billed());
        assert!(Leg::DockToSite.is_billed());
        assert!(Leg::SiteToDock.is_billed());
        assert!(!Leg::DockToHome.is_billed());
    }

    #[test]
    fn test_event_log_query_by_cycle() {
        let mut log = EventLog::new();
        log.log(tick(1, "E-1", 50));
        log.log(tick(1, "E-1", 100));
        log.log(tick(2, "E-2", 50));

        assert_eq!(log.events_for_cycle(1).len(), 2);
        assert_eq!(log.events_for_cycle(2).len(), 1);
        assert!(log.events_for_cycle(3).is_empty());
    }

    #[test]
    fn test_event_log_query_by_type_and_order() {
        let mut log = EventLog::new();
        log.log(tick(1, "E-1", 100));
        log.log(Event::JobCompleted {
            cycle: 1,
            order_id: "E-1".to_string(),
            energy_kwh: 0.11,
            cost: 0.055,
        });
        log.log(Event::LegStarted {
            cycle: 1,
            leg: Leg::SiteToDock,
            from: Point::new(12.0, 8.0),
            to: Point::new(5.0, 0.0),
            billed: true,
        });

        assert_eq!(log.events_of_type("JobCompleted").len(), 1);
        assert_eq!(log.events_for_order("E-1").len(), 2);
        assert_eq!(log.events_of_type("LegStarted")[0].order_id(), None);
    }

    #[test]
    fn test_event_log_clear() {
        let mut log = EventLog::new();
        log.log(tick(1, "E-1", 5));
        assert_eq!(log.len(), 1);

        log.clear();
        assert!(log.is_empty());
    }

    #[test]
    fn test_retention_keeps_latest_cycles() {
        let mut log = EventLog::with_retention(3);
        for cycle in 1..=10 {
            log.log(started(cycle));
            log.log(tick(cycle, "E-1", 100));
        }

        let cycles: Vec<u64> = log.events().iter().map(Event::cycle).collect();
        assert_eq!(cycles, vec![8, 8, 9, 9, 10, 10]);
        assert!(log.events_for_cycle(7).is_empty());
    }

    #[test]
    fn test_default_retention_outlasts_short_runs() {
        let mut log = EventLog::new();
        for cycle in 1..=DEFAULT_RETAINED_CYCLES {
            log.log(started(cycle));
        }
        assert_eq!(log.len() as u64, DEFAULT_RETAINED_CYCLES);

        log.log(started(DEFAULT_RETAINED_CYCLES + 1));
        assert_eq!(log.len() as u64, DEFAULT_RETAINED_CYCLES);
        assert!(log.events_for_cycle(1).is_empty());
    }

    #[test]
    fn test_prune_before_reports_removed_count() {
        let mut log = EventLog::with_retention(0);
        assert_eq!(log.retained_cycles(), 1);

        log.log(tick(1, "E-1", 50));
        log.log(tick(2, "E-2", 50));
        log.log(tick(2, "E-2", 100));

        assert_eq!(log.prune_before(2), 1);
        assert_eq!(log.prune_before(2), 0);
        assert_eq!(log.len(), 2);
    }
}
