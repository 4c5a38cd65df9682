//! Time management for the simulation
//!
//! The simulators advance in discrete ticks. Every tick ends at a pacing
//! point where simulated time moves forward and the running cycle may be
//! suspended. How long a pacing point takes in wall-clock time is decided
//! by the [`Pacer`] mode, never by the simulators themselves:
//!
//! - [`PacingMode::Instant`]: no wall-clock delay, only a scheduler yield
//! - [`PacingMode::RealTime`]: sleeps the simulated duration (live demo)
//! - [`PacingMode::Stepped`]: waits for an external tick token
//!
//! Simulated time is tracked by [`SimClock`] in all three modes, so cycle
//! summaries report the same simulated duration whichever mode ran them.

use crate::error::SimulationError;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};

/// Simulated clock with microsecond resolution
///
/// # Example
/// ```
/// use cell_simulator_core_rs::core::time::SimClock;
/// use std::time::Duration;
///
/// let clock = SimClock::new();
/// clock.advance(Duration::from_millis(100));
/// clock.advance(Duration::from_millis(100));
/// assert_eq!(clock.ticks(), 2);
/// assert!((clock.elapsed_secs() - 0.2).abs() < 1e-9);
/// ```
#[derive(Debug, Default)]
pub struct SimClock {
    /// Simulated microseconds since the clock was created
    elapsed_micros: AtomicU64,

    /// Number of pacing points passed
    ticks: AtomicU64,
}

impl SimClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance simulated time by one tick of length `dt`
    pub fn advance(&self, dt: Duration) {
        self.elapsed_micros
            .fetch_add(dt.as_micros() as u64, Ordering::SeqCst);
        self.ticks.fetch_add(1, Ordering::SeqCst);
    }

    /// Total ticks elapsed
    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::SeqCst)
    }

    /// Simulated elapsed time in microseconds
    pub fn elapsed_micros(&self) -> u64 {
        self.elapsed_micros.load(Ordering::SeqCst)
    }

    /// Simulated elapsed time in seconds
    pub fn elapsed_secs(&self) -> f64 {
        self.elapsed_micros() as f64 / 1_000_000.0
    }
}

/// How a pacing point waits
#[derive(Debug)]
pub enum PacingMode {
    /// Yield to the scheduler and continue immediately
    Instant,

    /// Sleep the simulated tick duration in wall-clock time
    RealTime,

    /// Wait for one token per tick from a [`TickSender`]
    Stepped(SteppedSource),
}

/// Receiving half of a stepped tick source
#[derive(Debug)]
pub struct SteppedSource {
    receiver: Mutex<mpsc::UnboundedReceiver<()>>,
    free_running: Arc<AtomicBool>,
}

/// External tick source driving a [`PacingMode::Stepped`] pacer
///
/// Each call to [`TickSender::step`] releases exactly one pacing point.
/// Dropping the sender while the pacer still waits for ticks is reported
/// to the running cycle as a simulation fault, unless the sender was
/// switched to free-running first.
#[derive(Debug)]
pub struct TickSender {
    sender: mpsc::UnboundedSender<()>,
    free_running: Arc<AtomicBool>,
}

impl TickSender {
    /// Release `n` pacing points
    pub fn step(&self, n: usize) {
        for _ in 0..n {
            // A closed receiver means the pacer is gone; nothing to release.
            let _ = self.sender.send(());
        }
    }

    /// Stop gating ticks; every later pacing point passes immediately
    pub fn run_free(&self) {
        self.free_running.store(true, Ordering::SeqCst);
        let _ = self.sender.send(());
    }
}

/// Pacing policy plus the simulated clock it advances
#[derive(Debug)]
pub struct Pacer {
    mode: PacingMode,
    clock: SimClock,
}

impl Pacer {
    /// Pacer that never waits on wall-clock time
    pub fn instant() -> Self {
        Self {
            mode: PacingMode::Instant,
            clock: SimClock::new(),
        }
    }

    /// Pacer that sleeps each tick's simulated duration
    pub fn real_time() -> Self {
        Self {
            mode: PacingMode::RealTime,
            clock: SimClock::new(),
        }
    }

    /// Pacer gated by an external tick source
    pub fn stepped() -> (Self, TickSender) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let free_running = Arc::new(AtomicBool::new(false));
        let pacer = Self {
            mode: PacingMode::Stepped(SteppedSource {
                receiver: Mutex::new(receiver),
                free_running: Arc::clone(&free_running),
            }),
            clock: SimClock::new(),
        };
        (
            pacer,
            TickSender {
                sender,
                free_running,
            },
        )
    }

    pub fn mode(&self) -> &PacingMode {
        &self.mode
    }

    pub fn clock(&self) -> &SimClock {
        &self.clock
    }

    /// Pass one pacing point of simulated length `dt`
    ///
    /// # Errors
    ///
    /// `SimulationFault` when a stepped tick source closes while the
    /// pacer is still gated.
    pub async fn pace(&self, dt: Duration) -> Result<(), SimulationError> {
        self.clock.advance(dt);

        match &self.mode {
            PacingMode::Instant => {
                tokio::task::yield_now().await;
                Ok(())
            }
            PacingMode::RealTime => {
                tokio::time::sleep(dt).await;
                Ok(())
            }
            PacingMode::Stepped(source) => {
                if source.free_running.load(Ordering::SeqCst) {
                    tokio::task::yield_now().await;
                    return Ok(());
                }
                let mut receiver = source.receiver.lock().await;
                match receiver.recv().await {
                    Some(()) => Ok(()),
                    None if source.free_running.load(Ordering::SeqCst) => Ok(()),
                    None => Err(SimulationError::SimulationFault(
                        "tick source closed".to_string(),
                    )),
                }
            }
        }
    }
}

/// Convert a duration in seconds to a `Duration`, clamping negatives to zero
///
/// # Errors
///
/// `SimulationFault` when the value does not fit in a `Duration`.
pub fn secs(value: f64) -> Result<Duration, SimulationError> {
    if !(value.is_finite() && value > 0.0) {
        return Ok(Duration::ZERO);
    }
    Duration::try_from_secs_f64(value).map_err(|e| {
        SimulationError::SimulationFault(format!("tick of {} s is out of range: {}", value, e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_instant_pacer_advances_clock() {
        let pacer = Pacer::instant();
        for _ in 0..10 {
            pacer.pace(Duration::from_millis(100)).await.unwrap();
        }
        assert_eq!(pacer.clock().ticks(), 10);
        assert!((pacer.clock().elapsed_secs() - 1.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_stepped_pacer_consumes_tokens() {
        let (pacer, ticks) = Pacer::stepped();
        ticks.step(2);
        pacer.pace(Duration::from_millis(10)).await.unwrap();
        pacer.pace(Duration::from_millis(10)).await.unwrap();
        assert_eq!(pacer.clock().ticks(), 2);
    }

    #[tokio::test]
    async fn test_stepped_pacer_faults_when_source_dropped() {
        let (pacer, ticks) = Pacer::stepped();
        drop(ticks);
        let err = pacer.pace(Duration::from_millis(10)).await.unwrap_err();
        assert_eq!(
            err,
            SimulationError::SimulationFault("tick source closed".to_string())
        );
    }

    #[tokio::test]
    async fn test_free_running_survives_drop() {
        let (pacer, ticks) = Pacer::stepped();
        ticks.run_free();
        drop(ticks);
        for _ in 0..5 {
            pacer.pace(Duration::from_millis(10)).await.unwrap();
        }
    }

    #[test]
    fn test_secs_clamps_invalid_values() {
        assert_eq!(secs(-1.0), Ok(Duration::ZERO));
        assert_eq!(secs(f64::NAN), Ok(Duration::ZERO));
        assert_eq!(secs(0.25), Ok(Duration::from_millis(250)));
    }

    #[test]
    fn test_secs_rejects_values_beyond_duration_range() {
        assert!(matches!(
            secs(1e30),
            Err(SimulationError::SimulationFault(_))
        ));
        assert!(secs(u64::MAX as f64 * 0.5).is_ok());
    }
}
