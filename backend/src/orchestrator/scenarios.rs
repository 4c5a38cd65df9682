//! Demonstration scenarios
//!
//! Both scenarios are plain compositions of "enqueue" and "run tracked
//! cycle" and bill into the scenario bucket. The queue is replaced by the
//! scenario's jobs only once the cycle lock is held, so runs already
//! waiting for the lock keep their own jobs.

use crate::config::HOME;
use crate::error::SimulationError;
use crate::models::job::{Job, JobSource};
use crate::orchestrator::engine::{CycleTicket, Orchestrator, ScenarioTicket};

/// Site used by the batch scenario and the first split cycle
pub const SCENARIO_SITE_1: &str = "JOB_POS1";

/// Site of the second split cycle
pub const SCENARIO_SITE_2: &str = "JOB_POS2";

impl Orchestrator {
    fn ensure_sites(&self, sites: &[&str]) -> Result<(), SimulationError> {
        let config = self.config();
        for site in sites {
            config.coords.resolve(site)?;
        }
        config.coords.resolve(HOME)?;
        Ok(())
    }

    /// Three jobs at one site, one billed round-trip
    ///
    /// Replaces the queue with E-1001 "HELLO", E-1002 "WORLD" and
    /// E-1003 "TEST" at `JOB_POS1` and runs one tracked cycle.
    pub fn run_batch_scenario(&self) -> Result<CycleTicket, SimulationError> {
        self.ensure_sites(&[SCENARIO_SITE_1])?;
        let jobs = [("E-1001", "HELLO"), ("E-1002", "WORLD"), ("E-1003", "TEST")]
            .into_iter()
            .map(|(order_id, text)| Job::new(order_id, text, SCENARIO_SITE_1))
            .collect();

        let run = self
            .plan_run("scenario1", "batch", SCENARIO_SITE_1, None, JobSource::Scenario)
            .seeded(jobs);
        Ok(self.ticket_for(run))
    }

    /// One job at each of two sites, two billed round-trips
    ///
    /// Replaces the queue with E-2001 "SMART" at `JOB_POS1` and E-2002
    /// "FACTORY" at `JOB_POS2`, then runs two tracked cycles one after the
    /// other in a single background task, each capped at one job. Both run
    /// entries exist before the first cycle starts.
    pub fn run_split_scenario(&self) -> Result<ScenarioTicket, SimulationError> {
        self.ensure_sites(&[SCENARIO_SITE_1, SCENARIO_SITE_2])?;
        let jobs = vec![
            Job::new("E-2001", "SMART", SCENARIO_SITE_1),
            Job::new("E-2002", "FACTORY", SCENARIO_SITE_2),
        ];

        let plan = vec![
            self.plan_run("scenario2", "split_a", SCENARIO_SITE_1, Some(1), JobSource::Scenario)
                .seeded(jobs),
            self.plan_run("scenario2", "split_b", SCENARIO_SITE_2, Some(1), JobSource::Scenario),
        ];
        Ok(self.scenario_ticket_for(plan))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CellConfig;
    use crate::core::geometry::Point;
    use crate::tracking::RunStatus;

    #[tokio::test]
    async fn test_batch_scenario_replaces_queue() {
        let cell = Orchestrator::new(CellConfig::default()).unwrap();
        cell.enqueue(Job::new("OLD-1", "X", "JOB_POS1")).unwrap();

        let entry = cell.run_batch_scenario().unwrap().wait().await.unwrap();

        assert_eq!(entry.status, RunStatus::Completed);
        assert_eq!(entry.job_ids, vec!["E-1001", "E-1002", "E-1003"]);
        assert!(entry.run_id.starts_with("scenario1_"));
        assert_eq!(cell.queue_len(), 0);
    }

    #[tokio::test]
    async fn test_split_scenario_needs_both_sites() {
        let mut config = CellConfig::default();
        config.coords = [
            ("HOME".to_string(), Point::ORIGIN),
            ("DOCK".to_string(), Point::new(5.0, 0.0)),
            ("JOB_POS1".to_string(), Point::new(12.0, 8.0)),
        ]
        .into_iter()
        .collect();
        let cell = Orchestrator::new(config).unwrap();

        assert!(matches!(
            cell.run_split_scenario(),
            Err(SimulationError::InvalidSite { .. })
        ));
        assert!(cell.history(None).is_empty());
    }
}
