//! Engraving billing through full cycles
//!
//! Energy, CO2 and cost per job follow
//! `base + rate * max(1, letters * seconds_per_letter)`, rounded to 6
//! decimals, and a cycle's engraver totals are the sum over its jobs.

use cell_simulator_core_rs::core::geometry::round6;
use cell_simulator_core_rs::sim::compute_job_billing;
use cell_simulator_core_rs::{
    CellConfig, Event, Job, JobSource, Orchestrator, Point, RunStatus, SimulationError,
};
use proptest::prelude::*;

fn formula_config() -> CellConfig {
    let mut config = CellConfig::default();
    config.engraver.seconds_per_letter = 1.0;
    config.engraver.base_idle_energy_kwh = 0.1;
    config.engraver.laser_energy_rate_kwh_per_s = 0.01;
    config.engraver.emission_factor_g_per_kwh = 500.0;
    config.engraver.cost_per_energy_unit = 0.5;
    config.coords = [
        ("HOME".to_string(), Point::new(0.0, 0.0)),
        ("DOCK".to_string(), Point::new(1.0, 0.0)),
        ("SITE".to_string(), Point::new(2.0, 0.0)),
    ]
    .into_iter()
    .collect();
    config
}

// ============================================================================
// Test 1: Single-letter reference job
// ============================================================================

#[tokio::test]
async fn test_single_letter_job_matches_reference_values() {
    let cell = Orchestrator::new(formula_config()).unwrap();
    cell.enqueue(Job::new("E-1", "A", "SITE")).unwrap();

    let summary = cell.run_cycle_for_site("SITE", None).await.unwrap();

    assert_eq!(summary.engraver_energy_kwh, 0.11);
    assert_eq!(summary.engraver_co2_g, 55.0);
    assert_eq!(summary.engraver_cost, 0.055);

    let job = &summary.jobs[0];
    assert_eq!(job.letter_count, 1);
    assert_eq!(job.duration_s, 1.0);
    assert_eq!(job.billing.energy_kwh, 0.11);
}

// ============================================================================
// Test 2: Cycle totals are summed over jobs, not overwritten
// ============================================================================

#[tokio::test]
async fn test_cycle_totals_sum_every_job() {
    let cell = Orchestrator::new(formula_config()).unwrap();
    for (id, text) in [("E-1", "HELLO"), ("E-2", "WORLD"), ("E-3", "TEST")] {
        cell.enqueue(Job::new(id, text, "SITE")).unwrap();
    }

    let summary = cell.run_cycle_for_site("SITE", None).await.unwrap();

    // 0.15 + 0.15 + 0.14 kWh
    assert_eq!(summary.engraver_energy_kwh, 0.44);
    assert_eq!(summary.engraver_cost, 0.22);
    assert_eq!(summary.engraver_co2_g, 220.0);

    let engraver = cell.engraver();
    assert_eq!(engraver.billing.energy_consumed_kwh, 0.44);
    assert_eq!(
        engraver.billing.reference_id.as_deref(),
        Some(summary.reference_id.as_str())
    );
}

// ============================================================================
// Test 3: Letter counting and the one-second floor
// ============================================================================

#[tokio::test]
async fn test_whitespace_and_punctuation_count_as_letters() {
    let cell = Orchestrator::new(formula_config()).unwrap();
    cell.enqueue(Job::new("E-1", "HI, YOU!", "SITE")).unwrap();

    let summary = cell.run_cycle_for_site("SITE", None).await.unwrap();

    assert_eq!(summary.jobs[0].letter_count, 8);
    assert_eq!(summary.engraver_energy_kwh, 0.18);
}

#[tokio::test]
async fn test_empty_text_still_takes_one_second() {
    let mut config = formula_config();
    config.engraver.seconds_per_letter = 0.5;
    let cell = Orchestrator::new(config).unwrap();
    cell.enqueue(Job::new("E-1", "", "SITE")).unwrap();

    let summary = cell.run_cycle_for_site("SITE", None).await.unwrap();

    assert_eq!(summary.jobs[0].letter_count, 0);
    assert_eq!(summary.jobs[0].duration_s, 1.0);
    assert_eq!(summary.engraver_energy_kwh, 0.11);
}

// ============================================================================
// Test 4: Progress increments
// ============================================================================

#[tokio::test]
async fn test_progress_events_follow_configured_step() {
    let mut config = formula_config();
    config.progress_step = 30;
    let cell = Orchestrator::new(config).unwrap();
    cell.enqueue(Job::new("E-1", "AB", "SITE")).unwrap();

    cell.run_cycle_for_site("SITE", None).await.unwrap();

    let progress: Vec<u8> = cell
        .events()
        .iter()
        .filter_map(|e| match e {
            Event::EngravingTick { progress, .. } => Some(*progress),
            _ => None,
        })
        .collect();
    assert_eq!(progress, vec![30, 60, 90, 100]);

    let engraver = cell.engraver();
    assert_eq!(engraver.operational.status.progress_percent, 100);
    assert_eq!(engraver.operational.order.order_id, "E-1");
}

// ============================================================================
// Test 5: Formula properties
// ============================================================================

proptest! {
    #[test]
    fn prop_billing_follows_formula(
        letters in 0usize..60,
        spl in 0.0f64..2.0,
        base in 0.0f64..1.0,
        rate in 0.0f64..0.1,
        factor in 0.0f64..1000.0,
        price in 0.0f64..2.0,
    ) {
        let duration = (letters as f64 * spl).max(1.0);
        let billing = compute_job_billing(duration, base, rate, factor, price);
        let energy = base + rate * duration;

        prop_assert_eq!(billing.energy_kwh, round6(energy));
        prop_assert_eq!(billing.co2_g, round6(energy * factor));
        prop_assert_eq!(billing.cost, round6(energy * price));
        prop_assert!(billing.energy_kwh >= round6(base));
    }
}

// ============================================================================
// Test 6: Job durations too long to pace
// ============================================================================

#[tokio::test]
async fn test_oversized_job_duration_fails_the_cycle() {
    let mut config = formula_config();
    config.engraver.seconds_per_letter = 1e30;
    let cell = Orchestrator::new(config).unwrap();

    cell.enqueue(Job::new("E-1", "HELLO", "SITE")).unwrap();
    let err = cell.run_cycle_for_site("SITE", None).await.unwrap_err();
    assert!(matches!(err, SimulationError::SimulationFault(_)));

    cell.enqueue(Job::new("E-2", "HELLO", "SITE")).unwrap();
    let entry = cell
        .trigger_cycle("SITE", None, JobSource::Direct)
        .unwrap()
        .wait()
        .await
        .unwrap();
    assert_eq!(entry.status, RunStatus::Error);
    assert!(entry.error.unwrap().contains("out of range"));
    assert!(!cell.cumulative_billing().user_jobs.has_jobs());
}
