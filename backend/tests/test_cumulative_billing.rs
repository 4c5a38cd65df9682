//! Cumulative billing buckets
//!
//! Direct and batch submissions accumulate in the user bucket, scenarios
//! in the scenario bucket. Each bucket only grows by completed cycles, and
//! per-job records split a cycle's transport cost evenly.

use cell_simulator_core_rs::{
    BillingOrigin, CellConfig, CumulativeBilling, JobSource, Orchestrator, RunStatus,
};

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-6
}

// ============================================================================
// Test 1: User and scenario buckets are independent
// ============================================================================

#[tokio::test]
async fn test_user_and_scenario_buckets_are_independent() {
    let cell = Orchestrator::new(CellConfig::default()).unwrap();

    let direct = cell.submit_direct("HI", "JOB_POS2").unwrap();
    let direct_entry = direct.ticket.wait().await.unwrap();
    let user_after_direct = cell.cumulative_billing().user_jobs;

    let scenario_entry = cell.run_batch_scenario().unwrap().wait().await.unwrap();
    let billing = cell.cumulative_billing();

    // The scenario did not touch the user bucket
    assert_eq!(billing.user_jobs, user_after_direct);
    assert_eq!(billing.user_jobs.job_ids, direct.order_ids);
    assert_eq!(
        billing.scenario_jobs.job_ids,
        vec!["E-1001", "E-1002", "E-1003"]
    );

    let direct_summary = direct_entry.cycle_summary.unwrap();
    let scenario_summary = scenario_entry.cycle_summary.unwrap();
    assert_eq!(billing.user_jobs.total_cost, direct_summary.combined_cost);
    assert_eq!(billing.scenario_jobs.total_cost, scenario_summary.combined_cost);
    assert!(approx(billing.user_jobs.distance_m, 2.0 * 136f64.sqrt()));
    assert!(approx(billing.scenario_jobs.distance_m, 2.0 * 113f64.sqrt()));
}

#[tokio::test]
async fn test_user_bucket_accumulates_across_cycles() {
    let cell = Orchestrator::new(CellConfig::default()).unwrap();

    let first = cell.submit_direct("ONE", "JOB_POS1").unwrap();
    let first = first.ticket.wait().await.unwrap().cycle_summary.unwrap();
    let second = cell.submit_batch(&["TWO", "THREE"], "JOB_POS2").unwrap();
    let second = second.ticket.wait().await.unwrap().cycle_summary.unwrap();

    let user = cell.cumulative_billing().user_jobs;
    assert_eq!(user.job_ids.len(), 3);
    assert!(approx(
        user.energy_kwh,
        first.engraver_energy_kwh + second.engraver_energy_kwh
    ));
    assert!(approx(
        user.distance_m,
        first.billed_distance_m + second.billed_distance_m
    ));
    assert!(approx(user.total_cost, user.engraver_cost + user.transport_cost));
    assert!(user.last_updated.is_some());
    assert_eq!(cell.cumulative_billing().scenario_jobs.job_ids.len(), 0);
}

// ============================================================================
// Test 2: Per-job records
// ============================================================================

#[tokio::test]
async fn test_job_records_split_transport_cost() {
    let cell = Orchestrator::new(CellConfig::default()).unwrap();
    let entry = cell.run_batch_scenario().unwrap().wait().await.unwrap();
    let summary = entry.cycle_summary.unwrap();

    let records = cell.job_records(Some(JobSource::Scenario));
    assert_eq!(records.len(), 3);
    assert!(cell.job_records(Some(JobSource::Direct)).is_empty());

    let shares: f64 = records.iter().map(|r| r.transport_cost_share).sum();
    assert!((shares - summary.transport_cost).abs() < 1e-5);

    for record in &records {
        assert_eq!(record.reference_id, summary.reference_id);
        assert_eq!(record.run_id.as_deref(), Some(entry.run_id.as_str()));
        assert!(approx(
            record.total_cost,
            record.engraver_cost + record.transport_cost_share
        ));
    }
}

#[tokio::test]
async fn test_direct_and_batch_records_share_user_filter() {
    let cell = Orchestrator::new(CellConfig::default()).unwrap();
    cell.submit_direct("A", "JOB_POS1")
        .unwrap()
        .ticket
        .wait()
        .await
        .unwrap();
    cell.submit_batch(&["B", "C"], "JOB_POS1")
        .unwrap()
        .ticket
        .wait()
        .await
        .unwrap();

    let via_direct = cell.job_records(Some(JobSource::Direct));
    let via_batch = cell.job_records(Some(JobSource::Batch));
    assert_eq!(via_direct.len(), 3);
    assert_eq!(via_direct, via_batch);
    assert_eq!(cell.job_records(None).len(), 3);
}

// ============================================================================
// Test 3: Combined view fallback order
// ============================================================================

#[tokio::test]
async fn test_combined_view_prefers_user_then_scenario_then_ledgers() {
    let cell = Orchestrator::new(CellConfig::default()).unwrap();
    assert_eq!(cell.combined_billing().origin, BillingOrigin::DeviceLedgers);

    cell.run_batch_scenario().unwrap().wait().await.unwrap();
    let combined = cell.combined_billing();
    assert_eq!(combined.origin, BillingOrigin::ScenarioJobs);
    assert_eq!(combined.job_count, 3);

    cell.submit_direct("HI", "JOB_POS1")
        .unwrap()
        .ticket
        .wait()
        .await
        .unwrap();
    let combined = cell.combined_billing();
    assert_eq!(combined.origin, BillingOrigin::UserJobs);
    assert_eq!(combined.job_count, 1);
    assert_eq!(combined.currency, "EUR");
}

// ============================================================================
// Test 4: Reset and history statistics
// ============================================================================

#[tokio::test]
async fn test_reset_billing_clears_buckets_but_keeps_history() {
    let cell = Orchestrator::new(CellConfig::default()).unwrap();
    cell.run_batch_scenario().unwrap().wait().await.unwrap();

    cell.reset_billing().await;

    assert_eq!(cell.cumulative_billing(), CumulativeBilling::default());
    assert!(cell.job_records(None).is_empty());
    let combined = cell.combined_billing();
    assert_eq!(combined.origin, BillingOrigin::DeviceLedgers);
    assert_eq!(combined.total_cost, 0.0);
    assert_eq!(cell.history(None).len(), 1);
}

#[tokio::test]
async fn test_history_stats_cover_completed_runs() {
    let cell = Orchestrator::new(CellConfig::default()).unwrap();
    let a = cell.submit_direct("HI", "JOB_POS2").unwrap().ticket.wait().await.unwrap();
    let b = cell.run_batch_scenario().unwrap().wait().await.unwrap();

    let stats = cell.history_stats();
    assert_eq!(stats.total_runs, 2);
    assert_eq!(stats.completed_runs, 2);
    assert_eq!(stats.error_runs, 0);
    assert_eq!(stats.total_jobs, 4);

    let total = a.cycle_summary.unwrap().combined_cost + b.cycle_summary.unwrap().combined_cost;
    assert!(approx(stats.total_cost, total));
    assert!(approx(stats.avg_cost_per_run, total / 2.0));

    let history = cell.history(None);
    assert_eq!(history[0].run_id, b.run_id);
    assert!(history.iter().all(|e| e.status == RunStatus::Completed));

    let export = cell.export_history_json(Some(1)).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&export).unwrap();
    assert_eq!(parsed["total_runs"], 1);
}
