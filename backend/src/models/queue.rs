//! Pending job queue
//!
//! FIFO by insertion, filterable by target site. Pure bookkeeping: the
//! queue performs no validation (site checks belong to the caller) and
//! has no billing or device side effects.
//!
//! # Critical Invariants
//!
//! 1. **FIFO**: selection always returns jobs in insertion order
//! 2. **Site isolation**: a batch for a site never contains another site's job
//! 3. **Idempotent selection**: `select_batch` does not remove anything

use crate::models::job::Job;
use std::collections::VecDeque;

/// Ordered collection of jobs waiting for a cycle
///
/// # Example
/// ```
/// use cell_simulator_core_rs::{Job, JobQueue};
///
/// let mut queue = JobQueue::new();
/// queue.enqueue(Job::new("E-1", "A", "JOB_POS1"));
/// queue.enqueue(Job::new("E-2", "B", "JOB_POS2"));
/// queue.enqueue(Job::new("E-3", "C", "JOB_POS1"));
///
/// let batch = queue.select_batch("JOB_POS1", None);
/// assert_eq!(batch.len(), 2);
/// assert_eq!(batch[0].order_id(), "E-1");
/// assert_eq!(queue.len(), 3);
/// ```
#[derive(Debug, Clone, Default)]
pub struct JobQueue {
    jobs: VecDeque<Job>,
}

/// Normalize a batch limit; `None` and `Some(0)` both mean "no limit"
fn effective_limit(limit: Option<usize>) -> usize {
    match limit {
        None | Some(0) => usize::MAX,
        Some(n) => n,
    }
}

impl JobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a queue from a stored job list (checkpoint restore)
    pub fn from_jobs(jobs: Vec<Job>) -> Self {
        Self { jobs: jobs.into() }
    }

    /// Append a job; duplicates are allowed
    pub fn enqueue(&mut self, job: Job) {
        self.jobs.push_back(job);
    }

    /// Up to `limit` queued jobs for `site`, in FIFO order, without removing them
    pub fn select_batch(&self, site: &str, limit: Option<usize>) -> Vec<Job> {
        self.jobs
            .iter()
            .filter(|job| job.target_site() == site)
            .take(effective_limit(limit))
            .cloned()
            .collect()
    }

    /// Remove and return exactly the jobs `select_batch` would return
    pub fn take_batch(&mut self, site: &str, limit: Option<usize>) -> Vec<Job> {
        let limit = effective_limit(limit);
        let mut taken = Vec::new();
        let mut kept = VecDeque::with_capacity(self.jobs.len());

        for job in self.jobs.drain(..) {
            if taken.len() < limit && job.target_site() == site {
                taken.push(job);
            } else {
                kept.push_back(job);
            }
        }

        self.jobs = kept;
        taken
    }

    /// Remove the first job with `order_id`; returns whether one was found
    pub fn remove_by_id(&mut self, order_id: &str) -> bool {
        match self.jobs.iter().position(|job| job.order_id() == order_id) {
            Some(index) => {
                self.jobs.remove(index);
                true
            }
            None => false,
        }
    }

    /// Remove every job; returns how many were removed
    pub fn clear(&mut self) -> usize {
        let count = self.jobs.len();
        self.jobs.clear();
        count
    }

    /// Whether any job targets `site`
    pub fn has_jobs_for(&self, site: &str) -> bool {
        self.jobs.iter().any(|job| job.target_site() == site)
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Queued jobs in FIFO order
    pub fn jobs(&self) -> Vec<Job> {
        self.jobs.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn queue_of(specs: &[(&str, &str)]) -> JobQueue {
        let mut queue = JobQueue::new();
        for (id, site) in specs {
            queue.enqueue(Job::new(*id, "TEXT", *site));
        }
        queue
    }

    #[test]
    fn test_select_respects_limit() {
        let queue = queue_of(&[("E-1", "S1"), ("E-2", "S1"), ("E-3", "S1")]);
        let batch = queue.select_batch("S1", Some(2));
        let ids: Vec<_> = batch.iter().map(|j| j.order_id()).collect();
        assert_eq!(ids, vec!["E-1", "E-2"]);
    }

    #[test]
    fn test_zero_limit_means_unlimited() {
        let queue = queue_of(&[("E-1", "S1"), ("E-2", "S1")]);
        assert_eq!(queue.select_batch("S1", Some(0)).len(), 2);
    }

    #[test]
    fn test_take_batch_removes_only_selected() {
        let mut queue = queue_of(&[("E-1", "S1"), ("E-2", "S2"), ("E-3", "S1"), ("E-4", "S1")]);
        let taken = queue.take_batch("S1", Some(2));

        let taken_ids: Vec<_> = taken.iter().map(|j| j.order_id().to_string()).collect();
        assert_eq!(taken_ids, vec!["E-1", "E-3"]);

        let left: Vec<_> = queue.jobs().iter().map(|j| j.order_id().to_string()).collect();
        assert_eq!(left, vec!["E-2", "E-4"]);
    }

    #[test]
    fn test_remove_by_id_removes_first_match_only() {
        let mut queue = queue_of(&[("E-1", "S1"), ("E-1", "S2")]);
        assert!(queue.remove_by_id("E-1"));
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.jobs()[0].target_site(), "S2");
        assert!(!queue.remove_by_id("E-9"));
    }

    #[test]
    fn test_clear_returns_count() {
        let mut queue = queue_of(&[("E-1", "S1"), ("E-2", "S2")]);
        assert_eq!(queue.clear(), 2);
        assert!(queue.is_empty());
        assert_eq!(queue.clear(), 0);
    }

    proptest! {
        #[test]
        fn prop_select_batch_is_site_pure_and_idempotent(
            sites in proptest::collection::vec(0u8..3, 0..30),
            limit in proptest::option::of(0usize..5),
        ) {
            let mut queue = JobQueue::new();
            for (i, s) in sites.iter().enumerate() {
                queue.enqueue(Job::new(format!("E-{}", i), "X", format!("S{}", s)));
            }

            let first = queue.select_batch("S1", limit);
            let second = queue.select_batch("S1", limit);

            prop_assert_eq!(&first, &second);
            prop_assert!(first.iter().all(|j| j.target_site() == "S1"));
            prop_assert_eq!(queue.len(), sites.len());

            let taken = queue.take_batch("S1", limit);
            prop_assert_eq!(taken, first);
        }
    }
}
