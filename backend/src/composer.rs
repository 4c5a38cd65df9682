//! Submission composer
//!
//! User-facing entry points that build jobs from plain texts, queue them
//! and start a tracked cycle sized to exactly those jobs. Direct and batch
//! submissions are billed to the user bucket.

use crate::error::SimulationError;
use crate::models::job::{Job, JobSource};
use crate::orchestrator::engine::{CycleTicket, Orchestrator};
use chrono::Utc;
use std::sync::atomic::Ordering;

/// Longest accepted order text, in characters
pub const MAX_TEXT_LEN: usize = 50;

/// Most jobs accepted in one batch submission
pub const MAX_BATCH_JOBS: usize = 5;

/// Accepted submission with its generated order ids
pub struct Submission {
    pub order_ids: Vec<String>,
    pub ticket: CycleTicket,
}

fn check_text(text: &str) -> Result<(), SimulationError> {
    let len = text.chars().count();
    if len == 0 || len > MAX_TEXT_LEN {
        return Err(SimulationError::InvalidSubmission(format!(
            "text must be 1..={} characters, got {}",
            MAX_TEXT_LEN, len
        )));
    }
    Ok(())
}

impl Orchestrator {
    /// `<prefix>-<MMDDHHMM><seq>` with a three-digit rolling sequence
    fn next_order_stem(&self, prefix: &str) -> String {
        let seq = self.shared.submission_seq.fetch_add(1, Ordering::SeqCst) % 1000;
        format!("{}-{}{:03}", prefix, Utc::now().format("%m%d%H%M"), seq)
    }

    /// Queue one job and run it in its own cycle
    pub fn submit_direct(&self, text: &str, site: &str) -> Result<Submission, SimulationError> {
        check_text(text)?;
        self.config().coords.resolve(site)?;

        let order_id = self.next_order_stem("D");
        self.enqueue(Job::new(order_id.clone(), text, site))?;

        let run = self.plan_run("direct", &order_id, site, Some(1), JobSource::Direct);
        Ok(Submission {
            order_ids: vec![order_id],
            ticket: self.ticket_for(run),
        })
    }

    /// Queue up to five jobs for one site and run them in a single cycle
    pub fn submit_batch(&self, texts: &[&str], site: &str) -> Result<Submission, SimulationError> {
        if texts.is_empty() || texts.len() > MAX_BATCH_JOBS {
            return Err(SimulationError::InvalidSubmission(format!(
                "batch must hold 1..={} jobs, got {}",
                MAX_BATCH_JOBS,
                texts.len()
            )));
        }
        for text in texts {
            check_text(text)?;
        }
        self.config().coords.resolve(site)?;

        let stem = self.next_order_stem("B");
        let order_ids: Vec<String> = (1..=texts.len())
            .map(|i| format!("{}{:02}", stem, i))
            .collect();
        for (order_id, text) in order_ids.iter().zip(texts) {
            self.enqueue(Job::new(order_id.clone(), *text, site))?;
        }

        let qualifier = format!("{}jobs", texts.len());
        let run = self.plan_run("batch", &qualifier, site, Some(texts.len()), JobSource::Batch);
        Ok(Submission {
            order_ids,
            ticket: self.ticket_for(run),
        })
    }
}
