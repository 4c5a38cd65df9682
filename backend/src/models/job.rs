//! Engraving job model
//!
//! A job is immutable once created. It sits in the queue until exactly one
//! cycle takes it, and is discarded after processing.

use serde::{Deserialize, Serialize};

/// Text-engraving order waiting for a cycle
///
/// # Example
/// ```
/// use cell_simulator_core_rs::Job;
///
/// let job = Job::new("E-1001", "HELLO", "JOB_POS1");
/// assert_eq!(job.letter_count(), 5);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    order_id: String,
    text: String,
    target_site: String,
}

impl Job {
    pub fn new(
        order_id: impl Into<String>,
        text: impl Into<String>,
        target_site: impl Into<String>,
    ) -> Self {
        Self {
            order_id: order_id.into(),
            text: text.into(),
            target_site: target_site.into(),
        }
    }

    pub fn order_id(&self) -> &str {
        &self.order_id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn target_site(&self) -> &str {
        &self.target_site
    }

    /// Characters to engrave, whitespace and punctuation included
    pub fn letter_count(&self) -> usize {
        self.text.chars().count()
    }
}

/// Who submitted the jobs processed by a cycle
///
/// Decides which cumulative billing bucket the cycle is folded into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobSource {
    /// Single job submitted directly by a user
    Direct,

    /// Several user jobs for one site submitted together
    Batch,

    /// Scripted demonstration scenario
    Scenario,
}

impl JobSource {
    /// Organic submissions (as opposed to scripted scenarios)
    pub fn is_user(&self) -> bool {
        matches!(self, JobSource::Direct | JobSource::Batch)
    }
}
