//! Error taxonomy for the cycle engine
//!
//! `InvalidSite` and `NoMatchingJobs` are reported synchronously when a job
//! is enqueued or a cycle is triggered. `SimulationFault` only surfaces
//! asynchronously, through the terminal status of the run entry that
//! tracked the failing cycle.

use thiserror::Error;

/// Errors raised by the simulation core
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SimulationError {
    /// Target site missing from the coordinate table
    #[error("Invalid site '{site}'. Available: {available:?}")]
    InvalidSite { site: String, available: Vec<String> },

    /// No queued job targets the requested site
    #[error("No jobs in queue for site {site}")]
    NoMatchingJobs { site: String },

    /// Unexpected failure inside a motion or engraving tick loop
    #[error("Simulation fault: {0}")]
    SimulationFault(String),

    /// Configuration rejected by validation
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// Submission rejected before anything was enqueued
    #[error("Invalid submission: {0}")]
    InvalidSubmission(String),

    /// Unknown run identifier
    #[error("Run '{0}' not found")]
    RunNotFound(String),

    /// Serialization or deserialization failure
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Snapshot failed integrity checks
    #[error("State validation error: {0}")]
    StateValidationError(String),
}

impl From<serde_json::Error> for SimulationError {
    fn from(err: serde_json::Error) -> Self {
        SimulationError::SerializationError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_site_lists_available_sites() {
        let err = SimulationError::InvalidSite {
            site: "JOB_POS9".to_string(),
            available: vec!["HOME".to_string(), "DOCK".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "Invalid site 'JOB_POS9'. Available: [\"HOME\", \"DOCK\"]"
        );
    }
}
