//! Error taxonomy for the measurement pipeline
//!
//! Per-pod problems (fetch failures, counter resets, disappearance) are
//! absorbed and recorded where they occur; only failures that make a whole
//! measurement window meaningless surface through these types.

use thiserror::Error;

/// Errors that abort a measurement window.
#[derive(Debug, Error)]
pub enum MeterError {
    /// The node list could not be obtained, so no snapshot is possible.
    #[error("failed to list cluster nodes: {0}")]
    NodeList(#[source] anyhow::Error),

    /// Every node's stats query failed; a snapshot with zero sources is a
    /// total collection failure, not a partial one.
    #[error("all {nodes} node stats queries failed")]
    AllNodesFailed { nodes: usize },

    /// A snapshot contained no pods at all.
    #[error("snapshot taken at {taken_at} contains no pods")]
    EmptySnapshot { taken_at: String },

    /// The two snapshots are not time-ordered.
    #[error("non-positive elapsed time between snapshots ({elapsed_seconds}s)")]
    NonPositiveElapsed { elapsed_seconds: f64 },

    #[error("failed to write results: {0}")]
    Sink(#[from] std::io::Error),
}
