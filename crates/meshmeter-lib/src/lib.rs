//! # meshmeter-lib
//!
//! Core library for measuring the resource overhead of a service mesh on a
//! Kubernetes cluster. A measurement window captures two cluster-wide
//! snapshots of cumulative per-pod counters (CPU, network) and memory
//! gauges, then converts counter deltas into rates: CPU millicores split
//! between application and sidecar containers, network KiB/s, memory MiB.
//!
//! ## Architecture
//!
//! - **collector**: assembles snapshots from the kubelet stats summary and
//!   per-pod `/proc/net/dev` reads, with bounded-parallel network fetches
//! - **delta**: snapshot-pair rate estimation with a strict drop policy for
//!   pods whose counters reset or that disappear mid-window
//! - **window**: the capture/hold/capture driver
//! - **report**: tolerant parsers for load-generator and PCM artifacts
//! - **sink**: append-only CSV outputs
//!
//! Sources sit behind the [`collector::NodeStatsSource`] and
//! [`collector::PodNetSource`] traits so tests substitute fakes for the
//! cluster.

pub mod collector;
pub mod config;
pub mod delta;
pub mod error;
pub mod models;
pub mod naming;
pub mod observability;
pub mod report;
pub mod sink;
pub mod window;

pub use collector::SnapshotCollector;
pub use config::NamespacePolicy;
pub use error::MeterError;
pub use models::{DeltaRecord, DropReason, PodId, Snapshot, WindowReport};
pub use observability::MeterMetrics;
