//! Parsers for external measurement artifacts
//!
//! Load-generator text reports and PCM memory-bandwidth CSVs arrive as
//! loosely structured files produced by other tools. Both parsers here are
//! tolerant: absent or malformed sections yield `None` fields rather than
//! errors, so one bad artifact never aborts a measurement run.

pub mod loadgen;
pub mod pcm;

pub use loadgen::{parse as parse_load_report, LoadReport};
pub use pcm::{parse_memory_bandwidth, MemoryBandwidth};
