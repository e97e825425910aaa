//! CLI command implementations

pub mod measure;
pub mod reports;
