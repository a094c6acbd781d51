//! Loan closing document generation.
//!
//! Rule evaluation picks which templates a loan needs, the template processor
//! merges loan data into each block/leaf tree, and the merge orchestrator runs
//! those merges under a concurrency bound while trackers aggregate each loan's
//! package.

pub mod config;
pub mod error;
pub mod merge;
pub mod package;
pub mod rules;
pub mod telemetry;
pub mod template;
