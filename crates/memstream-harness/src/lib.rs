//! Scenario harness for the memstream backends.
//!
//! This crate provides:
//! - Fixtures: JSON scenario sets describing an initial buffer, an open
//!   mode, a sequence of stream operations, and the expected final buffer
//! - Runner: executes scenarios against the memory and string backends
//! - Structured logging: JSONL records per operation plus an artifact index
//!   of final buffer digests

#![forbid(unsafe_code)]

pub mod fixtures;
pub mod runner;
pub mod structured_log;

pub use fixtures::{FixtureSet, Scenario};
pub use runner::{RunSummary, ScenarioResult, ScenarioRunner};
