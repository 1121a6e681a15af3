//! Shared test utilities for verdict integration tests.
//!
//! This module provides:
//! - `TestHarness` wiring an orchestrator to a memory or SQLite store
//! - Builders and controllable detection units for driving jobs step by step

pub mod builders;
pub mod harness;

pub use builders::*;
pub use harness::{wait_for_completed_tasks, TestHarness};
