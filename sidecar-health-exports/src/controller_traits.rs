// Copyright (c) 2022 MASSA LABS <info@massa.net>

//! This module exports generic traits representing interfaces for interacting
//! with the health worker and the event sink it reports to.

use serde_json::Value;

/// Event and assertion sink the health worker reports to.
///
/// Persistence, sampling and alert routing are up to the implementation. A
/// sink that fails to record must not fail the caller.
#[cfg_attr(any(test, feature = "test-exports"), mockall::automock)]
pub trait HealthReporter: Send + Sync {
    /// Record a structured event
    fn emit_event(&self, name: &str, payload: &Value);

    /// Record the evaluation of a property that must hold every time it is checked
    fn assert_always(&self, condition: bool, message: &str, payload: &Value);
}

/// Health manager used to stop the health worker thread
pub trait HealthManager {
    /// Stop the health worker thread after its in-flight pass.
    /// Note that we do not take self by value to consume it
    /// because it is not allowed to move out of Box<dyn HealthManager>
    fn stop(&mut self);

    /// Number of passes completed so far
    fn completed_cycles(&self) -> u64;
}
