// Copyright (c) 2022 MASSA LABS <info@massa.net>
//! Health worker: polls the validators, detects stalls and regressions,
//! and reports events and assertions after every pass.

#![warn(missing_docs)]
#![warn(unused_crate_dependencies)]

mod checks;
mod manager;
mod poller;
mod reporter;
mod run;
mod stall_detector;
mod worker;

pub use checks::{check_closing, check_node_closing, check_sync, wait_for_ledger_close, ClosingError};
pub use manager::HealthManagerImpl;
pub use poller::poll;
pub use reporter::{FanoutReporter, JsonlReporter, TracingReporter};
pub use run::start_health_worker;
pub use stall_detector::evaluate;

#[cfg(test)]
mod tests;
