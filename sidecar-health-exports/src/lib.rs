// Copyright (c) 2022 MASSA LABS <info@massa.net>
//! Definition and exports of the health check types, traits and errors.
//!
//! The health worker polls every configured node once per pass, keeps a
//! `NodeState` per node across passes and reports a `CycleSummary` to a
//! `HealthReporter` after each pass.

#![warn(missing_docs)]

mod config;
mod controller_traits;
mod error;
mod types;

pub use config::HealthConfig;
pub use controller_traits::{HealthManager, HealthReporter};
pub use error::{HealthError, HealthResult};
pub use types::*;

#[cfg(any(test, feature = "test-exports"))]
pub use controller_traits::MockHealthReporter;

/// Tests utils
#[cfg(feature = "test-exports")]
pub mod test_exports;
