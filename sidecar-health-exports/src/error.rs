use displaydoc::Display;
use thiserror::Error;

/// health worker result
pub type HealthResult<T, E = HealthError> = core::result::Result<T, E>;

/// health worker error
#[non_exhaustive]
#[derive(Display, Error, Debug)]
pub enum HealthError {
    /// no node to poll
    NoNodes,
    /// invalid configuration: {0}
    InvalidConfig(String),
    /// could not start the health worker: {0}
    Startup(String),
}
