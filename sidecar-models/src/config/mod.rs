//! Default values and settings loading
//!
//! The name "constant" is used for hard-coded default values. When you need
//! one of these values in a worker, read it from the `cfg` parameter
//! instead: only `settings.rs` and `config.rs` files should import them.

/// Hard-coded defaults
pub mod constants;
/// Layered settings loader
pub mod sidecar_settings;

pub use constants::*;
pub use sidecar_settings::{build_sidecar_settings, user_config_path};
