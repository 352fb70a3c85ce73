// Copyright (c) 2022 MASSA LABS <info@massa.net>
//! Build here the default sidecar settings from the configuration file toml

use serde::Deserialize;
use sidecar_health_exports::HealthConfig;
use sidecar_models::config::{
    build_sidecar_settings, DEFAULT_CLOSE_POLL_INTERVAL, DEFAULT_CLOSE_TIMEOUT,
    DEFAULT_METRICS_BIND, DEFAULT_MIN_INDEX_FOR_ALERT, DEFAULT_MIN_SLEEP, DEFAULT_POLL_INTERVAL,
    DEFAULT_RPC_PORT, DEFAULT_RPC_TIMEOUT, DEFAULT_STALL_TOLERANCE,
};
use sidecar_models::{LedgerIndex, NodeId};
use sidecar_sdk::RpcConfig;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: usize,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        LoggingSettings { level: 2 }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct HealthSettings {
    pub nodes: Vec<NodeId>,
    pub interval_secs: u64,
    pub min_sleep_ms: u64,
    pub tolerance: u64,
    pub min_index_for_alert: LedgerIndex,
    pub max_cycles: u64,
    pub fetch_server_state: bool,
}

impl Default for HealthSettings {
    fn default() -> Self {
        HealthSettings {
            nodes: Vec::new(),
            interval_secs: DEFAULT_POLL_INTERVAL.as_secs(),
            min_sleep_ms: DEFAULT_MIN_SLEEP.as_millis() as u64,
            tolerance: DEFAULT_STALL_TOLERANCE,
            min_index_for_alert: DEFAULT_MIN_INDEX_FOR_ALERT,
            max_cycles: 0,
            fetch_server_state: true,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RpcSettings {
    pub port: u16,
    pub timeout_ms: u64,
}

impl Default for RpcSettings {
    fn default() -> Self {
        RpcSettings {
            port: DEFAULT_RPC_PORT,
            timeout_ms: DEFAULT_RPC_TIMEOUT.as_millis() as u64,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct MetricsSettings {
    pub enabled: bool,
    pub bind: String,
}

impl Default for MetricsSettings {
    fn default() -> Self {
        MetricsSettings {
            enabled: false,
            bind: DEFAULT_METRICS_BIND.to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct EventsSettings {
    pub file: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ClosingSettings {
    pub poll_interval_ms: u64,
    pub timeout_secs: u64,
}

impl Default for ClosingSettings {
    fn default() -> Self {
        ClosingSettings {
            poll_interval_ms: DEFAULT_CLOSE_POLL_INTERVAL.as_millis() as u64,
            timeout_secs: DEFAULT_CLOSE_TIMEOUT.as_secs(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Settings {
    pub logging: LoggingSettings,
    pub health: HealthSettings,
    pub rpc: RpcSettings,
    pub metrics: MetricsSettings,
    pub events: EventsSettings,
    pub closing: ClosingSettings,
}

/// Values given on the command line, applied over the configuration files
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub nodes: Vec<NodeId>,
    pub interval_secs: Option<u64>,
    pub tolerance: Option<u64>,
    pub min_index_for_alert: Option<LedgerIndex>,
    pub max_cycles: Option<u64>,
    pub port: Option<u16>,
    pub timeout_ms: Option<u64>,
    pub events_file: Option<PathBuf>,
}

impl Settings {
    /// Settings from the configuration layers, see `build_sidecar_settings`
    pub fn load() -> Result<Settings, config::ConfigError> {
        build_sidecar_settings("sidecar", "SIDECAR")
    }

    pub fn apply(&mut self, overrides: Overrides) {
        if !overrides.nodes.is_empty() {
            self.health.nodes = overrides.nodes;
        }
        if let Some(interval_secs) = overrides.interval_secs {
            self.health.interval_secs = interval_secs;
        }
        if let Some(tolerance) = overrides.tolerance {
            self.health.tolerance = tolerance;
        }
        if let Some(min_index) = overrides.min_index_for_alert {
            self.health.min_index_for_alert = min_index;
        }
        if let Some(max_cycles) = overrides.max_cycles {
            self.health.max_cycles = max_cycles;
        }
        if let Some(port) = overrides.port {
            self.rpc.port = port;
        }
        if let Some(timeout_ms) = overrides.timeout_ms {
            self.rpc.timeout_ms = timeout_ms;
        }
        if overrides.events_file.is_some() {
            self.events.file = overrides.events_file;
        }
    }

    pub fn health_config(&self) -> HealthConfig {
        HealthConfig {
            nodes: self.health.nodes.clone(),
            interval: Duration::from_secs(self.health.interval_secs),
            min_sleep: Duration::from_millis(self.health.min_sleep_ms),
            tolerance: self.health.tolerance,
            min_index_for_alert: self.health.min_index_for_alert,
            max_cycles: self.health.max_cycles,
            fetch_server_state: self.health.fetch_server_state,
        }
    }

    pub fn rpc_config(&self) -> RpcConfig {
        RpcConfig {
            port: self.rpc.port,
            timeout: Duration::from_millis(self.rpc.timeout_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_settings() -> Settings {
        config::Config::builder()
            .add_source(config::File::from_str(
                include_str!("../base_config/config.toml"),
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn test_base_config_matches_defaults() {
        let settings = base_settings();
        let defaults = Settings::default();
        assert_eq!(settings.logging.level, defaults.logging.level);
        assert_eq!(settings.health.interval_secs, 15);
        assert_eq!(settings.health.tolerance, 1);
        assert_eq!(settings.health.min_sleep_ms, defaults.health.min_sleep_ms);
        assert_eq!(settings.rpc.port, defaults.rpc.port);
        assert_eq!(settings.rpc.timeout_ms, defaults.rpc.timeout_ms);
        assert_eq!(settings.metrics.bind, defaults.metrics.bind);
        assert_eq!(settings.closing.poll_interval_ms, 3000);
        assert!(settings.events.file.is_none());
        assert!(settings.health.nodes.is_empty());
    }

    #[test]
    fn test_overrides() {
        let mut settings = base_settings();
        settings.apply(Overrides {
            nodes: vec![NodeId::new("val1"), NodeId::new("val2:6006")],
            interval_secs: Some(5),
            tolerance: Some(3),
            max_cycles: Some(10),
            timeout_ms: Some(500),
            ..Default::default()
        });

        let health = settings.health_config();
        assert_eq!(health.nodes.len(), 2);
        assert_eq!(health.interval, Duration::from_secs(5));
        assert_eq!(health.tolerance, 3);
        assert_eq!(health.min_index_for_alert, 0);
        assert_eq!(health.max_cycles, 10);
        assert_eq!(health.min_sleep, DEFAULT_MIN_SLEEP);

        let rpc = settings.rpc_config();
        assert_eq!(rpc.port, DEFAULT_RPC_PORT);
        assert_eq!(rpc.timeout, Duration::from_millis(500));
    }

    #[test]
    fn test_empty_overrides_keep_files() {
        let mut settings = base_settings();
        settings.health.nodes = vec![NodeId::new("from-file")];
        settings.apply(Overrides::default());
        assert_eq!(settings.health.nodes, vec![NodeId::new("from-file")]);
        assert_eq!(settings.health.interval_secs, 15);
    }
}
