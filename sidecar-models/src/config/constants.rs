// Copyright (c) 2022 MASSA LABS <info@massa.net>

use std::time::Duration;

/// JSON-RPC port nodes listen on when none is given
pub const DEFAULT_RPC_PORT: u16 = 5005;
/// Bound on a single node query
pub const DEFAULT_RPC_TIMEOUT: Duration = Duration::from_secs(2);
/// Seconds between two health check passes
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(15);
/// Shortest pause between two passes, even when a pass overran the interval
pub const DEFAULT_MIN_SLEEP: Duration = Duration::from_secs(1);
/// Number of passes a node may keep the same validated ledger without alarming
pub const DEFAULT_STALL_TOLERANCE: u64 = 1;
/// Stalls below this ledger index are not escalated (network start-up)
pub const DEFAULT_MIN_INDEX_FOR_ALERT: u64 = 0;
/// Pause between two ledger queries while waiting for a ledger to close
pub const DEFAULT_CLOSE_POLL_INTERVAL: Duration = Duration::from_secs(3);
/// Give up waiting for a ledger to close after this long
pub const DEFAULT_CLOSE_TIMEOUT: Duration = Duration::from_secs(60);
/// Prometheus endpoint
pub const DEFAULT_METRICS_BIND: &str = "0.0.0.0:9898";
/// Environment variable pointing at the Antithesis output directory
pub const ANTITHESIS_OUTPUT_DIR_ENV: &str = "ANTITHESIS_OUTPUT_DIR";
/// File name the SDK sink writes into the output directory
pub const ANTITHESIS_OUTPUT_FILE: &str = "sdk.jsonl";
/// Qualifier of the per-user configuration directory
pub const USER_CONFIG_QUALIFIER: &str = "org";
/// Organization of the per-user configuration directory
pub const USER_CONFIG_ORGANIZATION: &str = "ValidatorSidecar";
