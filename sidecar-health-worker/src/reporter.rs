// Copyright (c) 2022 MASSA LABS <info@massa.net>

//! Event sinks

use parking_lot::Mutex;
use serde_json::{json, Value};
use sidecar_health_exports::{
    HealthReporter, ASSERT_NEVER_STALLED, ASSERT_NOT_ALL_STALLED, ASSERT_NO_REGRESSION,
};
use std::fs::{File, OpenOptions};
use std::io::{LineWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{error, info, trace, warn};

/// Reports to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl HealthReporter for TracingReporter {
    fn emit_event(&self, name: &str, payload: &Value) {
        info!("EVENT | {}: {}", name, payload);
    }

    fn assert_always(&self, condition: bool, message: &str, payload: &Value) {
        if condition {
            trace!("ASSERT | holds: {}", message);
        } else {
            error!("ASSERT | violated: {} {}", message, payload);
        }
    }
}

/// Appends one JSON object per line to a file, in the format read by the
/// Antithesis platform: `{"<event>": payload}` for events and
/// `{"antithesis_assert": {...}}` for assertions.
pub struct JsonlReporter {
    path: PathBuf,
    writer: Mutex<LineWriter<File>>,
}

impl JsonlReporter {
    /// Open `path` for appending and declare the assertions the health
    /// worker evaluates, so that one never evaluated shows up as such.
    pub fn create(path: &Path) -> std::io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let reporter = JsonlReporter {
            path: path.to_path_buf(),
            writer: Mutex::new(LineWriter::new(file)),
        };
        for message in [
            ASSERT_NEVER_STALLED,
            ASSERT_NOT_ALL_STALLED,
            ASSERT_NO_REGRESSION,
        ] {
            reporter.write_line(&assertion_line(false, true, message, &Value::Null));
        }
        Ok(reporter)
    }

    fn write_line(&self, line: &Value) {
        let mut writer = self.writer.lock();
        if let Err(e) = writeln!(writer, "{}", line) {
            warn!("could not write event to {}: {}", self.path.display(), e);
        }
    }
}

fn assertion_line(hit: bool, condition: bool, message: &str, details: &Value) -> Value {
    json!({
        "antithesis_assert": {
            "assert_type": "always",
            "display_type": "Always",
            "condition": condition,
            "hit": hit,
            "must_hit": true,
            "id": message,
            "message": message,
            "location": {
                "class": "",
                "function": "health_check",
                "file": file!(),
                "begin_line": 0,
                "begin_column": 0,
            },
            "details": details,
        }
    })
}

impl HealthReporter for JsonlReporter {
    fn emit_event(&self, name: &str, payload: &Value) {
        self.write_line(&json!({ name: payload }));
    }

    fn assert_always(&self, condition: bool, message: &str, payload: &Value) {
        self.write_line(&assertion_line(true, condition, message, payload));
    }
}

/// Forwards everything to several sinks
pub struct FanoutReporter(pub Vec<Box<dyn HealthReporter>>);

impl HealthReporter for FanoutReporter {
    fn emit_event(&self, name: &str, payload: &Value) {
        for reporter in &self.0 {
            reporter.emit_event(name, payload);
        }
    }

    fn assert_always(&self, condition: bool, message: &str, payload: &Value) {
        for reporter in &self.0 {
            reporter.assert_always(condition, message, payload);
        }
    }
}
