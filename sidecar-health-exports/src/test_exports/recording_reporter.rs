use crate::HealthReporter;
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;

/// Something the health worker reported
#[derive(Debug, Clone, PartialEq)]
pub enum Recorded {
    #[allow(missing_docs)]
    Event {
        name: String,
        payload: Value,
    },
    #[allow(missing_docs)]
    Assertion {
        condition: bool,
        message: String,
        payload: Value,
    },
}

/// `HealthReporter` keeping everything in memory. Clones share the record.
#[derive(Clone, Default)]
pub struct RecordingReporter {
    records: Arc<Mutex<Vec<Recorded>>>,
}

impl RecordingReporter {
    /// Empty record
    pub fn new() -> Self {
        Default::default()
    }

    /// Everything reported so far
    pub fn records(&self) -> Vec<Recorded> {
        self.records.lock().clone()
    }

    /// Payloads of the events with that name, in emission order
    pub fn events(&self, name: &str) -> Vec<Value> {
        self.records
            .lock()
            .iter()
            .filter_map(|record| match record {
                Recorded::Event { name: n, payload } if n == name => Some(payload.clone()),
                _ => None,
            })
            .collect()
    }

    /// Conditions of the assertions with that message, in emission order
    pub fn assertions(&self, message: &str) -> Vec<bool> {
        self.records
            .lock()
            .iter()
            .filter_map(|record| match record {
                Recorded::Assertion {
                    condition,
                    message: m,
                    ..
                } if m == message => Some(*condition),
                _ => None,
            })
            .collect()
    }
}

impl HealthReporter for RecordingReporter {
    fn emit_event(&self, name: &str, payload: &Value) {
        self.records.lock().push(Recorded::Event {
            name: name.to_string(),
            payload: payload.clone(),
        });
    }

    fn assert_always(&self, condition: bool, message: &str, payload: &Value) {
        self.records.lock().push(Recorded::Assertion {
            condition,
            message: message.to_string(),
            payload: payload.clone(),
        });
    }
}
