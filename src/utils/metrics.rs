use std::collections::BTreeMap;
use std::fmt::Write;
use std::sync::Arc;

use lazy_static::lazy_static;
use parking_lot::Mutex;

pub const RESOLVED_LOCALLY: &str = "signer_provider_resolved_locally_total";
pub const FORWARDED: &str = "signer_provider_forwarded_total";
pub const TX_SUBMITTED: &str = "signer_provider_tx_submitted_total";
pub const TX_RELAYED: &str = "signer_provider_tx_relayed_total";
pub const TX_FAILED: &str = "signer_provider_tx_failed_total";
pub const QUEUE_DEPTH: &str = "signer_provider_queue_depth";

/// Metrics registry (simple, Prometheus-style)
#[derive(Clone, Default)]
pub struct MetricsRegistry {
    counters: Arc<Mutex<BTreeMap<String, u64>>>,
    gauges: Arc<Mutex<BTreeMap<String, f64>>>,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc_counter(&self, name: &str) {
        *self.counters.lock().entry(name.to_string()).or_insert(0) += 1;
    }

    pub fn set_gauge(&self, name: &str, val: f64) {
        self.gauges.lock().insert(name.to_string(), val);
    }

    pub fn counter(&self, name: &str) -> u64 {
        self.counters.lock().get(name).copied().unwrap_or(0)
    }

    /// Text exposition format, one sample per line.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for (name, value) in self.counters.lock().iter() {
            let _ = writeln!(out, "# TYPE {name} counter\n{name} {value}");
        }
        for (name, value) in self.gauges.lock().iter() {
            let _ = writeln!(out, "# TYPE {name} gauge\n{name} {value}");
        }
        out
    }
}

lazy_static! {
    pub static ref METRICS: MetricsRegistry = MetricsRegistry::new();
}
