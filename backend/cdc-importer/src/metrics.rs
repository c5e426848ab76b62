use prometheus::core::Collector;
use prometheus::{IntCounter, Registry};
use tracing::{info, warn};

/// Counters for the poll loop
#[derive(Clone)]
pub struct PollerMetrics {
    /// Poll calls issued
    pub polls_total: IntCounter,
    /// Commands handed to the sink (successful or not)
    pub commands_sent_total: IntCounter,
    /// Tombstones normalized and dropped
    pub tombstones_suppressed_total: IntCounter,
    pub partition_eof_total: IntCounter,
    pub decode_errors_total: IntCounter,
    pub sink_errors_total: IntCounter,
}

impl PollerMetrics {
    pub fn new() -> Self {
        Self {
            polls_total: IntCounter::new("cdc_importer_polls_total", "Total poll calls")
                .expect("valid metric for cdc_importer_polls_total"),
            commands_sent_total: IntCounter::new(
                "cdc_importer_commands_sent_total",
                "Total commands sent to the importer API",
            )
            .expect("valid metric for cdc_importer_commands_sent_total"),
            tombstones_suppressed_total: IntCounter::new(
                "cdc_importer_tombstones_suppressed_total",
                "Total tombstone events suppressed",
            )
            .expect("valid metric for cdc_importer_tombstones_suppressed_total"),
            partition_eof_total: IntCounter::new(
                "cdc_importer_partition_eof_total",
                "Total end-of-partition events",
            )
            .expect("valid metric for cdc_importer_partition_eof_total"),
            decode_errors_total: IntCounter::new(
                "cdc_importer_decode_errors_total",
                "Total events that failed normalization",
            )
            .expect("valid metric for cdc_importer_decode_errors_total"),
            sink_errors_total: IntCounter::new(
                "cdc_importer_sink_errors_total",
                "Total failed deliveries to the importer API",
            )
            .expect("valid metric for cdc_importer_sink_errors_total"),
        }
    }

    /// Register every counter; already-registered counters are skipped
    pub fn register(&self, registry: &Registry) {
        for metric in [
            Box::new(self.polls_total.clone()) as Box<dyn Collector>,
            Box::new(self.commands_sent_total.clone()),
            Box::new(self.tombstones_suppressed_total.clone()),
            Box::new(self.partition_eof_total.clone()),
            Box::new(self.decode_errors_total.clone()),
            Box::new(self.sink_errors_total.clone()),
        ] {
            if let Err(e) = register_collector(registry, metric) {
                warn!("Failed to register poller metric: {}", e);
            }
        }
    }

    pub fn log_summary(&self) {
        info!(
            polls = self.polls_total.get(),
            commands_sent = self.commands_sent_total.get(),
            tombstones = self.tombstones_suppressed_total.get(),
            partition_eof = self.partition_eof_total.get(),
            decode_errors = self.decode_errors_total.get(),
            sink_errors = self.sink_errors_total.get(),
            "Poller summary"
        );
    }
}

fn register_collector(
    registry: &Registry,
    metric: Box<dyn Collector>,
) -> Result<(), prometheus::Error> {
    match registry.register(metric) {
        Ok(()) | Err(prometheus::Error::AlreadyReg) => Ok(()),
        Err(e) => Err(e),
    }
}

impl Default for PollerMetrics {
    fn default() -> Self {
        Self::new()
    }
}
