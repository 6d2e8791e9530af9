//! Prometheus metrics for the ledger core.
//!
//! All metrics follow the naming convention: `dc_<subsystem>_<metric>_<unit>`

use lazy_static::lazy_static;
use prometheus::{Counter, CounterVec, Encoder, Gauge, IntGauge, Opts, Registry, TextEncoder};

use crate::TelemetryError;

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    // =========================================================================
    // TRANSACTION POOL METRICS (Subsystem 2)
    // =========================================================================

    /// Current pool size (transaction count)
    pub static ref POOL_SIZE: IntGauge = IntGauge::new(
        "dc_pool_transactions_pending",
        "Number of transactions waiting in the pool"
    ).expect("metric creation failed");

    /// Transactions admitted to the pool
    pub static ref TRANSACTIONS_ACCEPTED: Counter = Counter::new(
        "dc_pool_transactions_accepted_total",
        "Total transactions admitted to the pool"
    ).expect("metric creation failed");

    /// Transactions refused, by admission error code
    pub static ref TRANSACTIONS_REJECTED: CounterVec = CounterVec::new(
        Opts::new("dc_pool_transactions_rejected_total", "Transactions refused by the pool"),
        &["code"]
    ).expect("metric creation failed");

    /// Senders purged and blocked after a failed re-application
    pub static ref SENDERS_BLOCKED: Counter = Counter::new(
        "dc_pool_senders_blocked_total",
        "Senders purged and temporarily blocked"
    ).expect("metric creation failed");

    // =========================================================================
    // BLOCKCHAIN METRICS (Subsystem 3)
    // =========================================================================

    /// Blocks applied to the confirmed ledger
    pub static ref BLOCKS_APPLIED: Counter = Counter::new(
        "dc_chain_blocks_applied_total",
        "Total blocks applied to the wallet ledger"
    ).expect("metric creation failed");

    /// Blocks reverted by fork recovery
    pub static ref BLOCKS_REVERTED: Counter = Counter::new(
        "dc_chain_blocks_reverted_total",
        "Total blocks reverted during fork recovery"
    ).expect("metric creation failed");

    /// Current chain height
    pub static ref CHAIN_HEIGHT: Gauge = Gauge::new(
        "dc_chain_height",
        "Height of the last applied block"
    ).expect("metric creation failed");

    /// Fork recoveries started
    pub static ref FORK_RECOVERIES: Counter = Counter::new(
        "dc_chain_fork_recoveries_total",
        "Fork recovery rollbacks performed"
    ).expect("metric creation failed");

    // =========================================================================
    // FORGER METRICS (Subsystem 4)
    // =========================================================================

    /// Blocks forged locally
    pub static ref BLOCKS_FORGED: Counter = Counter::new(
        "dc_forger_blocks_forged_total",
        "Blocks forged by local delegates"
    ).expect("metric creation failed");

    /// Forging attempts that failed
    pub static ref FORGING_FAILURES: Counter = Counter::new(
        "dc_forger_failures_total",
        "Forging attempts that failed and were retried"
    ).expect("metric creation failed");
}

/// Register all metrics with the global registry.
pub fn register_metrics() -> Result<(), TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        // Pool
        Box::new(POOL_SIZE.clone()),
        Box::new(TRANSACTIONS_ACCEPTED.clone()),
        Box::new(TRANSACTIONS_REJECTED.clone()),
        Box::new(SENDERS_BLOCKED.clone()),
        // Chain
        Box::new(BLOCKS_APPLIED.clone()),
        Box::new(BLOCKS_REVERTED.clone()),
        Box::new(CHAIN_HEIGHT.clone()),
        Box::new(FORK_RECOVERIES.clone()),
        // Forger
        Box::new(BLOCKS_FORGED.clone()),
        Box::new(FORGING_FAILURES.clone()),
    ];

    for metric in metrics {
        REGISTRY
            .register(metric)
            .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    }

    Ok(())
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_encode() {
        // A second registration in the same process reports AlreadyReg.
        let _ = register_metrics();
        BLOCKS_APPLIED.inc();
        let text = encode_metrics().unwrap();
        assert!(text.contains("dc_chain_blocks_applied_total"));
    }

    #[test]
    fn test_counter_increment() {
        FORK_RECOVERIES.inc();
        assert!(FORK_RECOVERIES.get() >= 1.0);
    }

    #[test]
    fn test_labelled_rejections() {
        TRANSACTIONS_REJECTED.with_label_values(&["ERR_POOL_FULL"]).inc();
        assert!(
            TRANSACTIONS_REJECTED
                .with_label_values(&["ERR_POOL_FULL"])
                .get()
                >= 1.0
        );
    }
}
