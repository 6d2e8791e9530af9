//! # Delegate-Chain Telemetry
//!
//! Logging and metrics shared by every subsystem.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use dc_telemetry::{init_telemetry, TelemetryConfig};
//!
//! let config = TelemetryConfig::from_env();
//! init_telemetry(&config)?;
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `DC_LOG_LEVEL` | `info` | Log level filter |
//! | `DC_JSON_LOGS` | `false` | JSON log lines |
//! | `DC_NETWORK` | `devnet` | Network name |

mod config;
mod logging;
pub mod metrics;

pub use config::TelemetryConfig;
pub use logging::init_logging;
pub use metrics::{
    encode_metrics, register_metrics, BLOCKS_APPLIED, BLOCKS_FORGED, BLOCKS_REVERTED,
    CHAIN_HEIGHT, FORGING_FAILURES, FORK_RECOVERIES, POOL_SIZE, SENDERS_BLOCKED,
    TRANSACTIONS_ACCEPTED, TRANSACTIONS_REJECTED,
};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Failed to initialize logger: {0}")]
    LoggerInit(String),

    #[error("Failed to initialize Prometheus metrics: {0}")]
    MetricsInit(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Initialize metrics and logging.
pub fn init_telemetry(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    register_metrics()?;
    init_logging(config)
}
