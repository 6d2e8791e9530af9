//! # Delegate-Chain Node Runtime
//!
//! The main entry point for a Delegate-Chain node.
//!
//! ## Startup Sequence
//!
//! 1. Initialise logging and metrics
//! 2. Load configuration (`DC_CONFIG`, or defaults)
//! 3. Build the genesis block and wire the subsystems
//! 4. Start the forger when delegate secrets are configured
//! 5. Run the blockchain state machine until `exit`, `stopped` or Ctrl-C
//!
//! The process exits with status 1 when the state machine ends in `exit`.

use std::sync::Arc;

use anyhow::{Context, Result};
use dc_03_blockchain::{BlockchainApi, BlockchainEvent, BlockchainStateMachine, ChainState};
use dc_telemetry::{init_telemetry, TelemetryConfig};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info};

use node_runtime::container::{NodeConfig, SubsystemContainer};

/// The main node runtime orchestrating all subsystems.
pub struct NodeRuntime {
    container: SubsystemContainer,
    blockchain: BlockchainStateMachine,
    tasks: Vec<JoinHandle<()>>,
    /// Shutdown signal sender.
    shutdown_tx: watch::Sender<bool>,
    /// Shutdown signal receiver.
    shutdown_rx: watch::Receiver<bool>,
}

impl NodeRuntime {
    pub async fn new(config: NodeConfig) -> Result<Self> {
        info!("Creating Delegate-Chain node runtime");

        let container = SubsystemContainer::new(config)
            .await
            .context("Failed to initialise subsystems")?;
        let blockchain = container.blockchain();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        Ok(Self {
            container,
            blockchain,
            tasks: Vec::new(),
            shutdown_tx,
            shutdown_rx,
        })
    }

    /// Start the forger and the Ctrl-C watcher.
    pub fn start(&mut self) -> Result<()> {
        let network = &self.container.config.network;
        info!("===========================================");
        info!("  Delegate-Chain Node Runtime v{}", env!("CARGO_PKG_VERSION"));
        info!("===========================================");
        info!(
            network = %network.name,
            nethash = %network.nethash,
            delegates = network.active_delegates,
            blocktime = network.blocktime,
            "Network parameters"
        );

        let handle: Arc<dyn BlockchainApi> = Arc::new(self.blockchain.handle());
        if let Some(forger) = self
            .container
            .forger(Arc::clone(&handle))
            .context("Failed to load delegates")?
        {
            self.tasks.push(forger.spawn(self.shutdown_rx.clone()));
        }

        let mut shutdown = self.shutdown_rx.clone();
        self.tasks.push(tokio::spawn(async move {
            tokio::select! {
                signal = tokio::signal::ctrl_c() => {
                    match signal {
                        Ok(()) => info!("Ctrl-C received, stopping"),
                        Err(e) => error!("Failed to listen for Ctrl-C: {}", e),
                    }
                    handle.dispatch(BlockchainEvent::Stop);
                }
                _ = shutdown.changed() => {}
            }
        }));

        Ok(())
    }

    /// Drive the blockchain until it reaches a terminal state.
    pub async fn run(&mut self) -> ChainState {
        self.blockchain.run().await
    }

    /// Shutdown the node gracefully.
    ///
    /// ## Shutdown Sequence
    ///
    /// 1. Signal shutdown to the forger and watchers
    /// 2. Wait for them to finish
    /// 3. Persist the pool
    pub async fn shutdown(self) {
        info!("Initiating graceful shutdown...");

        if let Err(e) = self.shutdown_tx.send(true) {
            error!("Failed to send shutdown signal: {}", e);
        }
        for task in self.tasks {
            if let Err(e) = task.await {
                error!("Task ended abnormally: {}", e);
            }
        }
        if let Err(e) = self.container.pool.lock().disconnect() {
            error!("Failed to persist the transaction pool: {}", e);
        }

        info!("Shutdown complete");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_telemetry(&TelemetryConfig::from_env()).context("Failed to initialise telemetry")?;

    let config = NodeConfig::load().context("Failed to load configuration")?;

    let mut runtime = NodeRuntime::new(config).await?;
    runtime.start()?;

    info!("Node is running. Press Ctrl+C to stop.");
    let state = runtime.run().await;
    info!(state = %state, "Blockchain stopped");

    runtime.shutdown().await;

    let code = BlockchainStateMachine::exit_code(state);
    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}
