//! # Node Flows
//!
//! A complete node as the runtime wires it: configured genesis, the
//! blockchain state machine and a forger holding every genesis delegate.

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use dc_03_blockchain::{BlockchainStateMachine, ChainState};
    use node_runtime::{GenesisConfig, NodeConfig, SubsystemContainer};
    use shared_bus::{EventFilter, LedgerEvent};
    use shared_types::{BigAmount, MockTimeSource, NetworkConfig, TransactionBuilder};
    use tokio::sync::watch;
    use tokio::time::timeout;

    use crate::fixtures::{address_of, keys};

    fn devnet_config() -> NodeConfig {
        let network = NetworkConfig::for_testing();
        let mut config = NodeConfig::default();
        config.genesis = GenesisConfig::devnet(
            network.active_delegates as usize,
            BigAmount::from(1_000u64),
            network.network_version,
        )
        .unwrap();
        config.forger.secrets = config.genesis.delegate_secrets();
        config.blockchain.check_later_interval = 3_600;
        config.network = network;
        config
    }

    async fn container(config: NodeConfig) -> (SubsystemContainer, Arc<MockTimeSource>) {
        let clock = Arc::new(MockTimeSource::new(0));
        let container = SubsystemContainer::with_time_source(config, clock.clone())
            .await
            .unwrap();
        (container, clock)
    }

    // =========================================================================
    // STARTUP
    // =========================================================================

    #[tokio::test(start_paused = true)]
    async fn test_fresh_node_installs_genesis_and_idles() {
        let (container, _clock) = container(devnet_config()).await;
        let mut machine = container.blockchain();

        let state = timeout(
            Duration::from_secs(10),
            machine.run_until(|s| *s == ChainState::Idle),
        )
        .await
        .unwrap();

        assert_eq!(state, ChainState::Idle);
        assert_eq!(container.store.height(), 1);
        assert_eq!(container.wallets.read().get_delegates().count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_foreign_nethash_exits_with_failure() {
        let mut config = devnet_config();
        config.network.nethash = "another network".into();
        let (container, _clock) = container(config).await;
        let mut machine = container.blockchain();

        let state = timeout(Duration::from_secs(10), machine.run()).await.unwrap();

        assert_eq!(state, ChainState::Exit);
        assert_eq!(BlockchainStateMachine::exit_code(state), 1);
    }

    // =========================================================================
    // FORGING
    // =========================================================================

    #[tokio::test(start_paused = true)]
    async fn test_forger_includes_pooled_transfer() {
        let (container, clock) = container(devnet_config()).await;
        let mut events = container
            .event_bus
            .subscribe(EventFilter::names(vec!["block.forged", "block.applied"]));
        let mut machine = container.blockchain();
        machine.run_until(|s| *s == ChainState::Idle).await;

        let tx = TransactionBuilder::transfer(address_of("alice"), 100u64)
            .fee(1u64)
            .timestamp(8)
            .sign(&keys("delegate 1"))
            .build()
            .unwrap();
        container.pool.lock().add_transaction(tx.clone()).unwrap();

        // Slot 1 opens at 8s; the genesis block sits in slot 0.
        clock.set(8_000);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let forger = container
            .forger(Arc::new(machine.handle()))
            .unwrap()
            .unwrap();
        let task = forger.spawn(shutdown_rx);

        timeout(Duration::from_secs(30), async {
            while container.store.height() < 2 {
                machine.run_until(|s| *s == ChainState::Idle).await;
            }
        })
        .await
        .unwrap();
        shutdown_tx.send(true).unwrap();
        task.await.unwrap();

        let block = container.store.get_block_at(2).unwrap();
        assert_eq!(block.transactions.len(), 1);
        assert_eq!(block.transactions[0].id(), tx.id());
        assert_eq!(block.data.timestamp, 8);
        assert_eq!(container.pool.lock().get_pool_size(), 0);

        let alice = container
            .wallets
            .read()
            .get_by_address(&address_of("alice"))
            .map(|w| w.balance.clone());
        assert_eq!(alice, Some(BigAmount::from(100u64)));

        match events.try_recv().unwrap() {
            Some(LedgerEvent::BlockForged(data)) => assert_eq!(data.id, block.data.id),
            other => panic!("expected block.forged, got {other:?}"),
        }
        match events.try_recv().unwrap() {
            Some(LedgerEvent::BlockApplied(data)) => assert_eq!(data.id, block.data.id),
            other => panic!("expected block.applied, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_forger_waits_while_slot_is_taken() {
        let (container, _clock) = container(devnet_config()).await;
        let mut machine = container.blockchain();
        machine.run_until(|s| *s == ChainState::Idle).await;

        // Clock still in slot 0, the genesis slot.
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let forger = container
            .forger(Arc::new(machine.handle()))
            .unwrap()
            .unwrap();
        let task = forger.spawn(shutdown_rx);

        tokio::time::sleep(Duration::from_secs(5)).await;
        shutdown_tx.send(true).unwrap();
        task.await.unwrap();

        assert_eq!(container.store.height(), 1);
    }
}
