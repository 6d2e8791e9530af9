//! # Ledger Flows
//!
//! A transfer travels pool → forged block → chain wallets, and back again
//! when the block is rolled back.

#[cfg(test)]
mod tests {
    use dc_02_transaction_pool::{InMemoryPoolStorage, PoolConfig};
    use dc_03_blockchain::BlockOutcome;
    use shared_bus::{EventFilter, LedgerEvent};

    use crate::fixtures::{transfer, Node};

    async fn node() -> Node {
        Node::start(
            &[("alice", 1_000)],
            PoolConfig::for_testing(),
            Box::new(InMemoryPoolStorage::new()),
        )
        .await
    }

    // =========================================================================
    // APPLY AND REVERT
    // =========================================================================

    #[tokio::test]
    async fn test_transfer_applies_and_reverts() {
        let node = node().await;
        let tx = transfer("alice", "bob", 100, 1, 1);
        node.pool.lock().add_transaction(tx.clone()).unwrap();

        let block = node.forge_from_pool();
        assert_eq!(block.transactions.len(), 1);
        assert_eq!(node.processor.process_block(block).await, BlockOutcome::Applied);

        assert_eq!(node.balance("alice"), 899);
        assert_eq!(node.balance("bob"), 100);
        assert!(!node.pool.lock().transaction_exists(tx.id()));

        let removed = node.processor.remove_blocks(1).await.unwrap();
        assert_eq!(removed.len(), 1);

        assert_eq!(node.balance("alice"), 1_000);
        assert_eq!(node.balance("bob"), 0);
    }

    #[tokio::test]
    async fn test_reverted_transaction_returns_to_pool() {
        let node = node().await;
        let tx = transfer("alice", "bob", 100, 1, 1);
        node.pool.lock().add_transaction(tx.clone()).unwrap();
        node.processor.process_block(node.forge_from_pool()).await;
        assert_eq!(node.pool.lock().get_pool_size(), 0);

        node.processor.remove_blocks(1).await.unwrap();

        let mut pool = node.pool.lock();
        assert!(pool.transaction_exists(tx.id()));
        assert_eq!(pool.get_pool_size(), 1);
    }

    #[tokio::test]
    async fn test_apply_and_revert_publish_block_events() {
        let node = node().await;
        let mut events = node
            .bus
            .subscribe(EventFilter::names(vec!["block.applied", "block.reverted"]));

        let block = node.next_block(vec![transfer("alice", "bob", 10, 1, 1)]);
        let id = block.id().to_string();
        node.processor.process_block(block).await;
        node.processor.remove_blocks(1).await.unwrap();

        match events.try_recv().unwrap() {
            Some(LedgerEvent::BlockApplied(data)) => assert_eq!(data.id, id),
            other => panic!("expected block.applied, got {other:?}"),
        }
        match events.try_recv().unwrap() {
            Some(LedgerEvent::BlockReverted(data)) => assert_eq!(data.id, id),
            other => panic!("expected block.reverted, got {other:?}"),
        }
    }

    // =========================================================================
    // REJECTION
    // =========================================================================

    #[tokio::test]
    async fn test_overspending_block_leaves_wallets_untouched() {
        let node = node().await;
        let block = node.next_block(vec![transfer("alice", "bob", 1_000, 1, 1)]);

        assert_eq!(node.processor.process_block(block).await, BlockOutcome::Rejected);
        assert_eq!(node.balance("alice"), 1_000);
        assert_eq!(node.balance("bob"), 0);
    }

    #[tokio::test]
    async fn test_pool_wallet_tracks_pending_spend() {
        let node = node().await;
        node.pool
            .lock()
            .add_transaction(transfer("alice", "bob", 900, 1, 1))
            .unwrap();

        // 99 left in the pool wallet
        let err = node
            .pool
            .lock()
            .add_transaction(transfer("alice", "carol", 100, 1, 2))
            .unwrap_err();
        assert_eq!(err.code(), "ERR_APPLY");
        assert_eq!(node.balance("alice"), 1_000);
    }
}
