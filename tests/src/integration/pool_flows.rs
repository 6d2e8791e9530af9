//! # Pool Flows
//!
//! Admission through the guard at capacity, and reconciliation of the pool
//! with a chained block that double-spends a pooled sender.

#[cfg(test)]
mod tests {
    use dc_02_transaction_pool::{
        GuardCategory, InMemoryPoolStorage, PoolConfig, TransactionGuard,
    };
    use dc_03_blockchain::BlockOutcome;
    use shared_bus::{EventFilter, LedgerEvent};
    use shared_types::Transaction;

    use crate::fixtures::{public_key_of, transfer, Node};

    const HOUR_MS: u64 = 3_600_000;

    async fn node_with_capacity(capacity: usize) -> Node {
        Node::start(
            &[("alice", 1_000), ("bob", 1_000), ("sam", 100)],
            PoolConfig {
                max_transactions_in_pool: capacity,
                ..PoolConfig::for_testing()
            },
            Box::new(InMemoryPoolStorage::new()),
        )
        .await
    }

    /// Run one guard pass and return (accepted ids, error codes of `tx`).
    fn submit(node: &Node, tx: &Transaction) -> (Vec<String>, Vec<&'static str>) {
        let mut pool = node.pool.lock();
        let mut guard = TransactionGuard::new(&mut pool);
        guard.validate(vec![tx.data.clone()]);
        let codes = guard
            .errors()
            .get(tx.id())
            .map(|errs| errs.iter().map(|e| e.code).collect())
            .unwrap_or_default();
        (guard.get_ids(GuardCategory::Accept), codes)
    }

    // =========================================================================
    // CAPACITY
    // =========================================================================

    #[tokio::test]
    async fn test_higher_fee_evicts_lowest_when_full() {
        let node = node_with_capacity(1).await;
        let x = transfer("alice", "carol", 10, 5, 1);
        let y = transfer("bob", "carol", 10, 10, 1);

        assert_eq!(submit(&node, &x).0, vec![x.id().to_string()]);
        let (accepted, codes) = submit(&node, &y);

        assert_eq!(accepted, vec![y.id().to_string()]);
        assert!(codes.is_empty());
        let mut pool = node.pool.lock();
        assert!(!pool.transaction_exists(x.id()));
        assert!(pool.transaction_exists(y.id()));
        assert_eq!(pool.get_pool_size(), 1);
    }

    #[tokio::test]
    async fn test_lower_fee_rejected_when_full() {
        let node = node_with_capacity(1).await;
        let x = transfer("alice", "carol", 10, 5, 1);
        let y = transfer("bob", "carol", 10, 3, 1);
        submit(&node, &x);

        let (accepted, codes) = submit(&node, &y);

        assert!(accepted.is_empty());
        assert_eq!(codes, vec!["ERR_POOL_FULL"]);
        let mut pool = node.pool.lock();
        assert!(pool.transaction_exists(x.id()));
        assert!(!pool.transaction_exists(y.id()));
        assert_eq!(pool.get_pool_size(), 1);
    }

    #[tokio::test]
    async fn test_evicted_sender_funds_are_released() {
        let node = node_with_capacity(1).await;
        submit(&node, &transfer("alice", "carol", 990, 5, 1));
        submit(&node, &transfer("bob", "carol", 10, 10, 1));

        // alice's pool wallet is whole again, so a full spend fits once bob's
        // transaction is forged
        node.processor.process_block(node.forge_from_pool()).await;
        let (accepted, _) = submit(&node, &transfer("alice", "carol", 995, 5, 2));
        assert_eq!(accepted.len(), 1);
    }

    // =========================================================================
    // DOUBLE SPEND
    // =========================================================================

    #[tokio::test]
    async fn test_unaffordable_chained_transaction_blocks_sender() {
        let node = node_with_capacity(10).await;
        let mut blocked = node.bus.subscribe(EventFilter::names(vec!["sender.blocked"]));

        let pooled = transfer("sam", "carol", 60, 1, 1);
        assert_eq!(submit(&node, &pooled).0.len(), 1);

        // Sam affords this on chain (100) but not in the pool (39 left).
        let chained = transfer("sam", "dave", 50, 1, 2);
        let block = node.next_block(vec![chained]);
        assert_eq!(node.processor.process_block(block).await, BlockOutcome::Applied);

        assert_eq!(node.balance("sam"), 49);
        {
            let mut pool = node.pool.lock();
            assert!(!pool.transaction_exists(pooled.id()));
            assert_eq!(pool.get_sender_size(&public_key_of("sam")), 0);
            assert!(pool.is_sender_blocked(&public_key_of("sam")));
        }
        match blocked.try_recv().unwrap() {
            Some(LedgerEvent::SenderBlocked { sender, until }) => {
                assert_eq!(sender, public_key_of("sam"));
                assert_eq!(until, HOUR_MS);
            }
            other => panic!("expected sender.blocked, got {other:?}"),
        }

        let retry = transfer("sam", "carol", 10, 1, 3);
        let (accepted, codes) = submit(&node, &retry);
        assert!(accepted.is_empty());
        assert_eq!(codes, vec!["ERR_SENDER_BLOCKED"]);
    }

    #[tokio::test]
    async fn test_sender_block_lifts_after_an_hour() {
        let node = node_with_capacity(10).await;
        submit(&node, &transfer("sam", "carol", 60, 1, 1));
        let block = node.next_block(vec![transfer("sam", "dave", 50, 1, 2)]);
        node.processor.process_block(block).await;

        node.clock.advance(HOUR_MS);
        assert!(node.pool.lock().is_sender_blocked(&public_key_of("sam")));

        node.clock.advance(1);
        let (accepted, codes) = submit(&node, &transfer("sam", "carol", 10, 1, 3));
        assert_eq!(accepted.len(), 1, "unexpected refusal: {codes:?}");
    }

    #[tokio::test]
    async fn test_chained_pooled_transaction_leaves_sender_unblocked() {
        let node = node_with_capacity(10).await;
        let pooled = transfer("sam", "carol", 60, 1, 1);
        submit(&node, &pooled);

        node.processor.process_block(node.forge_from_pool()).await;

        let mut pool = node.pool.lock();
        assert_eq!(pool.get_pool_size(), 0);
        assert!(!pool.is_sender_blocked(&public_key_of("sam")));
    }
}
