//! # Restart
//!
//! The pool survives a restart through file storage and drops whatever the
//! chain confirmed while it was down.

#[cfg(test)]
mod tests {
    use dc_02_transaction_pool::{FilePoolStorage, PoolConfig};
    use dc_03_blockchain::BlockStore;

    use crate::fixtures::{transfer, Node};

    const FUNDED: &[(&str, u64)] = &[("alice", 1_000)];

    fn storage(dir: &tempfile::TempDir) -> Box<FilePoolStorage> {
        Box::new(FilePoolStorage::open(dir.path()).unwrap())
    }

    #[tokio::test]
    async fn test_restart_drops_confirmed_transaction() {
        let dir = tempfile::tempdir().unwrap();
        let txs = vec![
            transfer("alice", "bob", 10, 1, 1),
            transfer("alice", "bob", 20, 1, 2),
            transfer("alice", "bob", 30, 1, 3),
        ];

        let first = Node::start(FUNDED, PoolConfig::for_testing(), storage(&dir)).await;
        for tx in &txs {
            first.pool.lock().add_transaction(tx.clone()).unwrap();
        }
        first.pool.lock().disconnect().unwrap();

        // The second run sees the first transaction already on chain.
        let second = Node::start(FUNDED, PoolConfig::for_testing(), storage(&dir)).await;
        let confirmed = second.next_block(vec![txs[0].clone()]);
        second.store.save_block(&confirmed).await.unwrap();
        second.pool.lock().make(&*second.store).await.unwrap();

        let mut pool = second.pool.lock();
        assert_eq!(pool.get_pool_size(), 2);
        assert!(!pool.transaction_exists(txs[0].id()));
        assert!(pool.transaction_exists(txs[1].id()));
        assert!(pool.transaction_exists(txs[2].id()));
    }

    #[tokio::test]
    async fn test_restart_without_confirmations_restores_everything() {
        let dir = tempfile::tempdir().unwrap();
        let first = Node::start(FUNDED, PoolConfig::for_testing(), storage(&dir)).await;
        first
            .pool
            .lock()
            .add_transaction(transfer("alice", "bob", 10, 1, 1))
            .unwrap();
        first.pool.lock().disconnect().unwrap();

        let second = Node::start(FUNDED, PoolConfig::for_testing(), storage(&dir)).await;
        assert_eq!(second.pool.lock().get_pool_size(), 1);
    }

    #[tokio::test]
    async fn test_restart_drops_expired_transactions() {
        let dir = tempfile::tempdir().unwrap();
        let config = PoolConfig::for_testing();
        let max_age_ms = config.max_transaction_age_ms();

        let first = Node::start(FUNDED, config.clone(), storage(&dir)).await;
        first
            .pool
            .lock()
            .add_transaction(transfer("alice", "bob", 10, 1, 1))
            .unwrap();
        first.pool.lock().disconnect().unwrap();

        let second = Node::start(FUNDED, config, storage(&dir)).await;
        second.clock.advance(max_age_ms + 1);
        second.pool.lock().make(&*second.store).await.unwrap();

        assert_eq!(second.pool.lock().get_pool_size(), 0);
    }
}
