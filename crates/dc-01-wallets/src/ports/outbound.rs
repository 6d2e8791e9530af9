//! Outbound (Driven) ports for the wallet ledger.

use shared_types::TransactionType;

/// Pending-transaction view used by pool admission policies.
///
/// Implemented by the transaction pool.
pub trait PendingTransactions {
    fn sender_has_transactions_of_type(
        &self,
        sender_public_key: &str,
        transaction_type: TransactionType,
    ) -> bool;
}
