//! # Ledger Events
//!
//! Fire-and-forget notifications emitted by the pool, the block pipeline and
//! the forger. Emitters never wait on subscribers.

use serde::{Deserialize, Serialize};
use shared_types::{BlockData, TransactionData};

/// All events that can be published to the event bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum LedgerEvent {
    // =========================================================================
    // TRANSACTION POOL
    // =========================================================================
    /// A pooled transaction outlived the maximum age and was dropped.
    TransactionExpired(TransactionData),

    /// A sender was purged and temporarily barred from the pool.
    SenderBlocked {
        /// Hex public key of the sender.
        sender: String,
        /// Block expiry in milliseconds since the Unix epoch.
        until: u64,
    },

    // =========================================================================
    // FORGER
    // =========================================================================
    /// The local delegate is about to forge.
    ForgingStarted {
        /// Hex public key of the forging delegate.
        generator_public_key: String,
    },

    /// A block was forged locally.
    BlockForged(BlockData),

    /// A transaction was included in a locally forged block.
    TransactionForged(TransactionData),

    /// A forging attempt failed and will be retried.
    ForgingFailed {
        /// Error description.
        error: String,
    },

    // =========================================================================
    // BLOCKCHAIN
    // =========================================================================
    /// A block was applied to the confirmed ledger.
    BlockApplied(BlockData),

    /// A block was reverted during fork recovery.
    BlockReverted(BlockData),

    /// A new round's delegate list was persisted.
    RoundApplied {
        /// Round number.
        round: u64,
        /// Height at which the round was computed.
        height: u64,
    },

    /// The state machine entered a new state.
    StateChanged {
        /// Name of the new state.
        state: String,
    },
}

impl LedgerEvent {
    /// Dotted event name, as published to external listeners.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::TransactionExpired(_) => "transaction.expired",
            Self::SenderBlocked { .. } => "sender.blocked",
            Self::ForgingStarted { .. } => "forging.started",
            Self::BlockForged(_) => "block.forged",
            Self::TransactionForged(_) => "transaction.forged",
            Self::ForgingFailed { .. } => "forging.failed",
            Self::BlockApplied(_) => "block.applied",
            Self::BlockReverted(_) => "block.reverted",
            Self::RoundApplied { .. } => "round.applied",
            Self::StateChanged { .. } => "state.changed",
        }
    }

    /// Get the topic for this event (for filtering).
    #[must_use]
    pub fn topic(&self) -> EventTopic {
        match self {
            Self::TransactionExpired(_) | Self::SenderBlocked { .. } => EventTopic::TransactionPool,
            Self::ForgingStarted { .. }
            | Self::BlockForged(_)
            | Self::TransactionForged(_)
            | Self::ForgingFailed { .. } => EventTopic::Forging,
            Self::BlockApplied(_)
            | Self::BlockReverted(_)
            | Self::RoundApplied { .. }
            | Self::StateChanged { .. } => EventTopic::Blockchain,
        }
    }

    /// Get the originating subsystem ID.
    #[must_use]
    pub fn source_subsystem(&self) -> u8 {
        match self.topic() {
            EventTopic::TransactionPool => 2,
            EventTopic::Blockchain => 3,
            EventTopic::Forging => 4,
            EventTopic::All => 0,
        }
    }
}

/// Event topics for subscription filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventTopic {
    /// Subsystem 2 events.
    TransactionPool,
    /// Subsystem 3 events.
    Blockchain,
    /// Subsystem 4 events.
    Forging,
    /// All events (no filtering).
    All,
}

/// Filter for subscribing to specific events.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    /// Topics to include. Empty means all topics.
    pub topics: Vec<EventTopic>,
    /// Event names to include. Empty means all names.
    pub names: Vec<&'static str>,
}

impl EventFilter {
    /// Create a filter that accepts all events.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Create a filter for specific topics.
    #[must_use]
    pub fn topics(topics: Vec<EventTopic>) -> Self {
        Self {
            topics,
            names: Vec::new(),
        }
    }

    /// Create a filter for specific dotted event names.
    #[must_use]
    pub fn names(names: Vec<&'static str>) -> Self {
        Self {
            topics: Vec::new(),
            names,
        }
    }

    /// Check if an event matches this filter.
    #[must_use]
    pub fn matches(&self, event: &LedgerEvent) -> bool {
        let topic_match = self.topics.is_empty()
            || self.topics.contains(&EventTopic::All)
            || self.topics.contains(&event.topic());

        let name_match = self.names.is_empty() || self.names.contains(&event.name());

        topic_match && name_match
    }
}
