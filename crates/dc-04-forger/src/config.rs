//! Configuration for the forger

use serde::Deserialize;
use std::time::Duration;

/// Runtime configuration for the forger loop
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ForgerConfig {
    /// Passphrases of the delegates forging on this node
    pub secrets: Vec<String>,

    /// Poll interval while the current slot is not forgeable (ms)
    pub can_forge_poll: u64,

    /// Wait when no local delegate owns the slot (ms)
    pub no_delegate_delay: u64,

    /// Wait after a block was forged (ms)
    pub after_forge_delay: u64,

    /// Wait after a failed iteration (ms)
    pub error_backoff: u64,
}

impl Default for ForgerConfig {
    fn default() -> Self {
        Self {
            secrets: Vec::new(),
            can_forge_poll: 100,
            no_delegate_delay: 7_900,
            after_forge_delay: 7_800,
            error_backoff: 2_000,
        }
    }
}

impl ForgerConfig {
    pub fn with_secrets(secrets: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            secrets: secrets.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn can_forge_poll(&self) -> Duration {
        Duration::from_millis(self.can_forge_poll)
    }

    pub fn no_delegate_delay(&self) -> Duration {
        Duration::from_millis(self.no_delegate_delay)
    }

    pub fn after_forge_delay(&self) -> Duration {
        Duration::from_millis(self.after_forge_delay)
    }

    pub fn error_backoff(&self) -> Duration {
        Duration::from_millis(self.error_backoff)
    }
}
