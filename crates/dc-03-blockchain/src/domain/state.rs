//! # Blockchain State Machine: States, Events and Transitions
//!
//! A hierarchical machine flattened into nested enums. `rebuild` and
//! `syncWithNetwork` are compound states whose children are tracked by
//! [`RebuildPhase`] and [`SyncPhase`]. An event is first offered to the
//! child, then to the parent, then to the root.
//!
//! ```text
//! uninitialised ─START─► init ─STARTED─► syncWithNetwork ─SYNCFINISHED─► idle
//!                         │                  ▲      │                    │  ▲
//!                       REBUILD        REBUILDCOMPLETE FORK         NEWBLOCK │
//!                         ▼                  │      ▼                    ▼  │
//!                       rebuild ─────────────┘     fork ─SUCCESS─►   processingBlock
//!
//! init/rebuild/sync/fork ─FAILURE─► exit          any ─STOP─► stopped
//! ```

use serde::{Deserialize, Serialize};
use shared_types::BlockData;
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RebuildPhase {
    Rebuilding,
    RebuildBlocks,
    RebuildPaused,
    WaitingFinished,
    RebuildFinished,
    ProcessFinished,
    End,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SyncPhase {
    Syncing,
    DownloadBlocks,
    DownloadFinished,
    DownloadPaused,
    ProcessFinished,
    End,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChainState {
    Uninitialised,
    Init,
    Rebuild(RebuildPhase),
    SyncWithNetwork(SyncPhase),
    Idle,
    ProcessingBlock,
    Fork,
    Exit,
    Stopped,
}

impl ChainState {
    /// No further events are processed.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Exit | Self::Stopped)
    }
}

impl fmt::Display for ChainState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uninitialised => f.write_str("uninitialised"),
            Self::Init => f.write_str("init"),
            Self::Rebuild(phase) => {
                let child = match phase {
                    RebuildPhase::Rebuilding => "rebuilding",
                    RebuildPhase::RebuildBlocks => "rebuildBlocks",
                    RebuildPhase::RebuildPaused => "rebuildPaused",
                    RebuildPhase::WaitingFinished => "waitingFinished",
                    RebuildPhase::RebuildFinished => "rebuildFinished",
                    RebuildPhase::ProcessFinished => "processFinished",
                    RebuildPhase::End => "end",
                };
                write!(f, "rebuild.{child}")
            }
            Self::SyncWithNetwork(phase) => {
                let child = match phase {
                    SyncPhase::Syncing => "syncing",
                    SyncPhase::DownloadBlocks => "downloadBlocks",
                    SyncPhase::DownloadFinished => "downloadFinished",
                    SyncPhase::DownloadPaused => "downloadPaused",
                    SyncPhase::ProcessFinished => "processFinished",
                    SyncPhase::End => "end",
                };
                write!(f, "syncWithNetwork.{child}")
            }
            Self::Idle => f.write_str("idle"),
            Self::ProcessingBlock => f.write_str("processingBlock"),
            Self::Fork => f.write_str("fork"),
            Self::Exit => f.write_str("exit"),
            Self::Stopped => f.write_str("stopped"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BlockchainEvent {
    Start,
    Started,
    Rebuild,
    RebuildComplete,
    Synced,
    NotSynced,
    Paused,
    Downloaded,
    NoBlock,
    Fork,
    ProcessFinished,
    RebuildFinished,
    SyncFinished,
    NetworkStart,
    WakeUp,
    NewBlock,
    Success,
    Failure,
    Stop,
}

impl fmt::Display for BlockchainEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Start => "START",
            Self::Started => "STARTED",
            Self::Rebuild => "REBUILD",
            Self::RebuildComplete => "REBUILDCOMPLETE",
            Self::Synced => "SYNCED",
            Self::NotSynced => "NOTSYNCED",
            Self::Paused => "PAUSED",
            Self::Downloaded => "DOWNLOADED",
            Self::NoBlock => "NOBLOCK",
            Self::Fork => "FORK",
            Self::ProcessFinished => "PROCESSFINISHED",
            Self::RebuildFinished => "REBUILDFINISHED",
            Self::SyncFinished => "SYNCFINISHED",
            Self::NetworkStart => "NETWORKSTART",
            Self::WakeUp => "WAKEUP",
            Self::NewBlock => "NEWBLOCK",
            Self::Success => "SUCCESS",
            Self::Failure => "FAILURE",
            Self::Stop => "STOP",
        };
        f.write_str(name)
    }
}

/// Entry actions, run in order when a state is entered.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    Init,
    CheckLastDownloadedBlockSynced,
    RebuildBlocks,
    DownloadBlocks,
    CheckRebuildQueue,
    CheckProcessQueue,
    RebuildFinished,
    CheckRebuildBlockSynced,
    CheckLastBlockSynced,
    DownloadFinished,
    DownloadPaused,
    RebuildingComplete,
    SyncingComplete,
    CheckLater,
    BlockchainReady,
    StartForkRecovery,
    ExitApp,
}

/// Next state for `event` in `state`, or `None` when the event is ignored.
pub fn transition(state: ChainState, event: BlockchainEvent) -> Option<ChainState> {
    use BlockchainEvent as E;
    use ChainState as S;
    use RebuildPhase as R;
    use SyncPhase as Y;

    if state.is_terminal() {
        return None;
    }

    // Child handlers.
    let child = match (state, event) {
        (S::Rebuild(R::Rebuilding), E::Synced) => Some(S::Rebuild(R::WaitingFinished)),
        (S::Rebuild(R::Rebuilding), E::NotSynced) => Some(S::Rebuild(R::RebuildBlocks)),
        (S::Rebuild(R::Rebuilding), E::Paused) => Some(S::Rebuild(R::RebuildPaused)),
        (S::Rebuild(R::RebuildBlocks), E::Downloaded) => Some(S::Rebuild(R::Rebuilding)),
        (S::Rebuild(R::RebuildBlocks), E::NoBlock) => Some(S::Rebuild(R::WaitingFinished)),
        (S::Rebuild(R::WaitingFinished), E::RebuildFinished) => Some(S::Rebuild(R::RebuildFinished)),
        (S::Rebuild(R::RebuildPaused), E::RebuildFinished) => Some(S::Rebuild(R::RebuildFinished)),
        (S::Rebuild(R::RebuildFinished), E::ProcessFinished) => Some(S::Rebuild(R::ProcessFinished)),
        (S::Rebuild(R::ProcessFinished), E::Synced) => Some(S::Rebuild(R::End)),
        (S::Rebuild(R::ProcessFinished), E::NotSynced) => Some(S::Rebuild(R::RebuildBlocks)),

        (S::SyncWithNetwork(Y::Syncing), E::Synced) => Some(S::SyncWithNetwork(Y::DownloadFinished)),
        (S::SyncWithNetwork(Y::Syncing), E::NotSynced) => Some(S::SyncWithNetwork(Y::DownloadBlocks)),
        (S::SyncWithNetwork(Y::Syncing), E::Paused) => Some(S::SyncWithNetwork(Y::DownloadPaused)),
        (S::SyncWithNetwork(Y::DownloadBlocks), E::Downloaded) => Some(S::SyncWithNetwork(Y::Syncing)),
        (S::SyncWithNetwork(Y::DownloadBlocks), E::NoBlock) => {
            Some(S::SyncWithNetwork(Y::DownloadFinished))
        }
        (S::SyncWithNetwork(Y::DownloadFinished), E::ProcessFinished)
        | (S::SyncWithNetwork(Y::DownloadPaused), E::ProcessFinished) => {
            Some(S::SyncWithNetwork(Y::ProcessFinished))
        }
        (S::SyncWithNetwork(Y::ProcessFinished), E::Synced) => Some(S::SyncWithNetwork(Y::End)),
        (S::SyncWithNetwork(Y::ProcessFinished), E::NotSynced) => {
            Some(S::SyncWithNetwork(Y::DownloadBlocks))
        }
        _ => None,
    };
    if child.is_some() {
        return child;
    }

    // Top-level and compound-parent handlers.
    let parent = match (state, event) {
        (S::Uninitialised, E::Start) => Some(S::Init),
        (S::Init, E::Rebuild) => Some(S::Rebuild(R::Rebuilding)),
        (S::Init, E::Started) => Some(S::SyncWithNetwork(Y::Syncing)),
        (S::Init, E::NetworkStart) => Some(S::Idle),
        (S::Init, E::Failure) => Some(S::Exit),
        (S::Rebuild(_), E::RebuildComplete) => Some(S::SyncWithNetwork(Y::Syncing)),
        (S::Rebuild(_), E::Fork) | (S::SyncWithNetwork(_), E::Fork) => Some(S::Fork),
        (S::Rebuild(_), E::Failure) | (S::SyncWithNetwork(_), E::Failure) => Some(S::Exit),
        (S::SyncWithNetwork(_), E::SyncFinished) => Some(S::Idle),
        (S::Idle, E::WakeUp) => Some(S::SyncWithNetwork(Y::Syncing)),
        (S::Idle, E::NewBlock) => Some(S::ProcessingBlock),
        (S::ProcessingBlock, E::ProcessFinished) => Some(S::Idle),
        (S::ProcessingBlock, E::Fork) => Some(S::Fork),
        (S::Fork, E::Success) => Some(S::SyncWithNetwork(Y::Syncing)),
        (S::Fork, E::Failure) => Some(S::Exit),
        _ => None,
    };
    if parent.is_some() {
        return parent;
    }

    match event {
        E::Stop => Some(S::Stopped),
        _ => None,
    }
}

/// Actions run on entering `state`.
pub fn entry_actions(state: ChainState) -> &'static [Action] {
    use ChainState as S;
    use RebuildPhase as R;
    use SyncPhase as Y;

    match state {
        S::Uninitialised | S::Stopped => &[],
        S::Init => &[Action::Init],
        S::Rebuild(R::Rebuilding) => &[Action::CheckLastDownloadedBlockSynced],
        S::Rebuild(R::RebuildBlocks) => &[Action::RebuildBlocks],
        S::Rebuild(R::RebuildPaused) => &[Action::DownloadPaused, Action::CheckRebuildQueue],
        S::Rebuild(R::WaitingFinished) => &[Action::CheckRebuildQueue],
        S::Rebuild(R::RebuildFinished) => &[Action::RebuildFinished],
        S::Rebuild(R::ProcessFinished) => &[Action::CheckRebuildBlockSynced],
        S::Rebuild(R::End) => &[Action::RebuildingComplete],
        S::SyncWithNetwork(Y::Syncing) => &[Action::CheckLastDownloadedBlockSynced],
        S::SyncWithNetwork(Y::DownloadBlocks) => &[Action::DownloadBlocks],
        S::SyncWithNetwork(Y::DownloadFinished) => &[Action::DownloadFinished],
        S::SyncWithNetwork(Y::DownloadPaused) => &[Action::DownloadPaused, Action::CheckProcessQueue],
        S::SyncWithNetwork(Y::ProcessFinished) => &[Action::CheckLastBlockSynced],
        S::SyncWithNetwork(Y::End) => &[Action::SyncingComplete],
        S::Idle => &[Action::CheckLater, Action::BlockchainReady],
        S::ProcessingBlock => &[Action::CheckProcessQueue],
        S::Fork => &[Action::StartForkRecovery],
        S::Exit => &[Action::ExitApp],
    }
}

/// Mutable flags shared between the machine and its queue workers.
#[derive(Clone, Debug)]
pub struct BlockchainState {
    pub last_block: Option<BlockData>,
    /// Tip of what has been downloaded, possibly ahead of `last_block`.
    pub last_downloaded_block: Option<BlockData>,
    pub started: bool,
    pub rebuild: bool,
    pub fast_rebuild: bool,
    pub network_start: bool,
    /// The most recent download returned nothing.
    pub no_new_blocks: bool,
}

impl BlockchainState {
    pub fn new(network_start: bool) -> Self {
        Self {
            last_block: None,
            last_downloaded_block: None,
            started: false,
            rebuild: true,
            fast_rebuild: true,
            network_start,
            no_new_blocks: false,
        }
    }

    pub fn last_height(&self) -> u64 {
        self.last_block.as_ref().map_or(0, |b| b.height)
    }

    /// Download cursor: the downloaded tip, else the applied tip.
    pub fn download_tip(&self) -> Option<&BlockData> {
        self.last_downloaded_block.as_ref().or(self.last_block.as_ref())
    }

    /// Forget downloaded-but-unapplied blocks.
    pub fn reset_download_tip(&mut self) {
        self.last_downloaded_block = self.last_block.clone();
    }
}
