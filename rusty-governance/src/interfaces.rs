//! Interfaces to the rest of the node.
//!
//! The governance manager never touches the chain state, the masternode list
//! or the peer connections directly; it goes through these traits so the node
//! can wire in its own implementations and tests can substitute mocks.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use rusty_shared_types::{GovernanceObject, MasternodeList};

use crate::messages::{GovernanceMessage, Inventory, SyncItem};

/// Peer identifier type
pub type PeerId = u64;

/// What the manager needs to know about a connected peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeerInfo {
    pub id: PeerId,
    /// Peer accepts relayed inventory.
    pub can_relay: bool,
    pub inbound: bool,
}

/// Result of checking the collateral transaction of a proposal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollateralStatus {
    Valid,
    /// Collateral exists but is not yet buried deep enough.
    MissingConfirmations,
    Invalid(String),
}

/// Read access to the active chain.
pub trait ChainView: Send + Sync {
    /// Height of the current tip
    fn tip_height(&self) -> u64;

    /// Check the fee collateral of a proposal
    fn check_collateral(&self, object: &GovernanceObject) -> CollateralStatus;

    /// Maximum amount a superblock at `height` may pay out
    fn superblock_budget(&self, height: u64) -> u64;

    /// Whether the deterministic masternode list is enforced at `height`
    fn mn_list_enforced(&self, _height: u64) -> bool {
        true
    }
}

/// Source of masternode list snapshots.
pub trait MasternodeListSource: Send + Sync {
    /// Snapshot of the list at the current tip
    fn list_at_tip(&self) -> Arc<MasternodeList>;
}

/// Sync progress of the node.
pub trait SyncState: Send + Sync {
    /// Headers and blocks are caught up
    fn is_blockchain_synced(&self) -> bool;

    /// Blockchain and governance data are caught up
    fn is_synced(&self) -> bool;

    /// Note that data of the named asset just arrived
    fn bump_asset_last_time(&self, asset: &str);
}

/// Per-peer record of requests already answered.
pub trait FulfilledRequestTracker: Send + Sync {
    fn has_fulfilled_request(&self, peer: PeerId, request: &str) -> bool;

    fn add_fulfilled_request(&self, peer: PeerId, request: &str);
}

/// Outbound side of the peer-to-peer layer.
pub trait PeerChannel: Send + Sync {
    /// Tell a peer how many items of a kind were offered during sync
    fn push_sync_status_count(&self, peer: PeerId, item: SyncItem, count: usize);

    /// Send a message to a single peer
    fn push_message(&self, peer: PeerId, message: GovernanceMessage);

    /// Offer an item to a single peer
    fn push_inventory(&self, peer: PeerId, inventory: Inventory);

    /// Offer an item to all relay-capable peers
    fn relay_inventory(&self, inventory: Inventory);

    /// Peers currently connected and eligible for requests
    fn relay_capable_peers(&self) -> Vec<PeerInfo>;
}

/// Network-wide feature switches.
pub trait SporkView: Send + Sync {
    fn superblocks_enabled(&self) -> bool;
}

/// Network-adjusted wall clock in unix seconds.
pub trait Clock: Send + Sync {
    fn now(&self) -> i64;
}

/// Clock backed by the system time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0)
    }
}

/// The collaborators a manager needs, bundled for construction.
#[derive(Clone)]
pub struct NodeContext {
    pub chain: Arc<dyn ChainView>,
    pub masternodes: Arc<dyn MasternodeListSource>,
    pub sync: Arc<dyn SyncState>,
    pub fulfilled: Arc<dyn FulfilledRequestTracker>,
    pub peers: Arc<dyn PeerChannel>,
    pub sporks: Arc<dyn SporkView>,
    pub clock: Arc<dyn Clock>,
}
