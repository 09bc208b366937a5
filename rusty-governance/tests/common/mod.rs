#![allow(dead_code)]

use ed25519_dalek::SigningKey;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use rusty_governance::{
    ChainView, Clock, CollateralStatus, FulfilledRequestTracker, GovernanceConfig, GovernanceManager,
    GovernanceMessage, Inventory, MasternodeListSource, NodeContext, PeerChannel, PeerId, PeerInfo, SporkView,
    SyncItem, SyncState,
};
use rusty_shared_types::masternode::{MasternodeInfo, MasternodeStatus, MasternodeType};
use rusty_shared_types::{
    GovernanceObject, GovernanceObjectType, GovernanceParams, GovernanceVote, Hash, MasternodeList, OutPoint,
    VoteOutcome, VoteSignal, ZERO_HASH,
};

pub const NOW: i64 = 1_700_000_000;

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn dummy_hash(seed: u8) -> Hash {
    [seed; 32]
}

pub fn signing_key(seed: u8) -> SigningKey {
    SigningKey::from_bytes(&[seed; 32])
}

pub fn collateral(seed: u8) -> OutPoint {
    OutPoint::new(dummy_hash(seed), 0)
}

pub fn masternode(seed: u8, mn_type: MasternodeType) -> MasternodeInfo {
    let key = signing_key(seed).verifying_key().to_bytes();
    MasternodeInfo {
        pro_tx_hash: dummy_hash(seed),
        collateral_outpoint: collateral(seed),
        voting_key: key,
        operator_key: key,
        mn_type,
        status: MasternodeStatus::Active,
    }
}

pub fn mn_list(seeds: impl IntoIterator<Item = u8>) -> MasternodeList {
    let mut list = MasternodeList::new(1_500, ZERO_HASH);
    for seed in seeds {
        list.add_masternode(masternode(seed, MasternodeType::Regular));
    }
    list
}

pub fn proposal(name: &str, end_epoch: i64) -> GovernanceObject {
    let data = format!(
        r#"{{"type":1,"name":"{}","start_epoch":{},"end_epoch":{},"payment_address":"{}","payment_amount":10,"url":"https://example.org/{}"}}"#,
        name,
        NOW - 1_000,
        end_epoch,
        hex::encode([7u8; 20]),
        name
    );
    GovernanceObject::new(ZERO_HASH, 1, NOW, dummy_hash(200), data.into_bytes(), GovernanceObjectType::Proposal)
}

/// Trigger for `height` paying each `(seed, amount)`, signed by masternode `mn_seed`.
pub fn trigger(mn_seed: u8, height: u64, payees: &[(u8, &str)], time: i64) -> GovernanceObject {
    let addresses: Vec<String> = payees.iter().map(|(seed, _)| hex::encode([*seed; 20])).collect();
    let amounts: Vec<&str> = payees.iter().map(|(_, amount)| *amount).collect();
    let data = format!(
        r#"{{"event_block_height":{},"payment_addresses":"{}","payment_amounts":"{}","type":2}}"#,
        height,
        addresses.join("|"),
        amounts.join("|")
    );
    let mut object = GovernanceObject::new(ZERO_HASH, 1, time, ZERO_HASH, data.into_bytes(), GovernanceObjectType::Trigger);
    object.sign(collateral(mn_seed), &signing_key(mn_seed));
    object
}

pub fn vote(seed: u8, parent: Hash, signal: VoteSignal, outcome: VoteOutcome, time: i64) -> GovernanceVote {
    let mut vote = GovernanceVote::new(collateral(seed), parent, signal, outcome, time);
    vote.sign(&signing_key(seed));
    vote
}

pub struct MockChain {
    pub tip: AtomicU64,
    pub budget: AtomicU64,
    pub collateral: Mutex<HashMap<Hash, CollateralStatus>>,
}

impl ChainView for MockChain {
    fn tip_height(&self) -> u64 {
        self.tip.load(Ordering::SeqCst)
    }

    fn check_collateral(&self, object: &GovernanceObject) -> CollateralStatus {
        self.collateral
            .lock()
            .unwrap()
            .get(&object.hash())
            .cloned()
            .unwrap_or(CollateralStatus::Valid)
    }

    fn superblock_budget(&self, _height: u64) -> u64 {
        self.budget.load(Ordering::SeqCst)
    }
}

pub struct MockMasternodes {
    pub list: Mutex<Arc<MasternodeList>>,
}

impl MasternodeListSource for MockMasternodes {
    fn list_at_tip(&self) -> Arc<MasternodeList> {
        self.list.lock().unwrap().clone()
    }
}

pub struct MockSync {
    pub blockchain_synced: AtomicBool,
    pub synced: AtomicBool,
    pub bumps: Mutex<Vec<String>>,
}

impl SyncState for MockSync {
    fn is_blockchain_synced(&self) -> bool {
        self.blockchain_synced.load(Ordering::SeqCst)
    }

    fn is_synced(&self) -> bool {
        self.synced.load(Ordering::SeqCst)
    }

    fn bump_asset_last_time(&self, asset: &str) {
        self.bumps.lock().unwrap().push(asset.to_string());
    }
}

#[derive(Default)]
pub struct MockFulfilled {
    pub requests: Mutex<HashSet<(PeerId, String)>>,
}

impl FulfilledRequestTracker for MockFulfilled {
    fn has_fulfilled_request(&self, peer: PeerId, request: &str) -> bool {
        self.requests.lock().unwrap().contains(&(peer, request.to_string()))
    }

    fn add_fulfilled_request(&self, peer: PeerId, request: &str) {
        self.requests.lock().unwrap().insert((peer, request.to_string()));
    }
}

#[derive(Default)]
pub struct MockPeers {
    pub peers: Mutex<Vec<PeerInfo>>,
    pub messages: Mutex<Vec<(PeerId, GovernanceMessage)>>,
    pub inventory: Mutex<Vec<(PeerId, Inventory)>>,
    pub relayed: Mutex<Vec<Inventory>>,
    pub counts: Mutex<Vec<(PeerId, SyncItem, usize)>>,
}

impl MockPeers {
    pub fn sync_requests(&self) -> Vec<(PeerId, Hash)> {
        self.messages
            .lock()
            .unwrap()
            .iter()
            .filter_map(|(peer, message)| match message {
                GovernanceMessage::SyncRequest { object_hash, .. } => Some((*peer, *object_hash)),
                _ => None,
            })
            .collect()
    }
}

impl PeerChannel for MockPeers {
    fn push_sync_status_count(&self, peer: PeerId, item: SyncItem, count: usize) {
        self.counts.lock().unwrap().push((peer, item, count));
    }

    fn push_message(&self, peer: PeerId, message: GovernanceMessage) {
        self.messages.lock().unwrap().push((peer, message));
    }

    fn push_inventory(&self, peer: PeerId, inventory: Inventory) {
        self.inventory.lock().unwrap().push((peer, inventory));
    }

    fn relay_inventory(&self, inventory: Inventory) {
        self.relayed.lock().unwrap().push(inventory);
    }

    fn relay_capable_peers(&self) -> Vec<PeerInfo> {
        self.peers.lock().unwrap().clone()
    }
}

pub struct MockSporks {
    pub superblocks: AtomicBool,
}

impl SporkView for MockSporks {
    fn superblocks_enabled(&self) -> bool {
        self.superblocks.load(Ordering::SeqCst)
    }
}

pub struct MockClock {
    pub now: AtomicI64,
}

impl MockClock {
    pub fn advance(&self, secs: i64) {
        self.now.fetch_add(secs, Ordering::SeqCst);
    }
}

impl Clock for MockClock {
    fn now(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// A manager on regtest wired to mocks, fully synced.
pub struct Harness {
    pub chain: Arc<MockChain>,
    pub masternodes: Arc<MockMasternodes>,
    pub sync: Arc<MockSync>,
    pub fulfilled: Arc<MockFulfilled>,
    pub peers: Arc<MockPeers>,
    pub sporks: Arc<MockSporks>,
    pub clock: Arc<MockClock>,
    pub manager: Arc<GovernanceManager>,
}

impl Harness {
    pub fn new(list: MasternodeList) -> Self {
        Self::with_config(list, GovernanceConfig::for_params(&GovernanceParams::regtest()))
    }

    pub fn with_config(list: MasternodeList, config: GovernanceConfig) -> Self {
        let chain = Arc::new(MockChain {
            tip: AtomicU64::new(1_500),
            budget: AtomicU64::new(1_000 * rusty_shared_types::COIN),
            collateral: Mutex::new(HashMap::new()),
        });
        let masternodes = Arc::new(MockMasternodes { list: Mutex::new(Arc::new(list)) });
        let sync = Arc::new(MockSync {
            blockchain_synced: AtomicBool::new(true),
            synced: AtomicBool::new(true),
            bumps: Mutex::new(Vec::new()),
        });
        let fulfilled = Arc::new(MockFulfilled::default());
        let peers = Arc::new(MockPeers::default());
        let sporks = Arc::new(MockSporks { superblocks: AtomicBool::new(true) });
        let clock = Arc::new(MockClock { now: AtomicI64::new(NOW) });
        let ctx = NodeContext {
            chain: chain.clone(),
            masternodes: masternodes.clone(),
            sync: sync.clone(),
            fulfilled: fulfilled.clone(),
            peers: peers.clone(),
            sporks: sporks.clone(),
            clock: clock.clone(),
        };
        let manager = Arc::new(GovernanceManager::new(GovernanceParams::regtest(), config, ctx));
        Harness { chain, masternodes, sync, fulfilled, peers, sporks, clock, manager }
    }

    pub fn context(&self) -> NodeContext {
        NodeContext {
            chain: self.chain.clone(),
            masternodes: self.masternodes.clone(),
            sync: self.sync.clone(),
            fulfilled: self.fulfilled.clone(),
            peers: self.peers.clone(),
            sporks: self.sporks.clone(),
            clock: self.clock.clone(),
        }
    }

    pub fn set_list(&self, list: MasternodeList) {
        *self.masternodes.list.lock().unwrap() = Arc::new(list);
    }

    pub fn set_synced(&self, synced: bool) {
        self.sync.synced.store(synced, Ordering::SeqCst);
    }

    /// Announces and delivers an object from `peer`.
    pub fn deliver_object(&self, peer: PeerId, object: GovernanceObject) -> rusty_governance::GovernanceResult<()> {
        self.manager.confirm_inventory_request(&Inventory::object(object.hash()));
        self.manager.process_message(peer, GovernanceMessage::Object(object))
    }

    /// Announces and delivers a vote from `peer`.
    pub fn deliver_vote(&self, peer: PeerId, vote: GovernanceVote) -> rusty_governance::GovernanceResult<()> {
        self.manager.confirm_inventory_request(&Inventory::vote(vote.hash()));
        self.manager.process_message(peer, GovernanceMessage::Vote(vote))
    }

    pub fn relayed(&self) -> Vec<Inventory> {
        self.manager.flush_relay_queue();
        self.peers.relayed.lock().unwrap().clone()
    }
}
