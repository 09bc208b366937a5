//! Governance manager.
//!
//! Entry point for everything governance related: it dispatches network
//! messages, serves sync requests, runs the periodic maintenance and answers
//! queries from block validation and RPC. All state lives in a
//! [`GovernanceStore`] behind a single mutex; relayed inventory is queued
//! behind a second mutex and flushed periodically.
//!
//! Lock order is store, then relay queue. Chain and masternode lookups are
//! done before the store lock is taken.

use log::{debug, error, info, warn};
use std::mem;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use rusty_shared_types::{
    CoinbaseTransaction, GovernanceObject, GovernanceObjectType, GovernanceParams, GovernanceVote, Hash,
    MasternodeList, Network, OutPoint, TxOutput, ZERO_HASH,
};

use crate::config::GovernanceConfig;
use crate::error::{GovernanceError, GovernanceResult, StoreResult};
use crate::interfaces::{CollateralStatus, NodeContext, PeerId, PeerInfo};
use crate::messages::{filter_tweak, BloomFilter, GovernanceMessage, Inventory, InventoryKind, SyncItem, BLOOM_FP_RATE};
use crate::payload::ProposalData;
use crate::rate_check::RateCheck;
use crate::store::{GovernanceStats, GovernanceStore};
use crate::triggers::Superblock;

/// Name under which full sync requests are tracked per peer.
pub const GOVERNANCE_SYNC_REQUEST: &str = "govsync";
/// Votes we expect one object request to bring in.
const PROJECTED_VOTES_PER_REQUEST: usize = 2000;

const ASSET_OBJECT: &str = "govobj";
const ASSET_VOTE: &str = "govobjvote";

pub struct GovernanceManager {
    params: GovernanceParams,
    config: GovernanceConfig,
    store: Mutex<GovernanceStore>,
    relay_queue: Mutex<Vec<Inventory>>,
    ctx: NodeContext,
}

impl GovernanceManager {
    pub fn new(params: GovernanceParams, config: GovernanceConfig, ctx: NodeContext) -> Self {
        let store = GovernanceStore::new(params.clone(), config.clone());
        Self::with_store(store, ctx)
    }

    /// Wraps an existing store, e.g. one loaded from disk.
    pub fn with_store(store: GovernanceStore, ctx: NodeContext) -> Self {
        GovernanceManager {
            params: store.params().clone(),
            config: store.config().clone(),
            store: Mutex::new(store),
            relay_queue: Mutex::new(Vec::new()),
            ctx,
        }
    }

    /// Loads a persisted store and prepares it for use.
    pub fn load(path: &Path, params: GovernanceParams, config: GovernanceConfig, ctx: NodeContext) -> StoreResult<Self> {
        let mut store = GovernanceStore::load_from_file(path, params, config)?;
        let mn_list = ctx.masternodes.list_at_tip();
        store.set_cached_height(ctx.chain.tip_height());
        store.init_after_load(&mn_list, ctx.clock.now());
        info!("Loaded governance store: {}", store);
        Ok(Self::with_store(store, ctx))
    }

    pub fn save(&self, path: &Path) -> StoreResult<()> {
        self.lock_store().save_to_file(path)
    }

    pub fn params(&self) -> &GovernanceParams {
        &self.params
    }

    pub fn config(&self) -> &GovernanceConfig {
        &self.config
    }

    fn lock_store(&self) -> MutexGuard<'_, GovernanceStore> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_relay_queue(&self) -> MutexGuard<'_, Vec<Inventory>> {
        self.relay_queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn now(&self) -> i64 {
        self.ctx.clock.now()
    }

    fn mn_list(&self) -> Arc<MasternodeList> {
        self.ctx.masternodes.list_at_tip()
    }

    // ---- message dispatch ----

    /// Handles one governance message from `peer`.
    ///
    /// Errors carry the misbehavior penalty for the sender. Penalized errors
    /// are only reported once the node is fully synced.
    pub fn process_message(&self, peer: PeerId, message: GovernanceMessage) -> GovernanceResult<()> {
        match message {
            GovernanceMessage::SyncRequest { object_hash, filter } => self.process_sync_request(peer, object_hash, &filter),
            GovernanceMessage::Object(object) => self.process_object_message(peer, object),
            GovernanceMessage::Vote(vote) => self.process_vote_message(peer, vote),
        }
    }

    fn process_sync_request(&self, peer: PeerId, object_hash: Hash, filter: &BloomFilter) -> GovernanceResult<()> {
        if !self.ctx.sync.is_synced() {
            debug!("sync request from peer {} ignored, not synced", peer);
            return Err(GovernanceError::NotSynced);
        }
        if !filter.is_within_size_constraints() {
            warn!("peer {} sent an oversized bloom filter", peer);
            return Err(GovernanceError::OversizedFilter);
        }
        if object_hash == ZERO_HASH {
            if self.ctx.fulfilled.has_fulfilled_request(peer, GOVERNANCE_SYNC_REQUEST) {
                warn!("peer {} already asked for the full object list", peer);
                return Err(GovernanceError::SyncRequestRepeated);
            }
            self.ctx.fulfilled.add_fulfilled_request(peer, GOVERNANCE_SYNC_REQUEST);
            self.sync_objects(peer);
        } else {
            self.sync_single_object_votes(peer, &object_hash, filter);
        }
        Ok(())
    }

    fn sync_objects(&self, peer: PeerId) {
        let hashes = self.lock_store().sync_object_hashes();
        for hash in &hashes {
            self.ctx.peers.push_inventory(peer, Inventory::object(*hash));
        }
        info!("sent {} objects to peer {}", hashes.len(), peer);
        self.ctx.peers.push_sync_status_count(peer, SyncItem::Objects, hashes.len());
    }

    fn sync_single_object_votes(&self, peer: PeerId, object_hash: &Hash, filter: &BloomFilter) {
        let mn_list = self.mn_list();
        let now = self.now();
        let hashes = self
            .lock_store()
            .sync_vote_hashes(object_hash, &mn_list, now, |hash| filter.contains(hash));
        let Some(hashes) = hashes else {
            debug!("no matching object for hash {}, peer {}", hex::encode(object_hash), peer);
            return;
        };
        for hash in &hashes {
            self.ctx.peers.push_inventory(peer, Inventory::vote(*hash));
        }
        info!(
            "sent {} votes for object {} to peer {}",
            hashes.len(),
            hex::encode(object_hash),
            peer
        );
        self.ctx.peers.push_sync_status_count(peer, SyncItem::Votes, hashes.len());
    }

    fn process_object_message(&self, peer: PeerId, object: GovernanceObject) -> GovernanceResult<()> {
        let hash = object.hash();
        if !self.ctx.sync.is_blockchain_synced() {
            debug!("object {} ignored, blockchain not synced", hex::encode(hash));
            return Err(GovernanceError::NotSynced);
        }
        let mn_list = self.mn_list();
        let now = self.now();
        let synced = self.ctx.sync.is_synced();

        let rate_check = {
            let mut store = self.lock_store();
            if !store.accept_message(&hash) {
                debug!("unrequested object {} from peer {}", hex::encode(hash), peer);
                return Err(GovernanceError::Unsolicited(hash));
            }
            if store.is_known(&hash) {
                debug!("already have object {}", hex::encode(hash));
                return Err(GovernanceError::AlreadyKnown(hash));
            }
            if synced {
                store.rate_check(&object, now, false, true)
            } else {
                RateCheck::Passed
            }
        };
        if !rate_check.is_ok() {
            warn!(
                "masternode rate check failed for object {} from {}",
                hex::encode(hash),
                object.masternode_outpoint.to_string_short()
            );
            return Err(GovernanceError::RateLimited(object.masternode_outpoint.clone()));
        }

        let validity = self.validate_locally(&object, &mn_list);

        if rate_check == RateCheck::Bypassed && validity.is_ok() {
            let forced = self.lock_store().rate_check(&object, now, true, true);
            if !forced.is_ok() {
                warn!(
                    "masternode rate check failed after signature verification for object {}",
                    hex::encode(hash)
                );
                return Err(GovernanceError::RateLimited(object.masternode_outpoint.clone()));
            }
        }

        match validity {
            Ok(()) => {}
            Err(GovernanceError::MissingConfirmations) => {
                info!("not enough fee confirmations for object {}", hex::encode(hash));
                self.lock_store().mark_postponed(object);
                return Ok(());
            }
            Err(err) => {
                warn!("governance object {} is invalid: {}", hex::encode(hash), err);
                return self.penalize_if_synced(err);
            }
        }

        self.add_governance_object(object, Some(peer), &mn_list, now)
    }

    fn process_vote_message(&self, peer: PeerId, vote: GovernanceVote) -> GovernanceResult<()> {
        let hash = vote.hash();
        if !self.ctx.sync.is_blockchain_synced() {
            debug!("vote {} ignored, blockchain not synced", hex::encode(hash));
            return Err(GovernanceError::NotSynced);
        }
        if !self.lock_store().accept_message(&hash) {
            debug!("unrequested vote {} from peer {}", hex::encode(hash), peer);
            return Err(GovernanceError::Unsolicited(hash));
        }

        match self.process_vote(Some(peer), &vote) {
            Ok(()) => {
                debug!("new vote {}", hex::encode(hash));
                self.ctx.sync.bump_asset_last_time(ASSET_VOTE);
                Ok(())
            }
            Err(err) => {
                debug!("rejected vote {}: {}", hex::encode(hash), err);
                self.penalize_if_synced(err)
            }
        }
    }

    fn penalize_if_synced(&self, err: GovernanceError) -> GovernanceResult<()> {
        if err.penalty() > 0 && !self.ctx.sync.is_synced() {
            return Ok(());
        }
        Err(err)
    }

    /// Applies `vote` and relays it on success. Orphans trigger a parent
    /// request to `peer` when one is given.
    fn process_vote(&self, peer: Option<PeerId>, vote: &GovernanceVote) -> GovernanceResult<()> {
        let mn_list = self.mn_list();
        let now = self.now();
        let enforce_update_min = self.config.enforce_vote_update_min && self.ctx.sync.is_synced();
        let result = self
            .lock_store()
            .process_vote(vote, &mn_list, now, enforce_update_min);
        match result {
            Ok(()) => {
                self.relay_vote(vote, &mn_list);
                Ok(())
            }
            Err(GovernanceError::OrphanVote(parent)) => {
                if let Some(peer) = peer {
                    self.request_governance_object(peer, &parent, false);
                }
                Err(GovernanceError::OrphanVote(parent))
            }
            Err(err) => Err(err),
        }
    }

    /// Checks an object against the chain and the masternode list.
    ///
    /// Triggers are not parsed here; an unparseable trigger is stored and
    /// then flagged for deletion when it fails to register.
    fn validate_locally(&self, object: &GovernanceObject, mn_list: &MasternodeList) -> GovernanceResult<()> {
        match object.object_type {
            GovernanceObjectType::Proposal => {
                let proposal = ProposalData::parse(&object.data)?;
                proposal.validate(self.now(), false)?;
                match self.ctx.chain.check_collateral(object) {
                    CollateralStatus::Valid => Ok(()),
                    CollateralStatus::MissingConfirmations => Err(GovernanceError::MissingConfirmations),
                    CollateralStatus::Invalid(reason) => Err(GovernanceError::InvalidObject(reason)),
                }
            }
            GovernanceObjectType::Trigger => {
                let outpoint = &object.masternode_outpoint;
                let masternode = mn_list.get_by_collateral(outpoint).ok_or_else(|| {
                    GovernanceError::InvalidObject(format!("unknown masternode {}", outpoint.to_string_short()))
                })?;
                if !object.verify_signature(&masternode.operator_key) {
                    return Err(GovernanceError::InvalidObject(format!(
                        "invalid trigger signature from {}",
                        outpoint.to_string_short()
                    )));
                }
                Ok(())
            }
            GovernanceObjectType::Other(kind) => {
                Err(GovernanceError::InvalidObject(format!("unsupported object type {}", kind)))
            }
        }
    }

    /// Inserts a validated object, registers triggers, replays orphan votes and relays.
    fn add_governance_object(
        &self,
        object: GovernanceObject,
        peer: Option<PeerId>,
        mn_list: &MasternodeList,
        now: i64,
    ) -> GovernanceResult<()> {
        let relay_object = object.clone();
        let (hash, replayed) = {
            let mut store = self.lock_store();
            let hash = store.insert(object, mn_list, now)?;

            if relay_object.object_type == GovernanceObjectType::Trigger && !store.try_register_trigger(&hash) {
                warn!("failed to register trigger {}, marking for deletion", hex::encode(hash));
                if let Some(stored) = store.find_mut(&hash) {
                    stored.prepare_deletion(now);
                }
                return Ok(());
            }

            store.rate_record(&relay_object, now);
            let replayed = store.check_orphan_votes(&hash, mn_list, now);
            (hash, replayed)
        };

        match peer {
            Some(peer) => info!("object {} new, received from peer {}", hex::encode(hash), peer),
            None => info!("object {} new, submitted locally", hex::encode(hash)),
        }
        self.relay(Inventory::object(hash));
        self.ctx.sync.bump_asset_last_time(ASSET_OBJECT);
        for vote in &replayed {
            self.relay_vote(vote, mn_list);
        }
        if !replayed.is_empty() {
            debug!("replayed {} orphan votes for {}", replayed.len(), hex::encode(hash));
        }
        Ok(())
    }

    // ---- local submission ----

    /// Submits a locally created object, e.g. from RPC.
    ///
    /// Objects waiting for collateral confirmations are postponed.
    pub fn submit_object(&self, object: GovernanceObject) -> GovernanceResult<Hash> {
        let hash = object.hash();
        let mn_list = self.mn_list();
        let now = self.now();
        {
            let mut store = self.lock_store();
            if store.is_known(&hash) {
                return Err(GovernanceError::AlreadyKnown(hash));
            }
            if self.ctx.sync.is_synced() && !store.rate_check(&object, now, true, false).is_ok() {
                return Err(GovernanceError::RateLimited(object.masternode_outpoint.clone()));
            }
        }
        match self.validate_locally(&object, &mn_list) {
            Ok(()) => {}
            Err(GovernanceError::MissingConfirmations) => {
                self.add_postponed_object(object);
                return Ok(hash);
            }
            Err(err) => return Err(err),
        }
        self.add_governance_object(object, None, &mn_list, now)?;
        Ok(hash)
    }

    /// Applies a locally created vote and relays it.
    pub fn process_vote_and_relay(&self, vote: &GovernanceVote) -> GovernanceResult<()> {
        self.process_vote(None, vote)
    }

    pub fn add_postponed_object(&self, object: GovernanceObject) {
        self.lock_store().mark_postponed(object);
    }

    /// Decides whether an announced item should be requested.
    pub fn confirm_inventory_request(&self, inventory: &Inventory) -> bool {
        if !self.ctx.sync.is_blockchain_synced() {
            return false;
        }
        let is_vote = inventory.kind == InventoryKind::Vote;
        self.lock_store()
            .confirm_inventory_request(&inventory.hash, is_vote, self.now())
    }

    // ---- requests to peers ----

    /// Asks `peer` for an object and its votes; with `use_filter` the votes
    /// we already have are excluded through a bloom filter.
    pub fn request_governance_object(&self, peer: PeerId, object_hash: &Hash, use_filter: bool) {
        let mut filter = BloomFilter::empty();
        if use_filter {
            let store = self.lock_store();
            if let Some(stored) = store.find(object_hash) {
                filter = BloomFilter::new(
                    self.params.governance_filter_elements,
                    BLOOM_FP_RATE,
                    filter_tweak(object_hash),
                );
                for vote in stored.votes.votes() {
                    filter.insert(&vote.hash());
                }
            }
        }
        debug!("requesting object {} from peer {}", hex::encode(object_hash), peer);
        self.ctx.peers.push_message(
            peer,
            GovernanceMessage::SyncRequest { object_hash: *object_hash, filter },
        );
    }

    /// Spreads vote requests for known objects over `peers`, triggers first.
    ///
    /// Returns the number of objects still waiting to be asked for.
    pub fn request_governance_object_votes(&self, peers: &[PeerInfo]) -> usize {
        if peers.is_empty() {
            return 0;
        }
        let now = self.now();
        let mn_list = self.mn_list();
        let max_requests = match self.params.network {
            Network::Mainnet => 1,
            _ => (PROJECTED_VOTES_PER_REQUEST / mn_list.valid_count().max(1)).max(1),
        };
        let peers_per_hash = self.config.peers_per_hash;

        let mut requests: Vec<(PeerId, Hash)> = Vec::new();
        let remaining = {
            let mut store = self.lock_store();
            let mut triggers = Vec::new();
            let mut others = Vec::new();
            let candidates: Vec<(Hash, GovernanceObjectType)> = store
                .objects
                .iter()
                .filter(|(_, stored)| !stored.is_deleted_or_expired())
                .map(|(hash, stored)| (*hash, stored.object_type()))
                .collect();
            for (hash, object_type) in candidates {
                if let Some(asked) = store.asked_recently.get_mut(&hash) {
                    asked.retain(|_, until| *until >= now);
                    if asked.len() >= peers_per_hash {
                        continue;
                    }
                }
                if object_type == GovernanceObjectType::Trigger {
                    triggers.push(hash);
                } else {
                    others.push(hash);
                }
            }

            let mut queue = triggers;
            let trigger_count = queue.len();
            queue.extend(others);
            let mut asked_objects = 0;
            let mut consumed = 0;
            for hash in &queue {
                if asked_objects >= max_requests {
                    break;
                }
                consumed += 1;
                let asked = store.asked_recently.entry(*hash).or_default();
                let mut asked_any = false;
                for peer in peers {
                    if !peer.can_relay || asked.contains_key(&peer.id) {
                        continue;
                    }
                    asked.insert(peer.id, now + self.config.asked_recently_secs);
                    requests.push((peer.id, *hash));
                    asked_any = true;
                    if asked.len() >= peers_per_hash {
                        break;
                    }
                }
                if asked_any {
                    asked_objects += 1;
                }
            }
            debug!(
                "vote requests: {} triggers, {} other objects, {} asked",
                trigger_count,
                queue.len() - trigger_count,
                asked_objects
            );
            queue.len() - consumed
        };

        for (peer, hash) in requests {
            self.request_governance_object(peer, &hash, true);
        }
        remaining
    }

    // ---- relay ----

    fn relay(&self, inventory: Inventory) {
        if !self.ctx.sync.is_synced() {
            return;
        }
        self.lock_relay_queue().push(inventory);
    }

    fn relay_vote(&self, vote: &GovernanceVote, mn_list: &MasternodeList) {
        if mn_list.get_by_collateral(&vote.masternode_outpoint).is_none() {
            return;
        }
        self.relay(Inventory::vote(vote.hash()));
    }

    /// Sends every queued inventory item to the network.
    pub fn flush_relay_queue(&self) -> usize {
        let queued = mem::take(&mut *self.lock_relay_queue());
        for inventory in &queued {
            self.ctx.peers.relay_inventory(*inventory);
        }
        queued.len()
    }

    pub fn relay_queue_len(&self) -> usize {
        self.lock_relay_queue().len()
    }

    // ---- maintenance ----

    /// Periodic cleanup: orphan votes, orphan parent requests and the store sweep.
    pub fn do_maintenance(&self) {
        if !self.ctx.sync.is_blockchain_synced() {
            return;
        }
        let now = self.now();
        let mn_list = self.mn_list();

        let parents = {
            let mut store = self.lock_store();
            store.clean_orphan_votes(now);
            store.orphan_parents()
        };
        if !parents.is_empty() {
            let peers: Vec<PeerInfo> = self
                .ctx
                .peers
                .relay_capable_peers()
                .into_iter()
                .filter(|peer| peer.can_relay)
                .collect();
            for parent in &parents {
                for peer in &peers {
                    self.request_governance_object(peer.id, parent, false);
                }
            }
            debug!("requested {} orphan parents from {} peers", parents.len(), peers.len());
        }

        let mut store = self.lock_store();
        let erased = store.sweep(&mn_list, now);
        info!("{}, erased {} this pass", store, erased.len());
    }

    /// Handles a new chain tip.
    pub fn updated_block_tip(&self, height: u64, initial_download: bool) {
        if initial_download {
            return;
        }
        {
            let mut store = self.lock_store();
            if height <= store.cached_height() {
                return;
            }
            store.set_cached_height(height);
        }
        debug!("updated block tip: height = {}", height);

        let mn_list = self.mn_list();
        let synced = self.ctx.sync.is_synced();
        if synced && self.ctx.chain.mn_list_enforced(height) {
            self.lock_store().remove_invalid_votes(&mn_list);
        }
        if synced {
            self.check_postponed_objects(&mn_list);
        }
        if let Some(hash) = self.lock_store().execute_best_superblock(height, &mn_list) {
            debug!("best superblock at height {}: {}", height, hex::encode(hash));
        }
    }

    fn check_postponed_objects(&self, mn_list: &MasternodeList) {
        let now = self.now();
        let postponed = self.lock_store().postponed_objects();
        let checked: Vec<(GovernanceObject, CollateralStatus)> = postponed
            .into_iter()
            .map(|object| {
                let status = self.ctx.chain.check_collateral(&object);
                (object, status)
            })
            .collect();
        let promoted = self.lock_store().promote_postponed(checked, now);
        for hash in &promoted.dropped {
            debug!("dropped postponed object {}", hex::encode(hash));
        }
        for object in promoted.ready {
            let hash = object.hash();
            if let Err(err) = self.add_governance_object(object, None, mn_list, now) {
                error!("failed to add postponed object {}: {}", hex::encode(hash), err);
            }
        }

        let due = self.lock_store().due_additional_relays(now);
        for hash in due {
            self.relay(Inventory::object(hash));
        }
    }

    // ---- queries ----

    pub fn is_superblock_triggered(&self, height: u64) -> bool {
        if !self.ctx.sporks.superblocks_enabled() {
            return false;
        }
        let mn_list = self.mn_list();
        let now = self.now();
        self.lock_store().is_superblock_triggered(height, &mn_list, now)
    }

    pub fn get_superblock_payments(&self, height: u64) -> Option<Vec<TxOutput>> {
        if !self.ctx.sporks.superblocks_enabled() {
            return None;
        }
        let mn_list = self.mn_list();
        self.lock_store().superblock_payments(height, &mn_list)
    }

    /// Validates the coinbase of the superblock at `height`.
    pub fn validate_superblock(&self, coinbase: &CoinbaseTransaction, height: u64, block_reward: u64) -> bool {
        if !self.params.is_valid_superblock_height(height) {
            return false;
        }
        let budget = self.ctx.chain.superblock_budget(height);
        let mn_list = self.mn_list();
        self.lock_store()
            .is_valid_superblock(coinbase, height, block_reward, budget, &mn_list)
    }

    /// Proposals passing the funding threshold, best first.
    pub fn get_approved_proposals(&self, min_quorum_override: Option<u64>) -> Vec<GovernanceObject> {
        let mn_list = self.mn_list();
        self.lock_store().approved_proposals(&mn_list, min_quorum_override)
    }

    pub fn serialize_object_for_hash(&self, hash: &Hash) -> Option<Vec<u8>> {
        self.lock_store().serialize_object_for_hash(hash)
    }

    pub fn serialize_vote_for_hash(&self, hash: &Hash) -> Option<Vec<u8>> {
        self.lock_store().serialize_vote_for_hash(hash)
    }

    pub fn have_object_for_hash(&self, hash: &Hash) -> bool {
        self.lock_store().have_object_for_hash(hash)
    }

    pub fn have_vote_for_hash(&self, hash: &Hash) -> bool {
        self.lock_store().have_vote_for_hash(hash)
    }

    pub fn vote_count(&self) -> usize {
        self.lock_store().vote_count()
    }

    pub fn current_votes(&self, parent: &Hash, filter: Option<&OutPoint>) -> Vec<GovernanceVote> {
        let mn_list = self.mn_list();
        self.lock_store().current_votes(parent, &mn_list, filter)
    }

    pub fn all_newer_than(&self, time: i64) -> Vec<GovernanceObject> {
        self.lock_store().all_newer_than(time)
    }

    pub fn find_object_by_data_hash(&self, data_hash: &Hash) -> Option<GovernanceObject> {
        self.lock_store().find_by_data_hash(data_hash)
    }

    pub fn find_object(&self, hash: &Hash) -> Option<GovernanceObject> {
        self.lock_store().find(hash).map(|stored| stored.object.clone())
    }

    pub fn active_triggers(&self) -> Vec<Superblock> {
        self.lock_store().active_triggers()
    }

    pub fn stats(&self) -> GovernanceStats {
        self.lock_store().stats()
    }

    /// Runs `f` with the store locked.
    pub fn with_locked_store<R>(&self, f: impl FnOnce(&mut GovernanceStore) -> R) -> R {
        f(&mut self.lock_store())
    }
}
