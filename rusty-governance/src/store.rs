//! In-memory governance object store.
//!
//! The store owns every piece of governance state: live objects, postponed
//! objects, tombstones of erased objects, orphan votes, the invalid-vote
//! cache, the vote index, requested hashes, rate limiting and the trigger
//! index. It performs no I/O; the manager wraps it in a single mutex.

use log::{debug, info};
use lru::LruCache;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::num::NonZeroUsize;

use rusty_shared_types::{
    GovernanceObject, GovernanceObjectType, GovernanceParams, GovernanceVote, Hash, MasternodeList, OutPoint,
    VoteSignal,
};

use crate::config::{GovernanceConfig, MAX_TIME_FUTURE_DEVIATION, RELIABLE_PROPAGATION_TIME};
use crate::error::{GovernanceError, GovernanceResult};
use crate::interfaces::CollateralStatus;
use crate::payload::ObjectPayload;
use crate::rate_check::{RateCheck, RateLimiter};
use crate::triggers::TriggerIndex;
use crate::vote_file::VoteFile;

/// Cached flags of a stored object.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectFlags {
    /// Votes changed since the sentinel flags were computed.
    pub dirty: bool,
    pub expired: bool,
    pub cached_delete: bool,
    pub cached_funding: bool,
    pub cached_valid: bool,
    pub cached_endorsed: bool,
}

/// A governance object accepted into the main store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredObject {
    pub object: GovernanceObject,
    /// `None` when the payload could not be parsed.
    pub payload: Option<ObjectPayload>,
    pub flags: ObjectFlags,
    /// Time the object was first flagged for deletion, 0 if never.
    pub deletion_time: i64,
    pub votes: VoteFile,
}

impl StoredObject {
    pub fn new(object: GovernanceObject) -> Self {
        let payload = ObjectPayload::parse(&object).ok();
        StoredObject {
            object,
            payload,
            flags: ObjectFlags { dirty: true, cached_valid: true, ..ObjectFlags::default() },
            deletion_time: 0,
            votes: VoteFile::new(),
        }
    }

    pub fn hash(&self) -> Hash {
        self.object.hash()
    }

    pub fn object_type(&self) -> GovernanceObjectType {
        self.object.object_type
    }

    pub fn is_deleted_or_expired(&self) -> bool {
        self.flags.cached_delete || self.flags.expired
    }

    /// Flags the object for deletion; the first deletion time sticks.
    pub fn prepare_deletion(&mut self, now: i64) {
        self.flags.cached_delete = true;
        if self.deletion_time == 0 {
            self.deletion_time = now;
        }
    }

    /// Recomputes funding, valid, delete and endorsed from the current votes.
    pub fn update_sentinel_variables(&mut self, mn_list: &MasternodeList, min_quorum: u64, now: i64) {
        let Some(flags) = self.votes.sentinel_flags(mn_list, min_quorum) else {
            return;
        };
        self.flags.cached_funding = flags.funding;
        self.flags.cached_valid = flags.valid;
        self.flags.cached_endorsed = flags.endorsed;
        if flags.delete && !self.flags.cached_delete {
            self.prepare_deletion(now);
        }
        self.flags.dirty = false;
    }
}

/// Counters reported by [`GovernanceStore::stats`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GovernanceStats {
    pub objects_total: usize,
    pub proposals: usize,
    pub triggers: usize,
    pub other: usize,
    pub erased: usize,
    pub votes: usize,
}

impl GovernanceStats {
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "objects_total": self.objects_total,
            "proposals": self.proposals,
            "triggers": self.triggers,
            "other": self.other,
            "erased": self.erased,
            "votes": self.votes,
        })
    }
}

impl fmt::Display for GovernanceStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Governance Objects: {} (Proposals: {}, Triggers: {}, Other: {}; Erased: {}), Votes: {}",
            self.objects_total, self.proposals, self.triggers, self.other, self.erased, self.votes
        )
    }
}

/// Outcome of re-checking postponed objects.
#[derive(Debug, Default)]
pub struct PromotedObjects {
    /// Objects whose collateral is now confirmed, ready to be added.
    pub ready: Vec<GovernanceObject>,
    pub dropped: Vec<Hash>,
}

pub struct GovernanceStore {
    pub(crate) params: GovernanceParams,
    pub(crate) config: GovernanceConfig,
    pub(crate) objects: BTreeMap<Hash, StoredObject>,
    pub(crate) postponed: BTreeMap<Hash, GovernanceObject>,
    /// Tombstones: hash -> time after which the hash is forgotten.
    pub(crate) erased: HashMap<Hash, i64>,
    /// Vote hash -> vote waiting for its parent, with its expiry.
    pub(crate) orphan_votes: LruCache<Hash, (GovernanceVote, i64)>,
    pub(crate) invalid_votes: LruCache<Hash, GovernanceVote>,
    /// Vote hash -> parent object hash.
    pub(crate) vote_index: LruCache<Hash, Hash>,
    /// Hashes we asked peers for, with the time the request lapses.
    pub(crate) requested_hashes: HashMap<Hash, i64>,
    pub(crate) rate_limiter: RateLimiter,
    pub(crate) additional_relay: HashSet<Hash>,
    pub(crate) triggers: TriggerIndex,
    /// Masternode list seen by the last vote cleanup.
    pub(crate) last_mn_list: Option<MasternodeList>,
    /// Objects each masternode voted on.
    pub(crate) mn_votes: HashMap<OutPoint, HashSet<Hash>>,
    /// Object hash -> peer -> time the ask lapses.
    pub(crate) asked_recently: HashMap<Hash, HashMap<u64, i64>>,
    pub(crate) cached_height: u64,
}

impl GovernanceStore {
    pub fn new(params: GovernanceParams, config: GovernanceConfig) -> Self {
        let cache_size = NonZeroUsize::new(config.max_cache_size).unwrap_or(NonZeroUsize::MIN);
        let orphan_size = NonZeroUsize::new(config.max_orphan_votes).unwrap_or(NonZeroUsize::MIN);
        GovernanceStore {
            params,
            config,
            objects: BTreeMap::new(),
            postponed: BTreeMap::new(),
            erased: HashMap::new(),
            orphan_votes: LruCache::new(orphan_size),
            invalid_votes: LruCache::new(cache_size),
            vote_index: LruCache::new(cache_size),
            requested_hashes: HashMap::new(),
            rate_limiter: RateLimiter::new(),
            additional_relay: HashSet::new(),
            triggers: TriggerIndex::new(),
            last_mn_list: None,
            mn_votes: HashMap::new(),
            asked_recently: HashMap::new(),
            cached_height: 0,
        }
    }

    pub fn params(&self) -> &GovernanceParams {
        &self.params
    }

    pub fn config(&self) -> &GovernanceConfig {
        &self.config
    }

    pub fn cached_height(&self) -> u64 {
        self.cached_height
    }

    pub fn set_cached_height(&mut self, height: u64) {
        self.cached_height = height;
    }

    // ---- objects ----

    /// Inserts a validated object. Fails if the hash is already stored.
    pub fn insert(&mut self, object: GovernanceObject, mn_list: &MasternodeList, now: i64) -> GovernanceResult<Hash> {
        let hash = object.hash();
        if self.objects.contains_key(&hash) {
            return Err(GovernanceError::AlreadyKnown(hash));
        }
        let mut stored = StoredObject::new(object);
        stored.update_sentinel_variables(mn_list, self.params.governance_min_quorum, now);
        debug!(
            "Adding object: hash = {}, type = {:?}",
            hex::encode(hash),
            stored.object_type()
        );
        self.postponed.remove(&hash);
        self.objects.insert(hash, stored);
        Ok(hash)
    }

    pub fn find(&self, hash: &Hash) -> Option<&StoredObject> {
        self.objects.get(hash)
    }

    pub fn find_mut(&mut self, hash: &Hash) -> Option<&mut StoredObject> {
        self.objects.get_mut(hash)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Live or postponed.
    pub fn have_object_for_hash(&self, hash: &Hash) -> bool {
        self.objects.contains_key(hash) || self.postponed.contains_key(hash)
    }

    pub fn is_erased(&self, hash: &Hash) -> bool {
        self.erased.contains_key(hash)
    }

    /// Live, postponed or tombstoned; such hashes are never accepted again.
    pub fn is_known(&self, hash: &Hash) -> bool {
        self.have_object_for_hash(hash) || self.is_erased(hash)
    }

    pub fn mark_postponed(&mut self, object: GovernanceObject) {
        let hash = object.hash();
        debug!("Postponing object {}", hex::encode(hash));
        self.postponed.insert(hash, object);
    }

    pub fn postponed_objects(&self) -> Vec<GovernanceObject> {
        self.postponed.values().cloned().collect()
    }

    pub fn remove_postponed(&mut self, hash: &Hash) -> Option<GovernanceObject> {
        self.postponed.remove(hash)
    }

    /// Sorts postponed objects by their fresh collateral status.
    ///
    /// Confirmed objects leave the postponed set and are returned for
    /// insertion, invalid ones are dropped, the rest keep waiting.
    pub fn promote_postponed(&mut self, checked: Vec<(GovernanceObject, CollateralStatus)>, now: i64) -> PromotedObjects {
        let mut result = PromotedObjects::default();
        for (object, status) in checked {
            let hash = object.hash();
            if !self.postponed.contains_key(&hash) {
                continue;
            }
            match status {
                CollateralStatus::MissingConfirmations => {}
                CollateralStatus::Valid => {
                    let structurally_valid = match ObjectPayload::parse(&object) {
                        Ok(ObjectPayload::Proposal(proposal)) => proposal.validate(now, false).is_ok(),
                        Ok(_) => true,
                        Err(_) => false,
                    };
                    self.postponed.remove(&hash);
                    if structurally_valid {
                        result.ready.push(object);
                    } else {
                        result.dropped.push(hash);
                    }
                }
                CollateralStatus::Invalid(reason) => {
                    debug!("dropping postponed object {}: {}", hex::encode(hash), reason);
                    self.postponed.remove(&hash);
                    result.dropped.push(hash);
                }
            }
        }
        result
    }

    pub fn serialize_object_for_hash(&self, hash: &Hash) -> Option<Vec<u8>> {
        let object = self
            .objects
            .get(hash)
            .map(|stored| &stored.object)
            .or_else(|| self.postponed.get(hash))?;
        bincode::serialize(object).ok()
    }

    pub fn find_by_data_hash(&self, data_hash: &Hash) -> Option<GovernanceObject> {
        self.objects
            .values()
            .find(|stored| &stored.object.data_hash() == data_hash)
            .map(|stored| stored.object.clone())
    }

    /// Objects created at or after `time`.
    pub fn all_newer_than(&self, time: i64) -> Vec<GovernanceObject> {
        self.objects
            .values()
            .filter(|stored| stored.object.creation_time >= time)
            .map(|stored| stored.object.clone())
            .collect()
    }

    /// Hashes offered to a peer doing a full sync.
    pub fn sync_object_hashes(&self) -> Vec<Hash> {
        self.objects
            .iter()
            .filter(|(hash, stored)| {
                if stored.is_deleted_or_expired() {
                    debug!("not syncing deleted/expired govobj: {}", hex::encode(hash));
                    return false;
                }
                true
            })
            .map(|(hash, _)| *hash)
            .collect()
    }

    /// Proposals with enough net funding votes, best first.
    pub fn approved_proposals(&self, mn_list: &MasternodeList, min_quorum_override: Option<u64>) -> Vec<GovernanceObject> {
        let min_quorum = min_quorum_override
            .filter(|q| *q > 0)
            .unwrap_or(self.params.governance_min_quorum);
        let required = min_quorum.max(mn_list.valid_weighted_count() / 10) as i64;

        let mut approved: Vec<(i64, Hash, &GovernanceObject)> = self
            .objects
            .iter()
            .filter(|(_, stored)| stored.object_type() == GovernanceObjectType::Proposal)
            .map(|(hash, stored)| (stored.votes.absolute_yes_count(mn_list, VoteSignal::Funding), *hash, &stored.object))
            .filter(|(yes, _, _)| *yes >= required)
            .collect();
        approved.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| b.1.cmp(&a.1)));
        approved.into_iter().map(|(_, _, object)| object.clone()).collect()
    }

    // ---- requested hashes ----

    /// Records that we are about to request `hash`. Refuses hashes we already have.
    pub fn confirm_inventory_request(&mut self, hash: &Hash, is_vote: bool, now: i64) -> bool {
        let already_have = if is_vote {
            self.vote_index.contains(hash)
        } else {
            self.is_known(hash)
        };
        if already_have {
            debug!("already have {}, not requesting", hex::encode(hash));
            return false;
        }
        if !self.requested_hashes.contains_key(hash) {
            self.requested_hashes.insert(*hash, now + RELIABLE_PROPAGATION_TIME);
            debug!(
                "added {} to requested hashes, size={}",
                hex::encode(hash),
                self.requested_hashes.len()
            );
        }
        true
    }

    /// Consumes the request entry for `hash`; false if it was never requested.
    pub fn accept_message(&mut self, hash: &Hash) -> bool {
        self.requested_hashes.remove(hash).is_some()
    }

    // ---- rate limiting ----

    /// Rate check for `object`; only triggers are limited.
    pub fn rate_check(&mut self, object: &GovernanceObject, now: i64, force: bool, update_fail_status: bool) -> RateCheck {
        if object.object_type != GovernanceObjectType::Trigger {
            return RateCheck::Passed;
        }
        let cycle_seconds = self.params.superblock_cycle_seconds();
        self.rate_limiter.check(
            &object.masternode_outpoint,
            object.creation_time,
            now,
            cycle_seconds,
            force,
            update_fail_status,
        )
    }

    pub fn rate_record(&mut self, object: &GovernanceObject, now: i64) {
        if object.object_type != GovernanceObjectType::Trigger {
            return;
        }
        if self.rate_limiter.record(&object.masternode_outpoint, object.creation_time, now) {
            self.additional_relay.insert(object.hash());
        }
    }

    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.rate_limiter
    }

    /// Triggers recorded for a later relay whose timestamp is now close enough.
    ///
    /// Entries that left the valid window or lost their object are dropped.
    pub fn due_additional_relays(&mut self, now: i64) -> Vec<Hash> {
        let cycle_seconds = self.params.superblock_cycle_seconds();
        let mut due = Vec::new();
        let objects = &self.objects;
        self.additional_relay.retain(|hash| {
            let Some(stored) = objects.get(hash) else {
                debug!("additional relay of unknown object: {}", hex::encode(hash));
                return false;
            };
            let timestamp = stored.object.creation_time;
            let valid = timestamp <= now + MAX_TIME_FUTURE_DEVIATION && timestamp >= now - 2 * cycle_seconds;
            let ready = timestamp <= now + MAX_TIME_FUTURE_DEVIATION - RELIABLE_PROPAGATION_TIME;
            if valid && !ready {
                return true;
            }
            if valid {
                debug!("additional relay: hash = {}", hex::encode(hash));
                due.push(*hash);
            }
            false
        });
        due
    }

    // ---- votes ----

    /// Applies a vote to its parent, buffering it as an orphan when the parent is unknown.
    ///
    /// An `OrphanVote` error means the vote was newly buffered and the parent
    /// should be requested.
    pub fn process_vote(
        &mut self,
        vote: &GovernanceVote,
        mn_list: &MasternodeList,
        now: i64,
        enforce_update_min: bool,
    ) -> GovernanceResult<()> {
        let vote_hash = vote.hash();
        if self.vote_index.contains(&vote_hash) {
            debug!(
                "skipping known valid vote {} for object {}",
                hex::encode(vote_hash),
                hex::encode(vote.parent_hash)
            );
            return Err(GovernanceError::DuplicateVote(vote_hash));
        }
        if self.invalid_votes.contains(&vote_hash) {
            debug!(
                "old invalid vote, MN outpoint = {}, governance object hash = {}",
                vote.masternode_outpoint.to_string_short(),
                hex::encode(vote.parent_hash)
            );
            return Err(GovernanceError::KnownInvalidVote(vote_hash));
        }
        if !self.objects.contains_key(&vote.parent_hash) {
            let expiry = now + self.config.orphan_expiration_secs;
            return if self.add_orphan_vote(vote.clone(), expiry) {
                Err(GovernanceError::OrphanVote(vote.parent_hash))
            } else {
                Err(GovernanceError::DuplicateVote(vote_hash))
            };
        }
        self.apply_vote(vote, mn_list, now, enforce_update_min)
    }

    fn apply_vote(
        &mut self,
        vote: &GovernanceVote,
        mn_list: &MasternodeList,
        now: i64,
        enforce_update_min: bool,
    ) -> GovernanceResult<()> {
        let parent = vote.parent_hash;
        let stored = self
            .objects
            .get_mut(&parent)
            .ok_or(GovernanceError::OrphanVote(parent))?;
        if stored.is_deleted_or_expired() {
            debug!("ignoring vote for expired or deleted object, hash = {}", hex::encode(parent));
            return Err(GovernanceError::ObjectDeleted(parent));
        }

        let object_type = stored.object_type();
        match stored.votes.add_or_update(vote, mn_list, object_type, now, enforce_update_min) {
            Ok(()) => {
                stored.flags.dirty = true;
                self.vote_index.put(vote.hash(), parent);
                self.mn_votes
                    .entry(vote.masternode_outpoint.clone())
                    .or_default()
                    .insert(parent);
                Ok(())
            }
            Err(err) => {
                if matches!(
                    err,
                    GovernanceError::InvalidVoteSignature(_) | GovernanceError::VoteTooFarInFuture(_)
                ) {
                    self.invalid_votes.put(vote.hash(), vote.clone());
                }
                Err(err)
            }
        }
    }

    /// Buffers a vote for an unknown parent; the least recently added vote
    /// is evicted once the buffer is full.
    fn add_orphan_vote(&mut self, vote: GovernanceVote, expiry: i64) -> bool {
        let hash = vote.hash();
        if self.orphan_votes.contains(&hash) {
            return false;
        }
        if let Some((evicted, _)) = self.orphan_votes.push(hash, (vote, expiry)) {
            debug!("orphan vote buffer full, evicted {}", hex::encode(evicted));
        }
        true
    }

    /// Replays orphan votes of `parent`; returns the votes accepted.
    ///
    /// Expired votes are dropped; votes failing for other reasons stay until they expire.
    pub fn check_orphan_votes(&mut self, parent: &Hash, mn_list: &MasternodeList, now: i64) -> Vec<GovernanceVote> {
        let hashes: Vec<Hash> = self
            .orphan_votes
            .iter()
            .rev()
            .filter(|(_, (vote, _))| vote.parent_hash == *parent)
            .map(|(hash, _)| *hash)
            .collect();
        let mut accepted = Vec::new();
        for hash in hashes {
            let Some((vote, expiry)) = self.orphan_votes.pop(&hash) else {
                continue;
            };
            if expiry < now {
                continue;
            }
            match self.apply_vote(&vote, mn_list, now, false) {
                Ok(()) => accepted.push(vote),
                Err(err) => {
                    debug!("orphan vote {} not applied: {}", hex::encode(hash), err);
                    self.orphan_votes.put(hash, (vote, expiry));
                }
            }
        }
        accepted
    }

    /// Drops expired orphan votes.
    pub fn clean_orphan_votes(&mut self, now: i64) {
        let expired: Vec<Hash> = self
            .orphan_votes
            .iter()
            .filter(|(_, (_, expiry))| *expiry < now)
            .map(|(hash, _)| *hash)
            .collect();
        for hash in &expired {
            self.orphan_votes.pop(hash);
        }
    }

    /// Parents of orphan votes that we still do not have.
    pub fn orphan_parents(&self) -> Vec<Hash> {
        let mut parents: Vec<Hash> = self
            .orphan_votes
            .iter()
            .map(|(_, (vote, _))| vote.parent_hash)
            .filter(|hash| !self.objects.contains_key(hash))
            .collect();
        parents.sort();
        parents.dedup();
        parents
    }

    pub fn orphan_vote_count(&self) -> usize {
        self.orphan_votes.len()
    }

    pub fn is_invalid_vote(&self, hash: &Hash) -> bool {
        self.invalid_votes.contains(hash)
    }

    pub fn have_vote_for_hash(&self, hash: &Hash) -> bool {
        self.vote_index
            .peek(hash)
            .and_then(|parent| self.objects.get(parent))
            .map_or(false, |stored| stored.votes.has_vote(hash))
    }

    pub fn serialize_vote_for_hash(&self, hash: &Hash) -> Option<Vec<u8>> {
        let parent = self.vote_index.peek(hash)?;
        self.objects.get(parent)?.votes.serialize_for_hash(hash)
    }

    pub fn vote_count(&self) -> usize {
        self.vote_index.len()
    }

    /// Current votes on `parent` by masternodes in `mn_list`, optionally for one masternode.
    pub fn current_votes(&self, parent: &Hash, mn_list: &MasternodeList, filter: Option<&OutPoint>) -> Vec<GovernanceVote> {
        let Some(stored) = self.objects.get(parent) else {
            return Vec::new();
        };
        stored
            .votes
            .current_votes(filter)
            .into_iter()
            .filter(|vote| mn_list.get_by_collateral(&vote.masternode_outpoint).is_some())
            .collect()
    }

    /// Vote hashes of `parent` to offer a peer, skipping those in its filter
    /// and those whose signature no longer verifies.
    pub fn sync_vote_hashes<F>(&self, parent: &Hash, mn_list: &MasternodeList, now: i64, mut in_filter: F) -> Option<Vec<Hash>>
    where
        F: FnMut(&Hash) -> bool,
    {
        let stored = self.objects.get(parent)?;
        if stored.is_deleted_or_expired() {
            debug!("not syncing deleted/expired govobj: {}", hex::encode(parent));
            return None;
        }
        let object_type = stored.object_type();
        let mut hashes = Vec::new();
        for vote in stored.votes.votes() {
            let hash = vote.hash();
            if in_filter(&hash) {
                continue;
            }
            let Some(mn) = mn_list.get_by_collateral(&vote.masternode_outpoint) else {
                continue;
            };
            let only_voting_key = object_type == GovernanceObjectType::Proposal && vote.signal == VoteSignal::Funding;
            let signature_ok = vote.verify_signature(&mn.voting_key)
                || (!only_voting_key && vote.verify_signature(&mn.operator_key));
            if !signature_ok || vote.time > now + MAX_TIME_FUTURE_DEVIATION {
                continue;
            }
            hashes.push(hash);
        }
        Some(hashes)
    }

    /// Purges votes of masternodes whose keys changed or that left the list
    /// since the last call. Returns the number of removed votes.
    pub fn remove_invalid_votes(&mut self, mn_list: &MasternodeList) -> usize {
        let changed: Vec<OutPoint> = match &self.last_mn_list {
            Some(last) => last.build_diff(mn_list).affected().cloned().collect(),
            None => Vec::new(),
        };
        let mut removed_total = 0;
        for outpoint in &changed {
            for stored in self.objects.values_mut() {
                let object_type = stored.object_type();
                let removed = stored.votes.remove_invalid_votes(mn_list, outpoint, object_type);
                if removed.is_empty() {
                    continue;
                }
                stored.flags.dirty = true;
                removed_total += removed.len();
                for hash in &removed {
                    self.vote_index.pop(hash);
                    self.invalid_votes.pop(hash);
                    self.requested_hashes.remove(hash);
                }
                for hash in &removed {
                    self.orphan_votes.pop(hash);
                }
            }
        }
        if removed_total > 0 {
            info!(
                "Removed {} votes of {} masternodes with changed keys",
                removed_total,
                changed.len()
            );
        }
        self.last_mn_list = Some(mn_list.clone());
        removed_total
    }

    /// Drops all votes of masternodes that are no longer in the list.
    fn clear_departed_masternode_votes(&mut self, mn_list: &MasternodeList) {
        let departed: Vec<OutPoint> = self
            .mn_votes
            .keys()
            .filter(|outpoint| mn_list.get_by_collateral(outpoint).is_none())
            .cloned()
            .collect();
        for outpoint in departed {
            let Some(parents) = self.mn_votes.remove(&outpoint) else {
                continue;
            };
            for parent in parents {
                let Some(stored) = self.objects.get_mut(&parent) else {
                    continue;
                };
                let removed = stored.votes.remove_votes_from_masternode(&outpoint);
                if !removed.is_empty() {
                    stored.flags.dirty = true;
                }
                for hash in removed {
                    self.vote_index.pop(&hash);
                }
            }
        }
    }

    // ---- maintenance ----

    /// Periodic cleanup: departed voters, triggers, flags, erasure, tombstones and requests.
    ///
    /// Returns the hashes erased in this pass.
    pub fn sweep(&mut self, mn_list: &MasternodeList, now: i64) -> Vec<Hash> {
        self.clear_departed_masternode_votes(mn_list);
        self.sweep_triggers(now);

        let min_quorum = self.params.governance_min_quorum;
        let deletion_delay = self.config.deletion_delay_secs;
        let cycle_seconds = self.params.superblock_cycle_seconds();

        let mut erase = Vec::new();
        for (hash, stored) in self.objects.iter_mut() {
            if stored.flags.dirty {
                stored.update_sentinel_variables(mn_list, min_quorum, now);
            }

            if stored.is_deleted_or_expired() && now - stored.deletion_time >= deletion_delay {
                erase.push(*hash);
                continue;
            }

            if stored.object_type() == GovernanceObjectType::Proposal {
                let still_valid = match &stored.payload {
                    Some(ObjectPayload::Proposal(proposal)) => proposal.validate(now, true).is_ok(),
                    _ => false,
                };
                if !still_valid {
                    debug!("set for deletion expired obj {}", hex::encode(hash));
                    stored.prepare_deletion(now);
                }
            }
        }

        for hash in &erase {
            let Some(stored) = self.objects.remove(hash) else {
                continue;
            };
            info!(
                "erase obj {} type {:?}",
                hex::encode(hash),
                stored.object_type()
            );
            for vote_hash in stored.votes.vote_hashes() {
                self.vote_index.pop(vote_hash);
            }
            let expires = match stored.object_type() {
                GovernanceObjectType::Proposal => i64::MAX,
                _ => stored.object.creation_time + 2 * cycle_seconds + deletion_delay,
            };
            self.erased.insert(*hash, expires);
            self.additional_relay.remove(hash);
            self.asked_recently.remove(hash);
            self.triggers.remove(hash);
        }

        self.erased.retain(|_, expires| *expires >= now);
        self.requested_hashes.retain(|_, valid_until| *valid_until >= now);
        erase
    }

    /// Recomputes the sentinel flags of every object.
    pub fn update_all_sentinel_variables(&mut self, mn_list: &MasternodeList, now: i64) {
        let min_quorum = self.params.governance_min_quorum;
        for stored in self.objects.values_mut() {
            stored.update_sentinel_variables(mn_list, min_quorum, now);
        }
    }

    /// Rebuilds the vote index and per-object vote lookups from the vote files.
    pub fn rebuild_indexes(&mut self) {
        self.vote_index.clear();
        self.mn_votes.clear();
        for (hash, stored) in self.objects.iter_mut() {
            stored.votes.rebuild_index();
            for vote in stored.votes.votes() {
                self.vote_index.put(vote.hash(), *hash);
                self.mn_votes
                    .entry(vote.masternode_outpoint.clone())
                    .or_default()
                    .insert(*hash);
            }
        }
    }

    pub fn stats(&self) -> GovernanceStats {
        let mut stats = GovernanceStats {
            objects_total: self.objects.len(),
            erased: self.erased.len(),
            votes: self.vote_index.len(),
            ..GovernanceStats::default()
        };
        for stored in self.objects.values() {
            match stored.object_type() {
                GovernanceObjectType::Proposal => stats.proposals += 1,
                GovernanceObjectType::Trigger => stats.triggers += 1,
                GovernanceObjectType::Other(_) => stats.other += 1,
            }
        }
        stats
    }

    pub fn clear(&mut self) {
        self.objects.clear();
        self.postponed.clear();
        self.erased.clear();
        self.orphan_votes.clear();
        self.invalid_votes.clear();
        self.vote_index.clear();
        self.requested_hashes.clear();
        self.rate_limiter.clear();
        self.additional_relay.clear();
        self.triggers.clear();
        self.last_mn_list = None;
        self.mn_votes.clear();
        self.asked_recently.clear();
    }
}

impl fmt::Display for GovernanceStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.stats().fmt(f)
    }
}
