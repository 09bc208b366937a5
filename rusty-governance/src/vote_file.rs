//! Vote collection of a single governance object.
//!
//! Every accepted vote is kept in arrival order so it can be served to
//! syncing peers. Next to the full file, the current outcome per
//! (masternode, signal) is tracked; that map drives all vote counting.

use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use rusty_shared_types::{
    GovernanceObjectType, GovernanceVote, Hash, MasternodeInfo, MasternodeList, OutPoint, VoteOutcome,
    VoteSignal,
};

use crate::config::{GOVERNANCE_UPDATE_MIN, MAX_TIME_FUTURE_DEVIATION};
use crate::error::{GovernanceError, GovernanceResult};

/// The authoritative vote of one masternode on one signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteInstance {
    pub outcome: VoteOutcome,
    /// Local time the instance was last updated.
    pub time: i64,
    /// Timestamp carried by the vote itself.
    pub creation_time: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteRecord {
    pub instances: BTreeMap<VoteSignal, VoteInstance>,
}

/// Flags derived from the current votes and the masternode count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SentinelFlags {
    pub funding: bool,
    pub valid: bool,
    pub delete: bool,
    pub endorsed: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VoteFile {
    votes: Vec<GovernanceVote>,
    current: BTreeMap<OutPoint, VoteRecord>,
    #[serde(skip)]
    index: HashMap<Hash, usize>,
}

impl PartialEq for VoteFile {
    fn eq(&self, other: &Self) -> bool {
        self.votes == other.votes && self.current == other.current
    }
}

impl Eq for VoteFile {}

impl VoteFile {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_vote(&self, hash: &Hash) -> bool {
        self.index.contains_key(hash)
    }

    pub fn vote_count(&self) -> usize {
        self.votes.len()
    }

    pub fn votes(&self) -> &[GovernanceVote] {
        &self.votes
    }

    pub fn vote_hashes(&self) -> impl Iterator<Item = &Hash> {
        self.index.keys()
    }

    pub fn get_vote(&self, hash: &Hash) -> Option<&GovernanceVote> {
        self.index.get(hash).and_then(|i| self.votes.get(*i))
    }

    /// Bincode bytes of the stored vote with `hash`.
    pub fn serialize_for_hash(&self, hash: &Hash) -> Option<Vec<u8>> {
        self.get_vote(hash).and_then(|vote| bincode::serialize(vote).ok())
    }

    pub fn current_record(&self, masternode: &OutPoint) -> Option<&VoteRecord> {
        self.current.get(masternode)
    }

    /// Validates `vote` against the current state and stores it.
    ///
    /// Signature verification runs last. With `enforce_update_min`, a
    /// masternode may change its vote on a signal at most once per
    /// `GOVERNANCE_UPDATE_MIN` seconds of local time.
    pub fn add_or_update(
        &mut self,
        vote: &GovernanceVote,
        mn_list: &MasternodeList,
        object_type: GovernanceObjectType,
        now: i64,
        enforce_update_min: bool,
    ) -> GovernanceResult<()> {
        let vote_hash = vote.hash();
        if self.has_vote(&vote_hash) {
            return Err(GovernanceError::DuplicateVote(vote_hash));
        }

        let outpoint = &vote.masternode_outpoint;
        let masternode = mn_list
            .get_by_collateral(outpoint)
            .ok_or_else(|| GovernanceError::UnknownMasternode(outpoint.clone()))?;

        match vote.signal {
            VoteSignal::None => return Err(GovernanceError::NoneSignal),
            VoteSignal::Unsupported(n) => return Err(GovernanceError::UnsupportedSignal(n)),
            _ => {}
        }

        let previous = self
            .current
            .get(outpoint)
            .and_then(|record| record.instances.get(&vote.signal))
            .copied();

        let mut update_time = previous.map(|p| p.time).unwrap_or(0);
        if let Some(previous) = previous {
            if vote.time < previous.creation_time {
                return Err(GovernanceError::ObsoleteVote {
                    vote_time: vote.time,
                    current_time: previous.creation_time,
                });
            }
            if vote.time == previous.creation_time && vote.outcome < previous.outcome {
                return Err(GovernanceError::OutcomeNotHigher);
            }
        }
        if enforce_update_min {
            if now - update_time < GOVERNANCE_UPDATE_MIN {
                return Err(GovernanceError::VotingTooOften(outpoint.clone()));
            }
            update_time = now;
        }

        let only_voting_key = object_type == GovernanceObjectType::Proposal && vote.signal == VoteSignal::Funding;
        check_vote(vote, masternode, now, only_voting_key)?;

        self.current.entry(outpoint.clone()).or_default().instances.insert(
            vote.signal,
            VoteInstance { outcome: vote.outcome, time: update_time, creation_time: vote.time },
        );
        self.index.insert(vote_hash, self.votes.len());
        self.votes.push(vote.clone());
        Ok(())
    }

    /// Weighted count of valid masternodes whose current vote on `signal` is `outcome`.
    pub fn count_matching(&self, mn_list: &MasternodeList, signal: VoteSignal, outcome: VoteOutcome) -> u64 {
        self.current
            .iter()
            .filter(|(_, record)| {
                record
                    .instances
                    .get(&signal)
                    .map_or(false, |instance| instance.outcome == outcome)
            })
            .filter_map(|(outpoint, _)| mn_list.get_valid_by_collateral(outpoint))
            .map(MasternodeInfo::voting_weight)
            .sum()
    }

    pub fn yes_count(&self, mn_list: &MasternodeList, signal: VoteSignal) -> u64 {
        self.count_matching(mn_list, signal, VoteOutcome::Yes)
    }

    pub fn no_count(&self, mn_list: &MasternodeList, signal: VoteSignal) -> u64 {
        self.count_matching(mn_list, signal, VoteOutcome::No)
    }

    pub fn abstain_count(&self, mn_list: &MasternodeList, signal: VoteSignal) -> u64 {
        self.count_matching(mn_list, signal, VoteOutcome::Abstain)
    }

    pub fn absolute_yes_count(&self, mn_list: &MasternodeList, signal: VoteSignal) -> i64 {
        self.yes_count(mn_list, signal) as i64 - self.no_count(mn_list, signal) as i64
    }

    pub fn absolute_no_count(&self, mn_list: &MasternodeList, signal: VoteSignal) -> i64 {
        self.no_count(mn_list, signal) as i64 - self.yes_count(mn_list, signal) as i64
    }

    /// Recomputes the sentinel flags; `None` while no valid masternode exists.
    pub fn sentinel_flags(&self, mn_list: &MasternodeList, min_quorum: u64) -> Option<SentinelFlags> {
        let weighted = mn_list.valid_weighted_count();
        if weighted == 0 {
            return None;
        }
        let vote_req = min_quorum.max(weighted / 10) as i64;
        let delete_req = min_quorum.max(2 * weighted / 3) as i64;
        Some(SentinelFlags {
            funding: self.absolute_yes_count(mn_list, VoteSignal::Funding) >= vote_req,
            valid: self.absolute_no_count(mn_list, VoteSignal::Valid) < vote_req,
            delete: self.absolute_yes_count(mn_list, VoteSignal::Delete) >= delete_req,
            endorsed: self.absolute_yes_count(mn_list, VoteSignal::Endorsed) >= vote_req,
        })
    }

    /// Current votes, optionally limited to one masternode.
    pub fn current_votes(&self, filter: Option<&OutPoint>) -> Vec<GovernanceVote> {
        let mut result = Vec::new();
        for (outpoint, record) in &self.current {
            if filter.map_or(false, |f| f != outpoint) {
                continue;
            }
            for (signal, instance) in &record.instances {
                let stored = self.votes.iter().rev().find(|v| {
                    &v.masternode_outpoint == outpoint
                        && v.signal == *signal
                        && v.time == instance.creation_time
                        && v.outcome == instance.outcome
                });
                if let Some(vote) = stored {
                    result.push(vote.clone());
                }
            }
        }
        result
    }

    /// Drops every vote of `masternode`; returns the removed hashes.
    pub fn remove_votes_from_masternode(&mut self, masternode: &OutPoint) -> Vec<Hash> {
        self.current.remove(masternode);
        self.remove_votes_where(|vote| &vote.masternode_outpoint == masternode)
    }

    /// Drops votes of `masternode` whose signature no longer verifies against `mn_list`.
    pub fn remove_invalid_votes(
        &mut self,
        mn_list: &MasternodeList,
        masternode: &OutPoint,
        object_type: GovernanceObjectType,
    ) -> Vec<Hash> {
        if !self.current.contains_key(masternode) {
            return Vec::new();
        }
        let entry = mn_list.get_by_collateral(masternode);
        let invalid: Vec<GovernanceVote> = self
            .votes
            .iter()
            .filter(|vote| &vote.masternode_outpoint == masternode)
            .filter(|vote| {
                let only_voting_key =
                    object_type == GovernanceObjectType::Proposal && vote.signal == VoteSignal::Funding;
                entry.map_or(true, |mn| !has_valid_signature(vote, mn, only_voting_key))
            })
            .cloned()
            .collect();
        if invalid.is_empty() {
            return Vec::new();
        }

        if let Some(record) = self.current.get_mut(masternode) {
            for vote in &invalid {
                let matches = record
                    .instances
                    .get(&vote.signal)
                    .map_or(false, |instance| instance.creation_time == vote.time);
                if matches {
                    record.instances.remove(&vote.signal);
                }
            }
            if record.instances.is_empty() {
                self.current.remove(masternode);
            }
        }

        let invalid_hashes: Vec<Hash> = invalid.iter().map(GovernanceVote::hash).collect();
        let removed = self.remove_votes_where(|vote| invalid.contains(vote));
        debug!(
            "Removed {} invalid votes of {} ({} requested)",
            removed.len(),
            masternode.to_string_short(),
            invalid_hashes.len()
        );
        removed
    }

    /// Rebuilds the hash index, needed after deserialization.
    pub fn rebuild_index(&mut self) {
        self.index = self
            .votes
            .iter()
            .enumerate()
            .map(|(i, vote)| (vote.hash(), i))
            .collect();
    }

    fn remove_votes_where<F>(&mut self, mut predicate: F) -> Vec<Hash>
    where
        F: FnMut(&GovernanceVote) -> bool,
    {
        let mut removed = Vec::new();
        self.votes.retain(|vote| {
            if predicate(vote) {
                removed.push(vote.hash());
                false
            } else {
                true
            }
        });
        if !removed.is_empty() {
            self.rebuild_index();
        }
        removed
    }
}

fn has_valid_signature(vote: &GovernanceVote, masternode: &MasternodeInfo, only_voting_key: bool) -> bool {
    vote.verify_signature(&masternode.voting_key)
        || (!only_voting_key && vote.verify_signature(&masternode.operator_key))
}

fn check_vote(
    vote: &GovernanceVote,
    masternode: &MasternodeInfo,
    now: i64,
    only_voting_key: bool,
) -> GovernanceResult<()> {
    if vote.time > now + MAX_TIME_FUTURE_DEVIATION {
        return Err(GovernanceError::VoteTooFarInFuture(vote.time));
    }
    if !has_valid_signature(vote, masternode, only_voting_key) {
        return Err(GovernanceError::InvalidVoteSignature(vote.masternode_outpoint.clone()));
    }
    Ok(())
}
