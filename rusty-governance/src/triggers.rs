//! Superblock triggers.
//!
//! A trigger object schedules the payments of one superblock. Several
//! masternodes may submit competing triggers for the same height; the one
//! with the highest net funding vote wins, ties going to the greater hash.

use log::{debug, info, warn};
use std::collections::BTreeMap;

use rusty_shared_types::{
    CoinbaseTransaction, GovernanceObjectType, Hash, MasternodeList, Network, TxOutput, VoteSignal,
};

use crate::error::{GovernanceError, GovernanceResult};
use crate::payload::{GovernancePayment, ObjectPayload};
use crate::store::{GovernanceStore, StoredObject};

/// Trigger kept this many blocks past its height when neither valid nor executed.
const EXPIRATION_BLOCKS_DEFAULT: u64 = 24;
/// Upper bound of the grace period of a valid, not yet executed trigger.
const EXPIRATION_BLOCKS_VALID_MAX: u64 = 576;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeenObjectStatus {
    Valid,
    ErrorInvalid,
    Executed,
    Unknown,
}

/// Typed view of a registered trigger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Superblock {
    pub governance_object_hash: Hash,
    pub event_block_height: u64,
    pub payments: Vec<GovernancePayment>,
    pub status: SeenObjectStatus,
}

impl Superblock {
    pub fn from_object(hash: Hash, stored: &StoredObject) -> GovernanceResult<Self> {
        if stored.object_type() != GovernanceObjectType::Trigger {
            return Err(GovernanceError::InvalidTrigger(format!(
                "object {} is not a trigger",
                hex::encode(hash)
            )));
        }
        let data = match &stored.payload {
            Some(ObjectPayload::Trigger(data)) => data.clone(),
            _ => {
                return Err(GovernanceError::InvalidTrigger(format!(
                    "object {} has no parseable payment schedule",
                    hex::encode(hash)
                )))
            }
        };
        Ok(Superblock {
            governance_object_hash: hash,
            event_block_height: data.event_block_height,
            payments: data.payments,
            status: SeenObjectStatus::Valid,
        })
    }

    pub fn payments_total(&self) -> u64 {
        self.payments
            .iter()
            .fold(0u64, |acc, payment| acc.saturating_add(payment.amount))
    }

    /// Payments as P2PKH outputs, in schedule order.
    pub fn outputs(&self) -> Vec<TxOutput> {
        self.payments
            .iter()
            .map(|payment| TxOutput::p2pkh(payment.amount, &payment.pubkey_hash))
            .collect()
    }

    /// Whether the trigger has outlived its grace period at `cached_height`.
    pub fn is_expired(&self, cached_height: u64, cycle: u64, network: Network) -> bool {
        let grace = match self.status {
            SeenObjectStatus::Executed => cycle,
            SeenObjectStatus::Valid => cycle.min(EXPIRATION_BLOCKS_VALID_MAX),
            _ => EXPIRATION_BLOCKS_DEFAULT,
        };
        if cached_height > self.event_block_height.saturating_add(grace) {
            return true;
        }
        // Reorgs on test networks can leave triggers far ahead of the tip.
        network != Network::Mainnet && cached_height.saturating_add(2 * cycle) < self.event_block_height
    }

    /// Checks the coinbase of a superblock against this schedule.
    pub fn is_valid_coinbase(&self, coinbase: &CoinbaseTransaction, block_reward: u64, budget: u64) -> bool {
        let outputs = &coinbase.outputs;
        if outputs.len() < self.payments.len() {
            warn!(
                "superblock {}: {} outputs cannot hold {} payments",
                hex::encode(self.governance_object_hash),
                outputs.len(),
                self.payments.len()
            );
            return false;
        }
        let total = self.payments_total();
        if total > budget {
            warn!(
                "superblock {}: payments {} exceed budget {}",
                hex::encode(self.governance_object_hash),
                total,
                budget
            );
            return false;
        }
        let value_out = coinbase.value_out();
        if value_out > block_reward.saturating_add(total) {
            warn!(
                "superblock {}: block value {} exceeds reward {} plus payments {}",
                hex::encode(self.governance_object_hash),
                value_out,
                block_reward,
                total
            );
            return false;
        }

        let mut start = 0;
        for expected in self.outputs() {
            match (start..outputs.len()).find(|j| outputs[*j] == expected) {
                Some(j) => start = j,
                None => {
                    warn!(
                        "superblock {}: missing payment of {} to {}",
                        hex::encode(self.governance_object_hash),
                        expected.value,
                        hex::encode(&expected.script_pubkey)
                    );
                    return false;
                }
            }
        }
        true
    }
}

/// Registered triggers by object hash.
#[derive(Debug, Default)]
pub struct TriggerIndex {
    pub(crate) map: BTreeMap<Hash, Superblock>,
}

impl TriggerIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, hash: &Hash) -> Option<&Superblock> {
        self.map.get(hash)
    }

    pub fn contains(&self, hash: &Hash) -> bool {
        self.map.contains_key(hash)
    }

    pub fn remove(&mut self, hash: &Hash) -> Option<Superblock> {
        self.map.remove(hash)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn clear(&mut self) {
        self.map.clear();
    }
}

impl GovernanceStore {
    /// Registers the trigger object `hash`.
    ///
    /// Returns false when it is already registered, cannot be parsed, or is
    /// already expired at the cached height. The caller marks such objects
    /// for deletion.
    pub fn try_register_trigger(&mut self, hash: &Hash) -> bool {
        if self.triggers.contains(hash) {
            debug!("trigger {} already registered", hex::encode(hash));
            return false;
        }
        let Some(stored) = self.objects.get(hash) else {
            return false;
        };
        let superblock = match Superblock::from_object(*hash, stored) {
            Ok(superblock) => superblock,
            Err(err) => {
                warn!("failed to register trigger: {}", err);
                return false;
            }
        };
        let expired = superblock.is_expired(self.cached_height, self.params.superblock_cycle, self.params.network);
        debug!(
            "registered trigger {} for height {}",
            hex::encode(hash),
            superblock.event_block_height
        );
        self.triggers.map.insert(*hash, superblock);
        !expired
    }

    /// Drops invalid and expired triggers, flagging their objects for deletion.
    pub fn sweep_triggers(&mut self, now: i64) {
        let cached_height = self.cached_height;
        let cycle = self.params.superblock_cycle;
        let network = self.params.network;
        let objects = &mut self.objects;

        self.triggers.map.retain(|hash, superblock| {
            let Some(stored) = objects.get_mut(hash) else {
                debug!("removing trigger {} without object", hex::encode(hash));
                return false;
            };
            if stored.object_type() != GovernanceObjectType::Trigger {
                stored.prepare_deletion(now);
                return false;
            }
            match superblock.status {
                SeenObjectStatus::ErrorInvalid | SeenObjectStatus::Unknown => {
                    debug!("removing invalid trigger {}", hex::encode(hash));
                    stored.prepare_deletion(now);
                    false
                }
                SeenObjectStatus::Valid | SeenObjectStatus::Executed => {
                    if !superblock.is_expired(cached_height, cycle, network) {
                        return true;
                    }
                    info!(
                        "trigger {} for height {} expired at height {}",
                        hex::encode(hash),
                        superblock.event_block_height,
                        cached_height
                    );
                    stored.flags.expired = true;
                    stored.prepare_deletion(now);
                    false
                }
            }
        });
    }

    /// Winning trigger for `height`, if any has positive net funding votes.
    pub fn best_superblock(&self, height: u64, mn_list: &MasternodeList) -> Option<&Superblock> {
        if !self.params.is_valid_superblock_height(height) {
            return None;
        }
        let mut best: Option<(i64, &Superblock)> = None;
        for (hash, superblock) in &self.triggers.map {
            if superblock.event_block_height != height {
                continue;
            }
            if !matches!(superblock.status, SeenObjectStatus::Valid | SeenObjectStatus::Executed) {
                continue;
            }
            let Some(stored) = self.objects.get(hash) else {
                continue;
            };
            let yes = stored.votes.absolute_yes_count(mn_list, VoteSignal::Funding);
            if yes <= 0 {
                continue;
            }
            let better = match best {
                None => true,
                Some((best_yes, best_sb)) => {
                    yes > best_yes || (yes == best_yes && *hash > best_sb.governance_object_hash)
                }
            };
            if better {
                best = Some((yes, superblock));
            }
        }
        best.map(|(_, superblock)| superblock)
    }

    /// True if some trigger for `height` has reached the funding threshold.
    pub fn is_superblock_triggered(&mut self, height: u64, mn_list: &MasternodeList, now: i64) -> bool {
        if !self.params.is_valid_superblock_height(height) {
            return false;
        }
        let min_quorum = self.params.governance_min_quorum;
        let mut triggered = false;
        for (hash, superblock) in &self.triggers.map {
            if superblock.event_block_height != height {
                continue;
            }
            let Some(stored) = self.objects.get_mut(hash) else {
                continue;
            };
            stored.update_sentinel_variables(mn_list, min_quorum, now);
            if stored.flags.cached_funding {
                debug!("superblock triggered at height {} by {}", height, hex::encode(hash));
                triggered = true;
            }
        }
        triggered
    }

    pub fn superblock_payments(&self, height: u64, mn_list: &MasternodeList) -> Option<Vec<TxOutput>> {
        self.best_superblock(height, mn_list).map(Superblock::outputs)
    }

    /// Validates a superblock coinbase against the winning trigger.
    pub fn is_valid_superblock(
        &self,
        coinbase: &CoinbaseTransaction,
        height: u64,
        block_reward: u64,
        budget: u64,
        mn_list: &MasternodeList,
    ) -> bool {
        match self.best_superblock(height, mn_list) {
            Some(superblock) => superblock.is_valid_coinbase(coinbase, block_reward, budget),
            None => false,
        }
    }

    /// Marks the winning trigger of `height` as executed.
    pub fn execute_best_superblock(&mut self, height: u64, mn_list: &MasternodeList) -> Option<Hash> {
        let hash = self.best_superblock(height, mn_list)?.governance_object_hash;
        let superblock = self.triggers.map.get_mut(&hash)?;
        if superblock.status != SeenObjectStatus::Executed {
            info!("executing superblock {} at height {}", hex::encode(hash), height);
            superblock.status = SeenObjectStatus::Executed;
        }
        Some(hash)
    }

    pub fn active_triggers(&self) -> Vec<Superblock> {
        self.triggers.map.values().cloned().collect()
    }

    pub fn trigger_index(&self) -> &TriggerIndex {
        &self.triggers
    }
}
