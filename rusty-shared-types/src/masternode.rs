use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::{Hash, OutPoint, PublicKey};

/// Kind of masternode; determines its voting weight.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum MasternodeType {
    Regular,
    /// High performance node carrying four votes.
    Evo,
}

impl MasternodeType {
    pub fn voting_weight(&self) -> u64 {
        match self {
            MasternodeType::Regular => 1,
            MasternodeType::Evo => 4,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum MasternodeStatus {
    Active,
    PoseBanned,
}

/// One entry of the deterministic masternode list.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct MasternodeInfo {
    /// Hash of the registration transaction.
    pub pro_tx_hash: Hash,
    /// Collateral UTXO; the masternode's identity in governance.
    pub collateral_outpoint: OutPoint,
    /// Key allowed to cast funding votes.
    pub voting_key: PublicKey,
    /// Key used by the running node; signs triggers and non-funding votes.
    pub operator_key: PublicKey,
    pub mn_type: MasternodeType,
    pub status: MasternodeStatus,
}

impl MasternodeInfo {
    pub fn is_valid(&self) -> bool {
        self.status == MasternodeStatus::Active
    }

    pub fn voting_weight(&self) -> u64 {
        self.mn_type.voting_weight()
    }
}

/// Masternodes whose governance votes must be dropped after a list change.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MasternodeListDiff {
    /// Entries still present but with a different voting or operator key.
    pub updated: Vec<OutPoint>,
    /// Entries no longer in the list.
    pub removed: Vec<OutPoint>,
}

impl MasternodeListDiff {
    pub fn is_empty(&self) -> bool {
        self.updated.is_empty() && self.removed.is_empty()
    }

    pub fn affected(&self) -> impl Iterator<Item = &OutPoint> {
        self.updated.iter().chain(self.removed.iter())
    }
}

/// Immutable snapshot of the masternode list at a given height.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct MasternodeList {
    pub height: u64,
    pub block_hash: Hash,
    map: BTreeMap<OutPoint, MasternodeInfo>,
}

impl MasternodeList {
    pub fn new(height: u64, block_hash: Hash) -> Self {
        MasternodeList { height, block_hash, map: BTreeMap::new() }
    }

    pub fn add_masternode(&mut self, info: MasternodeInfo) {
        self.map.insert(info.collateral_outpoint.clone(), info);
    }

    pub fn remove_masternode(&mut self, outpoint: &OutPoint) -> Option<MasternodeInfo> {
        self.map.remove(outpoint)
    }

    pub fn get_by_collateral(&self, outpoint: &OutPoint) -> Option<&MasternodeInfo> {
        self.map.get(outpoint)
    }

    pub fn get_valid_by_collateral(&self, outpoint: &OutPoint) -> Option<&MasternodeInfo> {
        self.map.get(outpoint).filter(|mn| mn.is_valid())
    }

    pub fn iter(&self) -> impl Iterator<Item = &MasternodeInfo> {
        self.map.values()
    }

    pub fn iter_valid(&self) -> impl Iterator<Item = &MasternodeInfo> {
        self.map.values().filter(|mn| mn.is_valid())
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn valid_count(&self) -> usize {
        self.iter_valid().count()
    }

    /// Sum of voting weights of all valid masternodes.
    pub fn valid_weighted_count(&self) -> u64 {
        self.iter_valid().map(|mn| mn.voting_weight()).sum()
    }

    /// Lists masternodes of `self` whose keys changed or which are gone in `newer`.
    pub fn build_diff(&self, newer: &MasternodeList) -> MasternodeListDiff {
        let mut diff = MasternodeListDiff::default();
        for (outpoint, old) in &self.map {
            match newer.map.get(outpoint) {
                None => diff.removed.push(outpoint.clone()),
                Some(new) => {
                    if new.voting_key != old.voting_key || new.operator_key != old.operator_key {
                        diff.updated.push(outpoint.clone());
                    }
                }
            }
        }
        diff
    }
}
