//! On-disk snapshot of the governance store.
//!
//! The file is a single bincode blob: the version tag followed by the
//! snapshot. Derived state (vote index, per-masternode vote lookup, trigger
//! index) is not written; it is rebuilt on load.

use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use rusty_shared_types::{GovernanceObject, GovernanceObjectType, GovernanceParams, GovernanceVote, Hash, MasternodeList};

use crate::config::GovernanceConfig;
use crate::error::{StoreError, StoreResult};
use crate::rate_check::RateLimiter;
use crate::store::{GovernanceStore, StoredObject};

pub const STORE_VERSION: &str = "GovernanceStore-Version-1";

#[derive(Serialize, Deserialize)]
struct StoreSnapshot {
    objects: BTreeMap<Hash, StoredObject>,
    postponed: BTreeMap<Hash, GovernanceObject>,
    erased: HashMap<Hash, i64>,
    /// Least recently used first.
    invalid_votes: Vec<(Hash, GovernanceVote)>,
    /// Least recently used first.
    orphan_votes: Vec<(Hash, GovernanceVote, i64)>,
    rate_limiter: RateLimiter,
    last_mn_list: Option<MasternodeList>,
}

impl GovernanceStore {
    pub fn to_bytes(&self) -> StoreResult<Vec<u8>> {
        let snapshot = StoreSnapshot {
            objects: self.objects.clone(),
            postponed: self.postponed.clone(),
            erased: self.erased.clone(),
            invalid_votes: self
                .invalid_votes
                .iter()
                .rev()
                .map(|(hash, vote)| (*hash, vote.clone()))
                .collect(),
            orphan_votes: self
                .orphan_votes
                .iter()
                .rev()
                .map(|(hash, (vote, expiry))| (*hash, vote.clone(), *expiry))
                .collect(),
            rate_limiter: self.rate_limiter.clone(),
            last_mn_list: self.last_mn_list.clone(),
        };
        let mut bytes = bincode::serialize(STORE_VERSION)?;
        bytes.extend(bincode::serialize(&snapshot)?);
        Ok(bytes)
    }

    /// Decodes a snapshot. Call [`GovernanceStore::init_after_load`] before use.
    pub fn from_bytes(bytes: &[u8], params: GovernanceParams, config: GovernanceConfig) -> StoreResult<Self> {
        let mut reader = bytes;
        let version: String = bincode::deserialize_from(&mut reader)?;
        if version != STORE_VERSION {
            return Err(StoreError::VersionMismatch {
                expected: STORE_VERSION.to_string(),
                found: version,
            });
        }
        let snapshot: StoreSnapshot = bincode::deserialize_from(&mut reader)?;

        let mut store = GovernanceStore::new(params, config);
        store.objects = snapshot.objects;
        store.postponed = snapshot.postponed;
        store.erased = snapshot.erased;
        for (hash, vote) in snapshot.invalid_votes {
            store.invalid_votes.put(hash, vote);
        }
        for (hash, vote, expiry) in snapshot.orphan_votes {
            store.orphan_votes.put(hash, (vote, expiry));
        }
        store.rate_limiter = snapshot.rate_limiter;
        store.last_mn_list = snapshot.last_mn_list;
        store.rebuild_indexes();
        Ok(store)
    }

    pub fn save_to_file(&self, path: &Path) -> StoreResult<()> {
        let bytes = self.to_bytes()?;
        std::fs::write(path, bytes)?;
        info!("Saved governance store to {}: {}", path.display(), self);
        Ok(())
    }

    pub fn load_from_file(path: &Path, params: GovernanceParams, config: GovernanceConfig) -> StoreResult<Self> {
        let bytes = std::fs::read(path)?;
        Self::from_bytes(&bytes, params, config)
    }

    /// Re-registers triggers and runs a sweep after loading a snapshot.
    pub fn init_after_load(&mut self, mn_list: &MasternodeList, now: i64) {
        self.triggers.clear();
        let trigger_hashes: Vec<Hash> = self
            .objects
            .iter()
            .filter(|(_, stored)| stored.object_type() == GovernanceObjectType::Trigger)
            .map(|(hash, _)| *hash)
            .collect();
        for hash in trigger_hashes {
            if !self.try_register_trigger(&hash) {
                warn!("cached trigger {} could not be registered", hex::encode(hash));
                if let Some(stored) = self.find_mut(&hash) {
                    stored.prepare_deletion(now);
                }
            }
        }
        self.update_all_sentinel_variables(mn_list, now);
        self.sweep(mn_list, now);
    }
}
