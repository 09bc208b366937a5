//! Governance network messages and serialization

use serde::{Deserialize, Serialize};

use rusty_shared_types::{GovernanceObject, GovernanceVote, Hash};

use crate::error::{GovernanceError, GovernanceResult};

/// Maximum size of an encoded governance message in bytes
pub const MAX_GOVERNANCE_MESSAGE_SIZE: usize = 1024 * 1024;

/// Largest bloom filter accepted in a sync request, in bytes
pub const MAX_BLOOM_FILTER_SIZE: usize = 36_000;
/// Most hash functions a bloom filter may use
pub const MAX_HASH_FUNCS: u32 = 50;
/// False positive rate used for vote filters
pub const BLOOM_FP_RATE: f64 = 0.001;

const LN2: f64 = std::f64::consts::LN_2;
const LN2_SQUARED: f64 = LN2 * LN2;

/// Kind of item announced by hash
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InventoryKind {
    Object,
    Vote,
}

/// Hash announcement of a governance object or vote
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Inventory {
    pub kind: InventoryKind,
    pub hash: Hash,
}

impl Inventory {
    pub fn object(hash: Hash) -> Self {
        Inventory { kind: InventoryKind::Object, hash }
    }

    pub fn vote(hash: Hash) -> Self {
        Inventory { kind: InventoryKind::Vote, hash }
    }
}

/// Item counted in a sync status message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncItem {
    Objects,
    Votes,
}

/// Governance protocol messages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GovernanceMessage {
    /// Request for all objects (zero hash) or for the votes of one object
    SyncRequest { object_hash: Hash, filter: BloomFilter },
    /// A governance object
    Object(GovernanceObject),
    /// A masternode vote
    Vote(GovernanceVote),
}

impl GovernanceMessage {
    /// Get the command string for this message type
    pub fn command(&self) -> &'static str {
        match self {
            GovernanceMessage::SyncRequest { .. } => "govsync",
            GovernanceMessage::Object(_) => "govobj",
            GovernanceMessage::Vote(_) => "govobjvote",
        }
    }

    pub fn encode(&self) -> GovernanceResult<Vec<u8>> {
        let bytes = bincode::serialize(self)?;
        if bytes.len() > MAX_GOVERNANCE_MESSAGE_SIZE {
            return Err(GovernanceError::Serialization(format!(
                "message of {} bytes exceeds limit",
                bytes.len()
            )));
        }
        Ok(bytes)
    }

    pub fn decode(bytes: &[u8]) -> GovernanceResult<Self> {
        if bytes.len() > MAX_GOVERNANCE_MESSAGE_SIZE {
            return Err(GovernanceError::Serialization(format!(
                "message of {} bytes exceeds limit",
                bytes.len()
            )));
        }
        Ok(bincode::deserialize(bytes)?)
    }
}

/// Probabilistic set of hashes a peer already has.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BloomFilter {
    data: Vec<u8>,
    hash_funcs: u32,
    tweak: u32,
}

impl BloomFilter {
    /// Sizes a filter for `elements` entries at false positive rate `fp_rate`.
    pub fn new(elements: u32, fp_rate: f64, tweak: u32) -> Self {
        let elements = elements.max(1) as f64;
        let bits = (-1.0 / LN2_SQUARED * elements * fp_rate.ln()).min((MAX_BLOOM_FILTER_SIZE * 8) as f64);
        let bytes = ((bits / 8.0) as usize).max(1);
        let hash_funcs = ((bytes * 8) as f64 / elements * LN2).min(MAX_HASH_FUNCS as f64) as u32;
        BloomFilter {
            data: vec![0u8; bytes],
            hash_funcs: hash_funcs.max(1),
            tweak,
        }
    }

    /// Filter that matches nothing.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Filter parameters are within protocol limits.
    pub fn is_within_size_constraints(&self) -> bool {
        self.data.len() <= MAX_BLOOM_FILTER_SIZE && self.hash_funcs <= MAX_HASH_FUNCS
    }

    pub fn insert(&mut self, item: &[u8]) {
        if self.data.is_empty() {
            return;
        }
        for n in 0..self.hash_funcs {
            let bit = self.bit_index(n, item);
            self.data[bit >> 3] |= 1 << (bit & 7);
        }
    }

    pub fn contains(&self, item: &[u8]) -> bool {
        if self.data.is_empty() {
            return false;
        }
        (0..self.hash_funcs).all(|n| {
            let bit = self.bit_index(n, item);
            self.data[bit >> 3] & (1 << (bit & 7)) != 0
        })
    }

    fn bit_index(&self, n: u32, item: &[u8]) -> usize {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&n.wrapping_mul(0xFBA4_C795).wrapping_add(self.tweak).to_le_bytes());
        hasher.update(item);
        let digest = hasher.finalize();
        let mut word = [0u8; 4];
        word.copy_from_slice(&digest.as_bytes()[..4]);
        u32::from_le_bytes(word) as usize % (self.data.len() * 8)
    }
}

/// Deterministic filter tweak derived from the object hash.
pub fn filter_tweak(object_hash: &Hash) -> u32 {
    u32::from_le_bytes([object_hash[0], object_hash[1], object_hash[2], object_hash[3]])
}
