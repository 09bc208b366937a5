//! Governance objects and masternode votes as they travel on the wire.

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};

use crate::{Hash, OutPoint, PublicKey, ZERO_HASH};

/// Enumerates the kinds of governance objects.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum GovernanceObjectType {
    /// A budget proposal asking for a payment out of superblocks.
    Proposal,
    /// A superblock trigger listing the payments for one superblock height.
    Trigger,
    /// Any other type; stored and relayed but never valid locally.
    Other(u8),
}

impl GovernanceObjectType {
    /// Numeric type as used in payload JSON (`"type": 1`).
    pub fn as_u8(&self) -> u8 {
        match self {
            GovernanceObjectType::Proposal => 1,
            GovernanceObjectType::Trigger => 2,
            GovernanceObjectType::Other(n) => *n,
        }
    }
}

/// A governance object: proposal, trigger or unknown.
///
/// The identity of an object is [`GovernanceObject::hash`], computed over
/// every field including the signature.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GovernanceObject {
    /// Parent object, zero for top level objects.
    pub parent_hash: Hash,
    pub revision: u32,
    /// Unix time the object was created by its author.
    pub creation_time: i64,
    /// Transaction that burned the proposal fee, zero for triggers.
    pub collateral_hash: Hash,
    /// Raw JSON payload bytes. Displayed and relayed as hex.
    pub data: Vec<u8>,
    pub object_type: GovernanceObjectType,
    /// Collateral of the masternode that signed a trigger; null for proposals.
    pub masternode_outpoint: OutPoint,
    /// Operator signature over [`GovernanceObject::signature_hash`].
    pub signature: Vec<u8>,
}

impl GovernanceObject {
    pub fn new(
        parent_hash: Hash,
        revision: u32,
        creation_time: i64,
        collateral_hash: Hash,
        data: Vec<u8>,
        object_type: GovernanceObjectType,
    ) -> Self {
        GovernanceObject {
            parent_hash,
            revision,
            creation_time,
            collateral_hash,
            data,
            object_type,
            masternode_outpoint: OutPoint::null(),
            signature: Vec::new(),
        }
    }

    /// Builds an object from a hex encoded payload string.
    pub fn from_hex_data(
        parent_hash: Hash,
        revision: u32,
        creation_time: i64,
        collateral_hash: Hash,
        hex_data: &str,
        object_type: GovernanceObjectType,
    ) -> Result<Self, hex::FromHexError> {
        let data = hex::decode(hex_data)?;
        Ok(Self::new(parent_hash, revision, creation_time, collateral_hash, data, object_type))
    }

    /// Calculate the hash of the object, signature included.
    pub fn hash(&self) -> Hash {
        match bincode::serialize(self) {
            Ok(bytes) => blake3::hash(&bytes).into(),
            Err(_) => ZERO_HASH,
        }
    }

    /// Hash of the signed content: every field except the signature.
    pub fn signature_hash(&self) -> Hash {
        let content = (
            &self.parent_hash,
            self.revision,
            self.creation_time,
            &self.collateral_hash,
            &self.data,
            &self.object_type,
            &self.masternode_outpoint,
        );
        match bincode::serialize(&content) {
            Ok(bytes) => blake3::hash(&bytes).into(),
            Err(_) => ZERO_HASH,
        }
    }

    /// Hash of the payload alone, used to find duplicate submissions.
    pub fn data_hash(&self) -> Hash {
        blake3::hash(&self.data).into()
    }

    pub fn data_as_hex(&self) -> String {
        hex::encode(&self.data)
    }

    pub fn data_as_plain_string(&self) -> String {
        String::from_utf8_lossy(&self.data).into_owned()
    }

    /// Signs the object on behalf of the masternode at `outpoint`.
    pub fn sign(&mut self, outpoint: OutPoint, operator_key: &SigningKey) {
        self.masternode_outpoint = outpoint;
        let digest = self.signature_hash();
        self.signature = operator_key.sign(&digest).to_bytes().to_vec();
    }

    pub fn verify_signature(&self, public_key: &PublicKey) -> bool {
        verify_digest(public_key, &self.signature_hash(), &self.signature)
    }
}

/// Signals a masternode can vote on.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum VoteSignal {
    None,
    /// Should the proposal be paid.
    Funding,
    /// Is the object well formed and acceptable.
    Valid,
    /// Should the object be removed.
    Delete,
    /// Is the proposal endorsed by the network.
    Endorsed,
    /// A signal this node does not know; such votes are rejected.
    Unsupported(u8),
}

impl VoteSignal {
    pub const ALL: [VoteSignal; 4] = [
        VoteSignal::Funding,
        VoteSignal::Valid,
        VoteSignal::Delete,
        VoteSignal::Endorsed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            VoteSignal::None => "none",
            VoteSignal::Funding => "funding",
            VoteSignal::Valid => "valid",
            VoteSignal::Delete => "delete",
            VoteSignal::Endorsed => "endorsed",
            VoteSignal::Unsupported(_) => "unsupported",
        }
    }
}

/// Vote outcomes; the order matters when two votes share a timestamp.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum VoteOutcome {
    None,
    Yes,
    No,
    Abstain,
}

impl VoteOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            VoteOutcome::None => "none",
            VoteOutcome::Yes => "yes",
            VoteOutcome::No => "no",
            VoteOutcome::Abstain => "abstain",
        }
    }
}

/// A masternode vote on a governance object.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GovernanceVote {
    /// Collateral of the voting masternode.
    pub masternode_outpoint: OutPoint,
    /// The object being voted on.
    pub parent_hash: Hash,
    pub signal: VoteSignal,
    pub outcome: VoteOutcome,
    /// Unix time the vote was cast.
    pub time: i64,
    /// Signature by the voting or operator key over [`GovernanceVote::hash`].
    pub signature: Vec<u8>,
}

impl GovernanceVote {
    pub fn new(
        masternode_outpoint: OutPoint,
        parent_hash: Hash,
        signal: VoteSignal,
        outcome: VoteOutcome,
        time: i64,
    ) -> Self {
        GovernanceVote {
            masternode_outpoint,
            parent_hash,
            signal,
            outcome,
            time,
            signature: Vec::new(),
        }
    }

    /// Hash of the vote; covers every field except the signature.
    pub fn hash(&self) -> Hash {
        let content = (
            &self.masternode_outpoint,
            &self.parent_hash,
            &self.signal,
            &self.outcome,
            self.time,
        );
        match bincode::serialize(&content) {
            Ok(bytes) => blake3::hash(&bytes).into(),
            Err(_) => ZERO_HASH,
        }
    }

    pub fn sign(&mut self, key: &SigningKey) {
        let digest = self.hash();
        self.signature = key.sign(&digest).to_bytes().to_vec();
    }

    pub fn verify_signature(&self, public_key: &PublicKey) -> bool {
        verify_digest(public_key, &self.hash(), &self.signature)
    }
}

fn verify_digest(public_key: &PublicKey, digest: &Hash, signature: &[u8]) -> bool {
    let Ok(verifying_key) = VerifyingKey::from_bytes(public_key) else {
        return false;
    };
    let Ok(signature) = Signature::from_slice(signature) else {
        return false;
    };
    verifying_key.verify(digest, &signature).is_ok()
}
