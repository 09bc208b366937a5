use serde::{Deserialize, Serialize};
use std::fmt;

pub type PublicKey = [u8; 32];
pub type Hash = [u8; 32];
pub type PubKeyHash = [u8; 20];

/// The all-zero hash, used on the wire to mean "no specific object".
pub const ZERO_HASH: Hash = [0u8; 32];

/// Number of base units in one coin.
pub const COIN: u64 = 100_000_000;

pub mod governance;
pub mod masternode;
pub mod params;

pub use governance::{GovernanceObject, GovernanceObjectType, GovernanceVote, VoteOutcome, VoteSignal};
pub use masternode::{MasternodeInfo, MasternodeList, MasternodeListDiff, MasternodeType};
pub use params::{GovernanceParams, Network};

/// Represents a reference to a specific transaction output.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OutPoint {
    /// The transaction ID (hash) of the transaction containing the output.
    pub txid: [u8; 32],
    /// The index of the output within that transaction.
    pub vout: u32,
}

impl OutPoint {
    pub fn new(txid: [u8; 32], vout: u32) -> Self {
        OutPoint { txid, vout }
    }

    pub fn null() -> Self {
        OutPoint { txid: ZERO_HASH, vout: u32::MAX }
    }

    pub fn is_null(&self) -> bool {
        self.txid == ZERO_HASH && self.vout == u32::MAX
    }

    /// Short human readable form used in log lines.
    pub fn to_string_short(&self) -> String {
        format!("{}-{}", hex::encode(&self.txid[..8]), self.vout)
    }
}

impl fmt::Display for OutPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", hex::encode(self.txid), self.vout)
    }
}

/// Coinbase input; carries arbitrary data instead of spending an output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxInput {
    pub previous_output: OutPoint,
    pub script_sig: Vec<u8>,
    pub sequence: u32,
}

/// Output of a coinbase; superblock payments are P2PKH outputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxOutput {
    /// Amount in base units.
    pub value: u64,
    pub script_pubkey: Vec<u8>,
}

impl TxOutput {
    pub fn new(value: u64, script_pubkey: Vec<u8>) -> Self {
        TxOutput { value, script_pubkey }
    }

    /// Builds a pay-to-pubkey-hash output.
    pub fn p2pkh(value: u64, pubkey_hash: &PubKeyHash) -> Self {
        TxOutput { value, script_pubkey: p2pkh_script(pubkey_hash) }
    }
}

/// Returns the standard P2PKH locking script for `pubkey_hash`.
pub fn p2pkh_script(pubkey_hash: &PubKeyHash) -> Vec<u8> {
    let mut script = Vec::with_capacity(25);
    script.extend_from_slice(&[0x76, 0xA9, 0x14]);
    script.extend_from_slice(pubkey_hash);
    script.extend_from_slice(&[0x88, 0xAC]);
    script
}

/// Represents a coinbase transaction, which creates new coins and carries superblock payments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoinbaseTransaction {
    pub version: u32,
    pub inputs: Vec<TxInput>,
    pub outputs: Vec<TxOutput>,
    pub lock_time: u32,
}

impl CoinbaseTransaction {
    /// Sum of all output values, saturating on overflow.
    pub fn value_out(&self) -> u64 {
        self.outputs
            .iter()
            .fold(0u64, |acc, out| acc.saturating_add(out.value))
    }
}
