//! Chain parameters relevant to governance.

use serde::{Deserialize, Serialize};

use crate::COIN;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Network {
    Mainnet,
    Testnet,
    Regtest,
}

/// Governance related consensus parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GovernanceParams {
    /// Network type (mainnet, testnet, etc.)
    pub network: Network,
    /// First block height at which superblocks may occur
    pub superblock_start_block: u64,
    /// Number of blocks between two superblocks
    pub superblock_cycle: u64,
    /// Target block spacing in seconds
    pub pow_target_spacing: u64,
    /// Minimum absolute yes weight for funding and deletion
    pub governance_min_quorum: u64,
    /// Expected number of votes per object; sizes sync bloom filters
    pub governance_filter_elements: u32,
    /// Confirmations required on proposal collateral
    pub governance_fee_confirmations: u32,
    /// Fee burned by a proposal collateral transaction
    pub proposal_fee: u64,
    /// Chains whose clocks may be set by tests relay faster
    pub mockable_chain: bool,
}

impl Default for GovernanceParams {
    fn default() -> Self {
        Self::mainnet()
    }
}

impl GovernanceParams {
    pub fn mainnet() -> Self {
        Self {
            network: Network::Mainnet,
            superblock_start_block: 614_820,
            superblock_cycle: 16_616,
            pow_target_spacing: 150,
            governance_min_quorum: 10,
            governance_filter_elements: 20_000,
            governance_fee_confirmations: 6,
            proposal_fee: COIN,
            mockable_chain: false,
        }
    }

    pub fn testnet() -> Self {
        Self {
            network: Network::Testnet,
            superblock_start_block: 4_200,
            superblock_cycle: 24,
            pow_target_spacing: 150,
            governance_min_quorum: 1,
            governance_filter_elements: 500,
            governance_fee_confirmations: 6,
            proposal_fee: COIN,
            mockable_chain: false,
        }
    }

    /// Regtest configuration - short cycles so superblocks can be mined locally
    pub fn regtest() -> Self {
        Self {
            network: Network::Regtest,
            superblock_start_block: 1_500,
            superblock_cycle: 10,
            pow_target_spacing: 150,
            governance_min_quorum: 1,
            governance_filter_elements: 100,
            governance_fee_confirmations: 1,
            proposal_fee: COIN,
            mockable_chain: true,
        }
    }

    /// Length of one superblock cycle in seconds.
    pub fn superblock_cycle_seconds(&self) -> i64 {
        (self.superblock_cycle * self.pow_target_spacing) as i64
    }

    /// Superblocks happen on cycle boundaries at or after the start block.
    pub fn is_valid_superblock_height(&self, height: u64) -> bool {
        self.superblock_cycle > 0
            && height >= self.superblock_start_block
            && height % self.superblock_cycle == 0
    }
}
