//! Runtime configuration for the governance subsystem.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use rusty_shared_types::GovernanceParams;

/// Time an object flagged for deletion stays in memory before it is erased.
pub const GOVERNANCE_DELETION_DELAY: i64 = 10 * 60;
/// Lifetime of a vote waiting for its parent object.
pub const GOVERNANCE_ORPHAN_EXPIRATION_TIME: i64 = 10 * 60;
/// Objects and votes may be dated at most this far into the future.
pub const MAX_TIME_FUTURE_DEVIATION: i64 = 60 * 60;
/// Time we expect an item to reach the whole network.
pub const RELIABLE_PROPAGATION_TIME: i64 = 60;
/// Minimum spacing between two vote updates of one masternode and signal.
pub const GOVERNANCE_UPDATE_MIN: i64 = 60 * 60;

/// Configuration for the governance manager
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GovernanceConfig {
    /// Seconds between two maintenance passes
    pub maintenance_interval_secs: u64,
    /// Seconds between two relay queue flushes
    pub relay_interval_secs: u64,
    /// Seconds a flagged object survives before erasure
    pub deletion_delay_secs: i64,
    /// Seconds an orphan vote is kept
    pub orphan_expiration_secs: i64,
    /// Capacity of the invalid-vote and vote-index caches
    pub max_cache_size: usize,
    /// Capacity of the orphan vote buffer
    pub max_orphan_votes: usize,
    /// Peers asked for the votes of one object during a sync round
    pub peers_per_hash: usize,
    /// Seconds before the same peer is asked again for the same object
    pub asked_recently_secs: i64,
    /// Enforce the minimum spacing between vote updates
    pub enforce_vote_update_min: bool,
}

impl Default for GovernanceConfig {
    fn default() -> Self {
        Self {
            maintenance_interval_secs: 5 * 60,
            relay_interval_secs: 5,
            deletion_delay_secs: GOVERNANCE_DELETION_DELAY,
            orphan_expiration_secs: GOVERNANCE_ORPHAN_EXPIRATION_TIME,
            max_cache_size: 1_000_000,
            max_orphan_votes: 10_000,
            peers_per_hash: 3,
            asked_recently_secs: 60 * 60,
            enforce_vote_update_min: true,
        }
    }
}

impl GovernanceConfig {
    /// Defaults adjusted for the given chain; mockable chains relay every second.
    pub fn for_params(params: &GovernanceParams) -> Self {
        let mut config = Self::default();
        if params.mockable_chain {
            config.relay_interval_secs = 1;
        }
        config
    }

    pub fn maintenance_interval(&self) -> Duration {
        Duration::from_secs(self.maintenance_interval_secs)
    }

    pub fn relay_interval(&self) -> Duration {
        Duration::from_secs(self.relay_interval_secs)
    }
}
