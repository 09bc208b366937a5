//! Rusty Coin Governance System
//!
//! This crate implements the governance object store and voting engine:
//! propagation, validation and garbage collection of proposals, triggers and
//! masternode votes, trigger rate limiting, and superblock payment
//! resolution.

pub mod config;
pub mod error;
pub mod interfaces;
pub mod manager;
pub mod messages;
pub mod payload;
pub mod persistence;
pub mod rate_check;
pub mod scheduler;
pub mod store;
pub mod triggers;
pub mod vote_file;

pub use config::GovernanceConfig;
pub use error::{ErrorKind, GovernanceError, GovernanceResult, PayloadError, StoreError, StoreResult};
pub use interfaces::{
    ChainView, Clock, CollateralStatus, FulfilledRequestTracker, MasternodeListSource, NodeContext, PeerChannel,
    PeerId, PeerInfo, SporkView, SyncState, SystemClock,
};
pub use manager::GovernanceManager;
pub use messages::{BloomFilter, GovernanceMessage, Inventory, InventoryKind, SyncItem};
pub use payload::{GovernancePayment, ObjectPayload, ProposalData, TriggerData};
pub use rate_check::{RateCheck, RateLimiter};
pub use store::{GovernanceStats, GovernanceStore, ObjectFlags, StoredObject};
pub use triggers::{SeenObjectStatus, Superblock};
pub use vote_file::VoteFile;

// Re-export commonly used types
pub use rusty_shared_types::governance::*;
