//! Error types for the governance store and manager.

use std::io;
use thiserror::Error;

use rusty_shared_types::{Hash, OutPoint};

/// Misbehavior score for a peer that sent something provably invalid.
pub const PENALTY_INVALID: u32 = 20;

/// Misbehavior score for a peer that sent a malformed message.
pub const PENALTY_MALFORMED: u32 = 100;

/// How serious a rejection is, mirrored from the way peers are scored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Informational; nothing wrong with the sender.
    Warning,
    /// May succeed later (rate windows, missing parents).
    Temporary,
    /// Will never succeed.
    Permanent,
}

/// Rejection reasons for governance objects, votes and sync requests.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GovernanceError {
    #[error("node is not synced")]
    NotSynced,

    #[error("unrequested item {}", hex::encode(.0))]
    Unsolicited(Hash),

    #[error("already have governance object {}", hex::encode(.0))]
    AlreadyKnown(Hash),

    #[error("duplicate vote {}", hex::encode(.0))]
    DuplicateVote(Hash),

    #[error("old invalid vote {}", hex::encode(.0))]
    KnownInvalidVote(Hash),

    #[error("masternode {} not found", .0.to_string_short())]
    UnknownMasternode(OutPoint),

    #[error("vote signal none")]
    NoneSignal,

    #[error("unsupported vote signal {0}")]
    UnsupportedSignal(u8),

    #[error("obsolete vote, time {vote_time} < {current_time}")]
    ObsoleteVote { vote_time: i64, current_time: i64 },

    #[error("vote with same timestamp does not raise the outcome")]
    OutcomeNotHigher,

    #[error("masternode {} voting too often", .0.to_string_short())]
    VotingTooOften(OutPoint),

    #[error("invalid vote signature from {}", .0.to_string_short())]
    InvalidVoteSignature(OutPoint),

    #[error("vote time {0} is too far ahead of current time")]
    VoteTooFarInFuture(i64),

    #[error("unknown parent object {}", hex::encode(.0))]
    OrphanVote(Hash),

    #[error("object {} is deleted or expired", hex::encode(.0))]
    ObjectDeleted(Hash),

    #[error("invalid governance object: {0}")]
    InvalidObject(String),

    #[error("collateral is missing confirmations")]
    MissingConfirmations,

    #[error("masternode {} failed the rate check", .0.to_string_short())]
    RateLimited(OutPoint),

    #[error("invalid trigger: {0}")]
    InvalidTrigger(String),

    #[error("peer asked for a full sync again")]
    SyncRequestRepeated,

    #[error("bloom filter exceeds size limits")]
    OversizedFilter,

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl GovernanceError {
    /// Misbehavior score the message dispatcher should apply to the sender.
    pub fn penalty(&self) -> u32 {
        match self {
            GovernanceError::KnownInvalidVote(_)
            | GovernanceError::UnknownMasternode(_)
            | GovernanceError::UnsupportedSignal(_)
            | GovernanceError::InvalidVoteSignature(_)
            | GovernanceError::VoteTooFarInFuture(_)
            | GovernanceError::InvalidObject(_)
            | GovernanceError::SyncRequestRepeated => PENALTY_INVALID,
            GovernanceError::OversizedFilter => PENALTY_MALFORMED,
            _ => 0,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            GovernanceError::NoneSignal
            | GovernanceError::OrphanVote(_)
            | GovernanceError::DuplicateVote(_)
            | GovernanceError::AlreadyKnown(_) => ErrorKind::Warning,
            GovernanceError::VotingTooOften(_)
            | GovernanceError::MissingConfirmations
            | GovernanceError::RateLimited(_)
            | GovernanceError::NotSynced => ErrorKind::Temporary,
            _ => ErrorKind::Permanent,
        }
    }

    pub fn is_permanent(&self) -> bool {
        self.kind() == ErrorKind::Permanent
    }
}

impl From<bincode::Error> for GovernanceError {
    fn from(err: bincode::Error) -> Self {
        GovernanceError::Serialization(err.to_string())
    }
}

/// Errors while parsing an object payload.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PayloadError {
    #[error("payload is not valid JSON: {0}")]
    Json(String),

    #[error("invalid field {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },

    #[error("wrong object type {0}")]
    WrongType(i64),
}

impl From<serde_json::Error> for PayloadError {
    fn from(err: serde_json::Error) -> Self {
        PayloadError::Json(err.to_string())
    }
}

impl From<PayloadError> for GovernanceError {
    fn from(err: PayloadError) -> Self {
        GovernanceError::InvalidObject(err.to_string())
    }
}

/// Errors while saving or loading the governance store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("incompatible store version: expected {expected}, found {found}")]
    VersionMismatch { expected: String, found: String },
}

pub type GovernanceResult<T> = Result<T, GovernanceError>;
pub type StoreResult<T> = Result<T, StoreError>;
