//! Per-masternode rate limiting of trigger submissions.

use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};

use rusty_shared_types::OutPoint;

use crate::config::{MAX_TIME_FUTURE_DEVIATION, RELIABLE_PROPAGATION_TIME};

/// Number of timestamps remembered per masternode.
pub const RATE_BUFFER_SIZE: usize = 5;

/// Sliding window of the most recent submission timestamps.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateCheckBuffer {
    timestamps: VecDeque<i64>,
}

impl RateCheckBuffer {
    pub fn new() -> Self {
        Self { timestamps: VecDeque::with_capacity(RATE_BUFFER_SIZE) }
    }

    pub fn add_timestamp(&mut self, timestamp: i64) {
        if self.timestamps.len() == RATE_BUFFER_SIZE {
            self.timestamps.pop_front();
        }
        self.timestamps.push_back(timestamp);
    }

    pub fn count(&self) -> usize {
        self.timestamps.len()
    }

    pub fn min_timestamp(&self) -> Option<i64> {
        self.timestamps.iter().copied().min()
    }

    pub fn max_timestamp(&self) -> Option<i64> {
        self.timestamps.iter().copied().max()
    }

    /// Submissions per second over the window; 0 until the window is full.
    pub fn rate(&self) -> f64 {
        match self.full_span() {
            None => 0.0,
            Some(0) => 1.0e10,
            Some(span) => self.count() as f64 / span as f64,
        }
    }

    /// True when the rate stays at or below `2.2 / cycle_seconds`.
    ///
    /// Evaluated as `count * cycle * 10 <= 22 * span` so the boundary is exact.
    pub fn is_within_rate(&self, cycle_seconds: i64) -> bool {
        match self.full_span() {
            None => true,
            Some(0) => false,
            Some(span) => {
                let lhs = self.count() as i128 * cycle_seconds as i128 * 10;
                let rhs = 22 * span as i128;
                lhs <= rhs
            }
        }
    }

    fn full_span(&self) -> Option<i64> {
        if self.count() < RATE_BUFFER_SIZE {
            return None;
        }
        match (self.min_timestamp(), self.max_timestamp()) {
            (Some(min), Some(max)) => Some(max - min),
            _ => None,
        }
    }
}

/// Rate state of one masternode.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastObjectRecord {
    pub trigger_buffer: RateCheckBuffer,
    /// Whether the last recorded submission was compliant.
    pub status_ok: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateCheck {
    Passed,
    /// Skipped because the masternode's last submission was compliant.
    Bypassed,
    Rejected,
}

impl RateCheck {
    pub fn is_ok(&self) -> bool {
        !matches!(self, RateCheck::Rejected)
    }
}

/// Tracks trigger submissions per masternode collateral.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimiter {
    records: HashMap<OutPoint, LastObjectRecord>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn check(
        &mut self,
        masternode: &OutPoint,
        timestamp: i64,
        now: i64,
        cycle_seconds: i64,
        force: bool,
        update_fail_status: bool,
    ) -> RateCheck {
        if timestamp < now - 2 * cycle_seconds {
            debug!(
                "Rate check: object from {} too old, timestamp {} now {}",
                masternode.to_string_short(),
                timestamp,
                now
            );
            return RateCheck::Rejected;
        }
        if timestamp > now + MAX_TIME_FUTURE_DEVIATION {
            debug!(
                "Rate check: object from {} too far in the future, timestamp {} now {}",
                masternode.to_string_short(),
                timestamp,
                now
            );
            return RateCheck::Rejected;
        }

        let Some(record) = self.records.get_mut(masternode) else {
            return RateCheck::Passed;
        };
        if record.status_ok && !force {
            return RateCheck::Bypassed;
        }

        let mut buffer = record.trigger_buffer.clone();
        buffer.add_timestamp(timestamp);
        if buffer.is_within_rate(cycle_seconds) {
            return RateCheck::Passed;
        }

        debug!(
            "Rate check: rate too high for {}, rate {:.8} max {:.8}",
            masternode.to_string_short(),
            buffer.rate(),
            2.2 / cycle_seconds as f64
        );
        if update_fail_status {
            record.status_ok = false;
        }
        RateCheck::Rejected
    }

    /// Records an accepted trigger; returns true when it must be relayed again later.
    pub fn record(&mut self, masternode: &OutPoint, timestamp: i64, now: i64) -> bool {
        let record = self.records.entry(masternode.clone()).or_default();
        record.trigger_buffer.add_timestamp(timestamp);
        record.status_ok = true;
        timestamp > now + MAX_TIME_FUTURE_DEVIATION - RELIABLE_PROPAGATION_TIME
    }

    pub fn get(&self, masternode: &OutPoint) -> Option<&LastObjectRecord> {
        self.records.get(masternode)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }
}
