//! Typed views of governance object payloads.
//!
//! Payloads are JSON documents. Proposals describe a monthly payment request,
//! triggers list the payments of one superblock. Both are parsed once when an
//! object enters the store.

use serde::{Deserialize, Serialize};

use rusty_shared_types::{GovernanceObject, GovernanceObjectType, Hash, PubKeyHash, COIN};

use crate::error::PayloadError;

/// Payloads above this size are rejected outright.
pub const MAX_DATA_SIZE: usize = 512;
/// Longest accepted proposal name.
pub const MAX_NAME_SIZE: usize = 40;

/// Parsed payload of a governance object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObjectPayload {
    Proposal(ProposalData),
    Trigger(TriggerData),
    Other,
}

impl ObjectPayload {
    /// Parses the payload matching the object's declared type.
    pub fn parse(object: &GovernanceObject) -> Result<Self, PayloadError> {
        match object.object_type {
            GovernanceObjectType::Proposal => {
                ProposalData::parse(&object.data).map(ObjectPayload::Proposal)
            }
            GovernanceObjectType::Trigger => {
                TriggerData::parse(&object.data).map(ObjectPayload::Trigger)
            }
            GovernanceObjectType::Other(_) => Ok(ObjectPayload::Other),
        }
    }
}

#[derive(Deserialize)]
struct RawProposal {
    #[serde(rename = "type")]
    object_type: i64,
    name: String,
    start_epoch: i64,
    end_epoch: i64,
    payment_address: String,
    payment_amount: serde_json::Number,
    url: String,
}

/// A budget proposal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalData {
    pub name: String,
    pub start_epoch: i64,
    pub end_epoch: i64,
    pub payment_address: PubKeyHash,
    /// Requested amount in base units.
    pub payment_amount: u64,
    pub url: String,
}

impl ProposalData {
    pub fn parse(data: &[u8]) -> Result<Self, PayloadError> {
        if data.len() > MAX_DATA_SIZE {
            return Err(PayloadError::InvalidField {
                field: "data",
                reason: format!("size {} exceeds {}", data.len(), MAX_DATA_SIZE),
            });
        }
        let raw: RawProposal = serde_json::from_slice(data)?;
        if raw.object_type != GovernanceObjectType::Proposal.as_u8() as i64 {
            return Err(PayloadError::WrongType(raw.object_type));
        }
        let payment_address = parse_pubkey_hash("payment_address", &raw.payment_address)?;
        let payment_amount = parse_amount("payment_amount", &raw.payment_amount.to_string())?;
        if payment_amount == 0 {
            return Err(PayloadError::InvalidField {
                field: "payment_amount",
                reason: "must be positive".to_string(),
            });
        }
        let proposal = ProposalData {
            name: raw.name,
            start_epoch: raw.start_epoch,
            end_epoch: raw.end_epoch,
            payment_address,
            payment_amount,
            url: raw.url,
        };
        proposal.validate_static()?;
        Ok(proposal)
    }

    fn validate_static(&self) -> Result<(), PayloadError> {
        if self.name.is_empty() || self.name.len() > MAX_NAME_SIZE {
            return Err(PayloadError::InvalidField {
                field: "name",
                reason: format!("length must be 1..={}", MAX_NAME_SIZE),
            });
        }
        if !self
            .name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(PayloadError::InvalidField {
                field: "name",
                reason: "contains invalid characters".to_string(),
            });
        }
        if self.start_epoch >= self.end_epoch {
            return Err(PayloadError::InvalidField {
                field: "end_epoch",
                reason: "must be after start_epoch".to_string(),
            });
        }
        if self.url.is_empty() || self.url.chars().any(char::is_whitespace) {
            return Err(PayloadError::InvalidField {
                field: "url",
                reason: "must be non-empty without whitespace".to_string(),
            });
        }
        Ok(())
    }

    /// Time dependent validation; a proposal whose end epoch passed is expired.
    pub fn validate(&self, now: i64, check_expiration: bool) -> Result<(), PayloadError> {
        self.validate_static()?;
        if check_expiration && self.end_epoch <= now {
            return Err(PayloadError::InvalidField {
                field: "end_epoch",
                reason: "proposal expired".to_string(),
            });
        }
        Ok(())
    }
}

#[derive(Deserialize)]
struct RawTrigger {
    #[serde(rename = "type")]
    object_type: i64,
    event_block_height: u64,
    payment_addresses: String,
    payment_amounts: String,
    #[serde(default)]
    proposal_hashes: Option<String>,
}

/// A single superblock payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GovernancePayment {
    pub pubkey_hash: PubKeyHash,
    pub amount: u64,
    pub proposal_hash: Option<Hash>,
}

/// Payment schedule of a superblock trigger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerData {
    pub event_block_height: u64,
    pub payments: Vec<GovernancePayment>,
}

impl TriggerData {
    pub fn parse(data: &[u8]) -> Result<Self, PayloadError> {
        let raw: RawTrigger = serde_json::from_slice(data)?;
        if raw.object_type != GovernanceObjectType::Trigger.as_u8() as i64 {
            return Err(PayloadError::WrongType(raw.object_type));
        }

        let addresses: Vec<&str> = split_list(&raw.payment_addresses);
        let amounts: Vec<&str> = split_list(&raw.payment_amounts);
        let hashes: Vec<&str> = raw.proposal_hashes.as_deref().map(split_list).unwrap_or_default();

        if addresses.len() != amounts.len() || (!hashes.is_empty() && hashes.len() != addresses.len()) {
            return Err(PayloadError::InvalidField {
                field: "payment_amounts",
                reason: format!(
                    "mismatched payments: {} addresses, {} amounts, {} proposal hashes",
                    addresses.len(),
                    amounts.len(),
                    hashes.len()
                ),
            });
        }
        if addresses.is_empty() {
            return Err(PayloadError::InvalidField {
                field: "payment_addresses",
                reason: "no payments".to_string(),
            });
        }

        let mut payments = Vec::with_capacity(addresses.len());
        let mut total: u64 = 0;
        for (i, (address, amount)) in addresses.iter().zip(amounts.iter()).enumerate() {
            let pubkey_hash = parse_pubkey_hash("payment_addresses", address)?;
            let amount = parse_amount("payment_amounts", amount)?;
            if amount == 0 {
                return Err(PayloadError::InvalidField {
                    field: "payment_amounts",
                    reason: "payment amount must be positive".to_string(),
                });
            }
            total = total.checked_add(amount).ok_or_else(|| PayloadError::InvalidField {
                field: "payment_amounts",
                reason: "total overflows".to_string(),
            })?;
            let proposal_hash = match hashes.get(i) {
                Some(h) => Some(parse_hash("proposal_hashes", h)?),
                None => None,
            };
            payments.push(GovernancePayment { pubkey_hash, amount, proposal_hash });
        }

        Ok(TriggerData { event_block_height: raw.event_block_height, payments })
    }

    pub fn total_payments(&self) -> u64 {
        self.payments.iter().map(|p| p.amount).sum()
    }
}

fn split_list(s: &str) -> Vec<&str> {
    s.split('|').map(str::trim).filter(|p| !p.is_empty()).collect()
}

fn parse_pubkey_hash(field: &'static str, s: &str) -> Result<PubKeyHash, PayloadError> {
    let bytes = hex::decode(s).map_err(|e| PayloadError::InvalidField { field, reason: e.to_string() })?;
    bytes.try_into().map_err(|_| PayloadError::InvalidField {
        field,
        reason: format!("address {} is not a 20 byte key hash", s),
    })
}

fn parse_hash(field: &'static str, s: &str) -> Result<Hash, PayloadError> {
    let bytes = hex::decode(s).map_err(|e| PayloadError::InvalidField { field, reason: e.to_string() })?;
    bytes.try_into().map_err(|_| PayloadError::InvalidField {
        field,
        reason: format!("{} is not a 32 byte hash", s),
    })
}

/// Parses a non-negative decimal coin amount with at most 8 decimals into base units.
pub fn parse_amount(field: &'static str, s: &str) -> Result<u64, PayloadError> {
    let invalid = |reason: &str| PayloadError::InvalidField { field, reason: format!("{}: {}", reason, s) };
    let (whole, frac) = match s.split_once('.') {
        Some((w, f)) => (w, f),
        None => (s, ""),
    };
    if whole.is_empty() || !whole.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid("invalid amount"));
    }
    if frac.len() > 8 || !frac.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid("invalid fraction"));
    }
    let whole: u64 = whole.parse().map_err(|_| invalid("amount out of range"))?;
    let mut frac_units: u64 = 0;
    if !frac.is_empty() {
        let padded = format!("{:0<8}", frac);
        frac_units = padded.parse().map_err(|_| invalid("invalid fraction"))?;
    }
    whole
        .checked_mul(COIN)
        .and_then(|w| w.checked_add(frac_units))
        .ok_or_else(|| invalid("amount out of range"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trigger_json(addresses: &str, amounts: &str) -> Vec<u8> {
        format!(
            r#"{{"event_block_height":1510,"payment_addresses":"{}","payment_amounts":"{}","type":2}}"#,
            addresses, amounts
        )
        .into_bytes()
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("a", "1").unwrap(), COIN);
        assert_eq!(parse_amount("a", "0.5").unwrap(), COIN / 2);
        assert_eq!(parse_amount("a", "12.00000001").unwrap(), 12 * COIN + 1);
        assert!(parse_amount("a", "1.000000001").is_err());
        assert!(parse_amount("a", "-1").is_err());
        assert!(parse_amount("a", "").is_err());
        assert!(parse_amount("a", "99999999999999999999").is_err());
    }

    #[test]
    fn test_parse_trigger() {
        let a = hex::encode([1u8; 20]);
        let b = hex::encode([2u8; 20]);
        let data = trigger_json(&format!("{}|{}", a, b), "1.5|2");
        let trigger = TriggerData::parse(&data).unwrap();
        assert_eq!(trigger.event_block_height, 1510);
        assert_eq!(trigger.payments.len(), 2);
        assert_eq!(trigger.payments[0].pubkey_hash, [1u8; 20]);
        assert_eq!(trigger.total_payments(), 3 * COIN + COIN / 2);
    }

    #[test]
    fn test_trigger_rejects_mismatch_and_bad_values() {
        let a = hex::encode([1u8; 20]);
        assert!(TriggerData::parse(&trigger_json(&a, "1|2")).is_err());
        assert!(TriggerData::parse(&trigger_json(&a, "0")).is_err());
        assert!(TriggerData::parse(&trigger_json("abcd", "1")).is_err());
        assert!(TriggerData::parse(&trigger_json("", "")).is_err());
        let overflow = format!("{}|{}", a, a);
        assert!(TriggerData::parse(&trigger_json(&overflow, "184467440737|184467440737")).is_err());
    }

    #[test]
    fn test_parse_proposal() {
        let data = format!(
            r#"{{"type":1,"name":"dev-fund_1","start_epoch":100,"end_epoch":200,"payment_address":"{}","payment_amount":12.5,"url":"https://example.org/p"}}"#,
            hex::encode([9u8; 20])
        );
        let proposal = ProposalData::parse(data.as_bytes()).unwrap();
        assert_eq!(proposal.payment_amount, 12 * COIN + COIN / 2);
        assert!(proposal.validate(150, true).is_ok());
        assert!(proposal.validate(200, true).is_err());
        assert!(proposal.validate(200, false).is_ok());
    }

    #[test]
    fn test_proposal_rejects_bad_name() {
        let data = format!(
            r#"{{"type":1,"name":"bad name!","start_epoch":100,"end_epoch":200,"payment_address":"{}","payment_amount":1,"url":"u"}}"#,
            hex::encode([9u8; 20])
        );
        assert!(matches!(
            ProposalData::parse(data.as_bytes()),
            Err(PayloadError::InvalidField { field: "name", .. })
        ));
    }

    #[test]
    fn test_wrong_type_rejected() {
        let data = format!(
            r#"{{"type":1,"event_block_height":10,"payment_addresses":"{}","payment_amounts":"1"}}"#,
            hex::encode([1u8; 20])
        );
        assert_eq!(TriggerData::parse(data.as_bytes()), Err(PayloadError::WrongType(1)));
    }
}
