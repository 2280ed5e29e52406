use alloy_primitives::{Address, B256, U256};
use serde::{Deserialize, Serialize};

use crate::kind::EnvelopeKind;

/// Number of values in the `getEnvelope` return tuple.
pub const ENVELOPE_FIELD_COUNT: usize = 11;

/// Read-only snapshot of an on-chain envelope.
///
/// Field order is the positional order of the `getEnvelope` return tuple. The snapshot is
/// fetched per query and never cached; every invariant (claims only decrease, remaining amount
/// tracks claims) is enforced by the contract, not here.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    pub creator: Address,
    /// Zero address means native currency.
    pub token: Address,
    pub kind: EnvelopeKind,
    pub amount_per_claim: U256,
    pub remaining_amount: U256,
    pub total_claims: u32,
    pub remaining_claims: u32,
    pub claim_index: u32,
    /// Unix timestamp; claims allowed at or before, refunds only after.
    pub expiry: u64,
    /// Zero means no room restriction.
    pub room_id_hash: B256,
    /// Zero address means anyone may claim.
    pub recipient: Address,
}

impl Envelope {
    pub fn is_native(&self) -> bool {
        self.token == Address::ZERO
    }

    pub fn has_room_restriction(&self) -> bool {
        self.room_id_hash != B256::ZERO
    }

    pub fn recipient_restricted(&self) -> bool {
        self.recipient != Address::ZERO
    }

    /// `now` is a unix timestamp. Mirrors the contract's `block.timestamp > expiry` rule.
    pub fn is_expired(&self, now: u64) -> bool {
        now > self.expiry
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining_claims == 0
    }

    pub fn claimed_count(&self) -> u32 {
        self.total_claims.saturating_sub(self.remaining_claims)
    }
}
