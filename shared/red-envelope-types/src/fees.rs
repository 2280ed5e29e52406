//! Client-side pot and fee arithmetic.
//!
//! The contract deducts its fee from the gross pot on creation. The figures computed here are
//! for display only; the authoritative amounts come from reading the envelope back.

use alloy_primitives::U256;

use crate::kind::EnvelopeKind;

pub const BPS_DENOMINATOR: u16 = 10_000;

/// 2.5%.
pub const DEFAULT_FEE_BPS: u16 = 250;

/// Amount escrowed by `createEnvelope` (the call value for native-currency envelopes).
///
/// `GroupFixed` takes `amount` per claim and escrows `amount * total_claims`; the other kinds
/// take the whole pot in `amount`. Returns `None` when the product overflows 256 bits.
pub fn gross_pot(kind: EnvelopeKind, amount: U256, total_claims: u32) -> Option<U256> {
    match kind {
        EnvelopeKind::GroupFixed => amount.checked_mul(U256::from(total_claims)),
        EnvelopeKind::DirectFixed | EnvelopeKind::GroupRandom => Some(amount),
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FeeBreakdown {
    pub gross: U256,
    pub fee_bps: u16,
    pub fee: U256,
    pub net: U256,
}

impl FeeBreakdown {
    /// `fee = floor(gross * bps / 10000)`, `net = gross - fee`.
    ///
    /// Split as `q * bps + r * bps / 10000` with `gross = q * 10000 + r` so the product never
    /// exceeds `gross`. Rates above 100% are rejected.
    pub fn compute(gross: U256, fee_bps: u16) -> Option<FeeBreakdown> {
        if fee_bps > BPS_DENOMINATOR {
            return None;
        }
        let denom = U256::from(BPS_DENOMINATOR);
        let bps = U256::from(fee_bps);
        let (q, r) = (gross / denom, gross % denom);
        let fee = q * bps + r * bps / denom;
        Some(FeeBreakdown {
            gross,
            fee_bps,
            fee,
            net: gross - fee,
        })
    }
}
