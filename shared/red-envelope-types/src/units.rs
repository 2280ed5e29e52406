//! Presentation helpers for native-currency amounts. Amounts are always carried in wei.

use alloy_primitives::U256;

pub const WEI_PER_ETHER: U256 = U256::from_limbs([1_000_000_000_000_000_000, 0, 0, 0]);

const DISPLAY_DECIMALS: u32 = 4;
const ETHER_DECIMALS: usize = 18;

/// Wei as ether with four fractional digits, rounded half up (eg `0.5000`).
pub fn format_ether(wei: U256) -> String {
    let scale = U256::from(10u64.pow(DISPLAY_DECIMALS));
    let half = WEI_PER_ETHER / U256::from(2u64);

    let mut whole = wei / WEI_PER_ETHER;
    let rem = wei % WEI_PER_ETHER;
    let mut frac = (rem * scale + half) / WEI_PER_ETHER;
    if frac >= scale {
        whole += U256::from(1u64);
        frac -= scale;
    }
    format!("{whole}.{:0width$}", frac.as_limbs()[0], width = DISPLAY_DECIMALS as usize)
}

/// Decimal ether string (`"1"`, `"0.05"`, `"2."`) to wei. `None` on anything else, on more
/// than 18 fractional digits, or on overflow.
pub fn parse_ether(text: &str) -> Option<U256> {
    let text = text.trim();
    let (whole, frac) = match text.split_once('.') {
        Some((w, f)) => (w, f),
        None => (text, ""),
    };
    if whole.is_empty() && frac.is_empty() {
        return None;
    }
    if frac.len() > ETHER_DECIMALS
        || !whole.chars().all(|c| c.is_ascii_digit())
        || !frac.chars().all(|c| c.is_ascii_digit())
    {
        return None;
    }

    let whole = if whole.is_empty() {
        U256::ZERO
    } else {
        U256::from_str_radix(whole, 10).ok()?
    };
    let frac = if frac.is_empty() {
        U256::ZERO
    } else {
        let padded = format!("{frac:0<width$}", width = ETHER_DECIMALS);
        U256::from_str_radix(&padded, 10).ok()?
    };
    whole.checked_mul(WEI_PER_ETHER)?.checked_add(frac)
}
