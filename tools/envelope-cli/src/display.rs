//! Human-readable output.

use alloy_primitives::{Address, U256};
use red_envelope_client::{
    format_ether, CreateQuote, ReceiptSummary, Result as ClientResult, SentTransaction,
};
use red_envelope_types::Envelope;
use time::{format_description::well_known::Rfc3339, OffsetDateTime};
use tracing::warn;

pub fn unix_now() -> u64 {
    OffsetDateTime::now_utc().unix_timestamp().max(0) as u64
}

/// RFC 3339 in UTC; the raw number when out of range.
pub fn format_timestamp(secs: u64) -> String {
    i64::try_from(secs)
        .ok()
        .and_then(|s| OffsetDateTime::from_unix_timestamp(s).ok())
        .and_then(|t| t.format(&Rfc3339).ok())
        .unwrap_or_else(|| secs.to_string())
}

pub fn section(title: &str) {
    println!();
    println!("== {title} ==");
}

fn or_label(address: Address, label: &str) -> String {
    if address == Address::ZERO {
        label.to_string()
    } else {
        address.to_string()
    }
}

pub fn envelope_lines(id: U256, envelope: &Envelope, now: u64) -> Vec<String> {
    let expiry = format_timestamp(envelope.expiry);
    let status = if envelope.is_expired(now) {
        " (expired)"
    } else if envelope.is_exhausted() {
        " (fully claimed)"
    } else {
        ""
    };
    let room = if envelope.has_room_restriction() {
        envelope.room_id_hash.to_string()
    } else {
        "none".to_string()
    };
    vec![
        format!("envelope #{id}{status}"),
        format!("  creator:          {}", envelope.creator),
        format!("  token:            {}", or_label(envelope.token, "native")),
        format!("  kind:             {}", envelope.kind),
        format!("  amount per claim: {} ETH", format_ether(envelope.amount_per_claim)),
        format!("  remaining amount: {} ETH", format_ether(envelope.remaining_amount)),
        format!(
            "  claims:           {}/{} remaining ({} claimed)",
            envelope.remaining_claims,
            envelope.total_claims,
            envelope.claimed_count()
        ),
        format!("  claim index:      {}", envelope.claim_index),
        format!("  expiry:           {expiry}"),
        format!("  room hash:        {room}"),
        format!("  recipient:        {}", or_label(envelope.recipient, "anyone")),
    ]
}

pub fn print_envelope(id: U256, envelope: &Envelope) {
    for line in envelope_lines(id, envelope, unix_now()) {
        println!("{line}");
    }
}

pub fn quote_lines(quote: &CreateQuote, token: Address) -> Vec<String> {
    let fees = &quote.fees;
    vec![
        format!("kind:        {}", quote.kind),
        format!("claims:      {}", quote.total_claims),
        format!("gross pot:   {} ETH", format_ether(fees.gross)),
        format!(
            "fee:         {} ETH ({}.{:02}%)",
            format_ether(fees.fee),
            fees.fee_bps / 100,
            fees.fee_bps % 100
        ),
        format!("net pot:     {} ETH", format_ether(fees.net)),
        format!("call value:  {} ETH", format_ether(quote.call_value(token))),
    ]
}

/// The quote is informational; a bad fee rate is reported and the create goes ahead.
pub fn print_quote(quote: &ClientResult<CreateQuote>, token: Address) -> bool {
    match quote {
        Ok(quote) => {
            for line in quote_lines(quote, token) {
                println!("{line}");
            }
            true
        }
        Err(e) => {
            warn!(error = %e, "skipping fee quote");
            false
        }
    }
}

pub fn print_sent(label: &str, sent: &SentTransaction) {
    println!("{label} submitted: {}", sent.hash);
    println!(
        "  nonce {} gas limit {} gas price {} wei",
        sent.nonce, sent.gas_limit, sent.gas_price
    );
}

pub fn receipt_line(receipt: &ReceiptSummary) -> String {
    let status = if receipt.is_success() { "success" } else { "reverted" };
    let block = receipt
        .block_number
        .map(|n| n.to_string())
        .unwrap_or_else(|| "?".to_string());
    let gas = receipt
        .gas_used
        .map(|g| g.to_string())
        .unwrap_or_else(|| "?".to_string());
    format!("mined in block {block}: {status}, gas used {gas}")
}

pub fn print_receipt(receipt: &ReceiptSummary) {
    println!("{}", receipt_line(receipt));
}
