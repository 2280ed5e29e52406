//! Bounded receipt polling.

use std::time::Duration;

use alloy_primitives::B256;
use tracing::{debug, warn};

use crate::{
    chain::{ChainClient, ReceiptSummary},
    error::{EnvelopeError, Result},
};

pub const DEFAULT_RECEIPT_ATTEMPTS: u32 = 30;
pub const DEFAULT_RECEIPT_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PollConfig {
    pub attempts: u32,
    /// Pause between attempts; none after the last one.
    pub interval: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            attempts: DEFAULT_RECEIPT_ATTEMPTS,
            interval: DEFAULT_RECEIPT_INTERVAL,
        }
    }
}

/// Poll for the receipt of `hash`, returning on the first hit.
///
/// A missing receipt and an RPC error both count as a failed attempt. Gives up with
/// [`EnvelopeError::Timeout`] once `config.attempts` are spent. A mined-but-reverted
/// transaction is returned as-is; check [`ReceiptSummary::is_success`].
pub async fn wait_for_receipt<C: ChainClient>(
    client: &C,
    hash: B256,
    config: PollConfig,
) -> Result<ReceiptSummary> {
    for attempt in 1..=config.attempts {
        match client.transaction_receipt(hash).await {
            Ok(Some(receipt)) => {
                debug!(%hash, attempt, status = ?receipt.status, "receipt found");
                return Ok(receipt);
            }
            Ok(None) => debug!(%hash, attempt, "transaction not mined yet"),
            Err(e) => warn!(%hash, attempt, error = %e, "receipt query failed"),
        }
        if attempt < config.attempts {
            tokio::time::sleep(config.interval).await;
        }
    }
    Err(EnvelopeError::Timeout {
        attempts: config.attempts,
    })
}
