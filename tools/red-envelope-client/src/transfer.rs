//! Signing and submitting transactions from a local key.

use alloy_primitives::{Address, U256};
use tracing::{debug, info, warn};

use crate::{
    chain::ChainClient,
    error::{EnvelopeError, Result},
    signer::{SentTransaction, TxParams, TxSigner},
};

pub const TRANSFER_GAS_LIMIT: u64 = 21_000;

/// Fetch the pending nonce and gas price, sign, and submit.
///
/// Node errors keep their message so contract reverts surface as-is.
pub(crate) async fn submit<C: ChainClient>(
    client: &C,
    signer: &TxSigner,
    to: Address,
    value: U256,
    data: Vec<u8>,
    gas_limit: u64,
) -> Result<SentTransaction> {
    let nonce = client
        .pending_nonce(signer.address())
        .await
        .map_err(|e| EnvelopeError::Nonce(e.to_string()))?;
    let gas_price = client
        .gas_price()
        .await
        .map_err(|e| EnvelopeError::GasPrice(e.to_string()))?;
    debug!(nonce, %gas_price, gas_limit, %to, "submitting transaction");

    let sent = signer.sign(TxParams {
        nonce,
        gas_price,
        gas_limit,
        to,
        value,
        data,
    })?;
    let node_hash = client
        .send_raw_transaction(sent.raw.clone())
        .await
        .map_err(|e| EnvelopeError::Submission(e.to_string()))?;
    if node_hash != sent.hash {
        warn!(local = %sent.hash, node = %node_hash, "node reported a different transaction hash");
    }
    Ok(sent)
}

/// Plain value transfer to `to`.
pub async fn send_native<C: ChainClient>(
    client: &C,
    signer: &TxSigner,
    to: Address,
    amount: U256,
) -> Result<SentTransaction> {
    let sent = submit(client, signer, to, amount, Vec::new(), TRANSFER_GAS_LIMIT).await?;
    info!(hash = %sent.hash, %to, %amount, "transfer submitted");
    Ok(sent)
}
