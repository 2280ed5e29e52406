//! Chain client facade.
//!
//! The service only needs a handful of node operations. They are expressed as a trait so the
//! envelope logic can run against an HTTP provider in production and an in-memory node in tests.

use alloy_primitives::{Address, B256, U256};
use async_trait::async_trait;
use ethers::{
    providers::{Http, Middleware, Provider, ProviderError},
    types::{BlockId, BlockNumber, Bytes, TransactionRequest, U64},
};
use tracing::debug;

use crate::{
    convert::{from_eth_u256, from_h256, to_h160, to_h256},
    error::{EnvelopeError, Result},
};

/// Projection of a block header, enough for the demo output.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockSummary {
    pub number: u64,
    pub hash: Option<B256>,
    pub timestamp: u64,
    pub transaction_count: usize,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReceiptSummary {
    pub transaction_hash: B256,
    /// `Some(1)` success, `Some(0)` reverted, `None` for pre-Byzantium receipts.
    pub status: Option<u64>,
    pub block_number: Option<u64>,
    pub gas_used: Option<U256>,
}

impl ReceiptSummary {
    pub fn is_success(&self) -> bool {
        self.status == Some(1)
    }
}

/// The node operations the client depends on.
///
/// Errors keep the node's own message; callers wrap them into the matching
/// [`EnvelopeError`] variant without rewording.
#[async_trait]
pub trait ChainClient: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    async fn chain_id(&self) -> std::result::Result<u64, Self::Error>;

    async fn balance(&self, address: Address) -> std::result::Result<U256, Self::Error>;

    async fn block_number(&self) -> std::result::Result<u64, Self::Error>;

    async fn block_summary(
        &self,
        number: u64,
    ) -> std::result::Result<Option<BlockSummary>, Self::Error>;

    /// Next nonce including transactions still in the mempool.
    async fn pending_nonce(&self, address: Address) -> std::result::Result<u64, Self::Error>;

    async fn gas_price(&self) -> std::result::Result<U256, Self::Error>;

    /// Submit a signed, RLP-encoded transaction. Returns the hash reported by the node.
    async fn send_raw_transaction(&self, raw: Vec<u8>) -> std::result::Result<B256, Self::Error>;

    /// `Ok(None)` while the transaction is not mined yet.
    async fn transaction_receipt(
        &self,
        hash: B256,
    ) -> std::result::Result<Option<ReceiptSummary>, Self::Error>;

    /// Read-only `eth_call` against the latest block.
    async fn call(&self, to: Address, data: Vec<u8>) -> std::result::Result<Vec<u8>, Self::Error>;
}

/// Build an HTTP provider for `rpc_url`.
///
/// The HTTP transport is lazy: this only validates the URL. An unreachable node shows up on the
/// first request.
pub fn connect(rpc_url: &str) -> Result<Provider<Http>> {
    let provider = Provider::<Http>::try_from(rpc_url)
        .map_err(|e| EnvelopeError::Connection(format!("{rpc_url}: {e}")))?;
    debug!(rpc_url, "created HTTP provider");
    Ok(provider)
}

#[async_trait]
impl ChainClient for Provider<Http> {
    type Error = ProviderError;

    async fn chain_id(&self) -> std::result::Result<u64, ProviderError> {
        chain_id_to_u64(Middleware::get_chainid(self).await?)
    }

    async fn balance(&self, address: Address) -> std::result::Result<U256, ProviderError> {
        let balance = Middleware::get_balance(self, to_h160(address), None).await?;
        Ok(from_eth_u256(balance))
    }

    async fn block_number(&self) -> std::result::Result<u64, ProviderError> {
        Ok(Middleware::get_block_number(self).await?.as_u64())
    }

    async fn block_summary(
        &self,
        number: u64,
    ) -> std::result::Result<Option<BlockSummary>, ProviderError> {
        let id = BlockId::Number(BlockNumber::Number(U64::from(number)));
        let block = Middleware::get_block(self, id).await?;
        Ok(block.map(|b| BlockSummary {
            number: b.number.map(|n| n.as_u64()).unwrap_or(number),
            hash: b.hash.map(from_h256),
            timestamp: b.timestamp.low_u64(),
            transaction_count: b.transactions.len(),
        }))
    }

    async fn pending_nonce(&self, address: Address) -> std::result::Result<u64, ProviderError> {
        let pending = BlockId::Number(BlockNumber::Pending);
        let nonce =
            Middleware::get_transaction_count(self, to_h160(address), Some(pending)).await?;
        Ok(nonce.low_u64())
    }

    async fn gas_price(&self) -> std::result::Result<U256, ProviderError> {
        Ok(from_eth_u256(Middleware::get_gas_price(self).await?))
    }

    async fn send_raw_transaction(&self, raw: Vec<u8>) -> std::result::Result<B256, ProviderError> {
        debug!(len = raw.len(), "eth_sendRawTransaction");
        let pending = Middleware::send_raw_transaction(self, Bytes::from(raw)).await?;
        Ok(from_h256(pending.tx_hash()))
    }

    async fn transaction_receipt(
        &self,
        hash: B256,
    ) -> std::result::Result<Option<ReceiptSummary>, ProviderError> {
        let receipt = Middleware::get_transaction_receipt(self, to_h256(hash)).await?;
        Ok(receipt.map(|r| ReceiptSummary {
            transaction_hash: from_h256(r.transaction_hash),
            status: r.status.map(|s| s.as_u64()),
            block_number: r.block_number.map(|n| n.as_u64()),
            gas_used: r.gas_used.map(from_eth_u256),
        }))
    }

    async fn call(
        &self,
        to: Address,
        data: Vec<u8>,
    ) -> std::result::Result<Vec<u8>, ProviderError> {
        let request = TransactionRequest::new().to(to_h160(to)).data(data);
        let out = Middleware::call(self, &request.into(), None).await?;
        Ok(out.to_vec())
    }
}

/// EIP-155 signing here takes a `u64` chain id; larger ids are refused, not truncated.
fn chain_id_to_u64(id: ethers::types::U256) -> std::result::Result<u64, ProviderError> {
    if id.bits() > 64 {
        return Err(ProviderError::CustomError(format!(
            "chain id {id} does not fit in 64 bits"
        )));
    }
    Ok(id.low_u64())
}
