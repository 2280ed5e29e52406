//! Local key handling and legacy (EIP-155) transaction signing.

use alloy_primitives::{Address, B256, U256};
use ethers::{
    signers::{LocalWallet, Signer},
    types::{transaction::eip2718::TypedTransaction, TransactionRequest},
};
use k256::ecdsa::SigningKey;
use tracing::debug;

use crate::{
    convert::{from_h160, from_h256, to_eth_u256, to_h160},
    error::{EnvelopeError, Result},
};

/// Parse a 32-byte secp256k1 secret from hex, with or without `0x`.
pub fn parse_signing_key(key_hex: &str) -> Result<SigningKey> {
    let trimmed = key_hex.trim();
    let hex_part = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    let bytes = hex::decode(hex_part).map_err(|e| EnvelopeError::Key(e.to_string()))?;
    if bytes.len() != 32 {
        return Err(EnvelopeError::Key(format!(
            "invalid length {}, want 32 bytes",
            bytes.len()
        )));
    }
    SigningKey::from_slice(&bytes).map_err(|e| EnvelopeError::Key(e.to_string()))
}

/// Everything that goes into one legacy transaction besides the signature.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxParams {
    pub nonce: u64,
    pub gas_price: U256,
    pub gas_limit: u64,
    pub to: Address,
    pub value: U256,
    pub data: Vec<u8>,
}

/// Handle for a submitted transaction. Not a receipt: confirmation is up to the caller.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SentTransaction {
    pub hash: B256,
    pub from: Address,
    pub nonce: u64,
    pub gas_price: U256,
    pub gas_limit: u64,
    pub to: Address,
    pub value: U256,
    /// Signed RLP bytes as submitted.
    pub raw: Vec<u8>,
}

/// A secp256k1 key bound to one chain id.
#[derive(Clone, Debug)]
pub struct TxSigner {
    wallet: LocalWallet,
    address: Address,
    chain_id: u64,
}

impl TxSigner {
    pub fn new(key: SigningKey, chain_id: u64) -> Self {
        let wallet = LocalWallet::from(key).with_chain_id(chain_id);
        let address = from_h160(wallet.address());
        Self {
            wallet,
            address,
            chain_id,
        }
    }

    pub fn from_hex(key_hex: &str, chain_id: u64) -> Result<Self> {
        Ok(Self::new(parse_signing_key(key_hex)?, chain_id))
    }

    /// Address controlled by `key_hex`, without binding a chain.
    pub fn address_of(key_hex: &str) -> Result<Address> {
        let wallet = LocalWallet::from(parse_signing_key(key_hex)?);
        Ok(from_h160(wallet.address()))
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    /// Sign `params` as a legacy transaction with EIP-155 replay protection.
    pub fn sign(&self, params: TxParams) -> Result<SentTransaction> {
        let request = TransactionRequest::new()
            .from(to_h160(self.address))
            .to(to_h160(params.to))
            .value(to_eth_u256(params.value))
            .gas(params.gas_limit)
            .gas_price(to_eth_u256(params.gas_price))
            .nonce(params.nonce)
            .data(params.data)
            .chain_id(self.chain_id);
        let tx = TypedTransaction::Legacy(request);

        let signature = self
            .wallet
            .sign_transaction_sync(&tx)
            .map_err(|e| EnvelopeError::Signing(e.to_string()))?;
        let raw = tx.rlp_signed(&signature).to_vec();
        let hash = from_h256(tx.hash(&signature));
        debug!(%hash, nonce = params.nonce, "signed transaction");

        Ok(SentTransaction {
            hash,
            from: self.address,
            nonce: params.nonce,
            gas_price: params.gas_price,
            gas_limit: params.gas_limit,
            to: params.to,
            value: params.value,
            raw,
        })
    }
}
