//! Envelope service: drives the RedEnvelope contract through its ABI.
//!
//! Escrow, claim eligibility, random splits and expiry are all enforced on-chain. This type
//! only shapes calls, signs them and decodes what comes back, so contract rule violations
//! show up as [`EnvelopeError::Submission`] when the node rejects the transaction.
//!
//! Each mutating call fetches a fresh pending nonce and gas price. Calls made through one
//! service instance are serialised from nonce fetch to submission; two instances (or two
//! processes) using the same key are not coordinated and may collide on a nonce.

use std::str::FromStr;
use std::time::Duration;

use alloy_primitives::{Address, B256, U256};
use ethers::providers::{Http, Provider};
use red_envelope_types::{gross_pot, Envelope, EnvelopeKind, FeeBreakdown};
use tokio::sync::Mutex;
use tracing::{info, instrument};

use crate::{
    abi::{CreateArgs, EnvelopeAbi, RED_ENVELOPE_ABI},
    chain::{self, ChainClient, ReceiptSummary},
    confirm::{wait_for_receipt, PollConfig},
    error::{EnvelopeError, Result},
    signer::{parse_signing_key, SentTransaction, TxSigner},
    transfer::submit,
};

pub const CREATE_GAS_LIMIT: u64 = 500_000;
pub const CLAIM_GAS_LIMIT: u64 = 300_000;
pub const REFUND_GAS_LIMIT: u64 = 300_000;

/// Display-only escrow figures for a `createEnvelope` call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CreateQuote {
    pub kind: EnvelopeKind,
    pub total_claims: u32,
    /// The `amount` argument as passed to the contract.
    pub amount: U256,
    pub fees: FeeBreakdown,
}

impl CreateQuote {
    pub fn compute(
        kind: EnvelopeKind,
        amount: U256,
        total_claims: u32,
        fee_bps: u16,
    ) -> Result<CreateQuote> {
        let gross = gross_pot(kind, amount, total_claims).ok_or(EnvelopeError::AmountOverflow)?;
        let fees = FeeBreakdown::compute(gross, fee_bps).ok_or(EnvelopeError::InvalidFee(fee_bps))?;
        Ok(CreateQuote {
            kind,
            total_claims,
            amount,
            fees,
        })
    }

    /// Call value: the gross pot for native-currency envelopes, zero for token envelopes.
    pub fn call_value(&self, token: Address) -> U256 {
        if token == Address::ZERO {
            self.fees.gross
        } else {
            U256::ZERO
        }
    }
}

pub fn parse_address(text: &str) -> Result<Address> {
    Address::from_str(text.trim()).map_err(|_| EnvelopeError::InvalidAddress(text.to_string()))
}

fn unix_now() -> u64 {
    time::OffsetDateTime::now_utc().unix_timestamp().max(0) as u64
}

pub struct EnvelopeService<C: ChainClient = Provider<Http>> {
    client: C,
    contract: Address,
    signer: TxSigner,
    abi: EnvelopeAbi,
    send_lock: Mutex<()>,
}

impl EnvelopeService<Provider<Http>> {
    /// Connect to `rpc_url` and bind to the contract with the embedded ABI.
    #[instrument(level = "debug", skip(private_key_hex))]
    pub async fn connect(
        rpc_url: &str,
        contract_address: &str,
        private_key_hex: &str,
    ) -> Result<Self> {
        let client = chain::connect(rpc_url)?;
        let contract = parse_address(contract_address)?;
        Self::with_client(client, contract, private_key_hex, RED_ENVELOPE_ABI).await
    }
}

impl<C: ChainClient> EnvelopeService<C> {
    /// Bind to `contract` over an existing client.
    ///
    /// Loads the key, fetches the chain id once for EIP-155 signing, then parses `abi_json`.
    /// Single attempt; the first failure is returned.
    pub async fn with_client(
        client: C,
        contract: Address,
        private_key_hex: &str,
        abi_json: &str,
    ) -> Result<Self> {
        let key = parse_signing_key(private_key_hex)?;
        let chain_id = client
            .chain_id()
            .await
            .map_err(|e| EnvelopeError::ChainQuery(e.to_string()))?;
        let abi = EnvelopeAbi::parse(abi_json)?;
        let signer = TxSigner::new(key, chain_id);
        info!(address = %signer.address(), chain_id, %contract, "envelope service ready");
        Ok(Self {
            client,
            contract,
            signer,
            abi,
            send_lock: Mutex::new(()),
        })
    }

    pub fn address(&self) -> Address {
        self.signer.address()
    }

    pub fn chain_id(&self) -> u64 {
        self.signer.chain_id()
    }

    pub fn contract_address(&self) -> Address {
        self.contract
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn signer(&self) -> &TxSigner {
        &self.signer
    }

    /// Create an envelope.
    ///
    /// `amount` is the per-claim amount for `GroupFixed` (the escrow is `amount * total_claims`)
    /// and the whole pot for the other kinds. The expiry is fixed from the local clock now, so
    /// time spent in the mempool shortens the effective window.
    #[instrument(level = "debug", skip(self))]
    #[allow(clippy::too_many_arguments)]
    pub async fn create_envelope(
        &self,
        kind: EnvelopeKind,
        token: Address,
        total_claims: u32,
        amount: U256,
        expiry_duration: Duration,
        room_id_hash: B256,
        recipient: Address,
    ) -> Result<SentTransaction> {
        let expiry = unix_now().saturating_add(expiry_duration.as_secs());
        let gross = gross_pot(kind, amount, total_claims).ok_or(EnvelopeError::AmountOverflow)?;
        let value = if token == Address::ZERO { gross } else { U256::ZERO };

        let data = self
            .abi
            .encode_create(&CreateArgs {
                kind,
                token,
                total_claims,
                amount,
                expiry,
                room_id_hash,
                recipient,
            })
            .map_err(|e| EnvelopeError::Submission(e.to_string()))?;

        let sent = self.transact(data, value, CREATE_GAS_LIMIT).await?;
        info!(hash = %sent.hash, %kind, expiry, value = %value, "createEnvelope submitted");
        Ok(sent)
    }

    /// Claim an envelope. Eligibility is not checked locally.
    #[instrument(level = "debug", skip(self))]
    pub async fn claim_envelope(&self, envelope_id: U256) -> Result<SentTransaction> {
        let data = self
            .abi
            .encode_claim(envelope_id)
            .map_err(|e| EnvelopeError::Submission(e.to_string()))?;
        let sent = self.transact(data, U256::ZERO, CLAIM_GAS_LIMIT).await?;
        info!(hash = %sent.hash, %envelope_id, "claimEnvelope submitted");
        Ok(sent)
    }

    /// Refund the unclaimed remainder. Expiry and creatorship are not checked locally.
    #[instrument(level = "debug", skip(self))]
    pub async fn refund_envelope(&self, envelope_id: U256) -> Result<SentTransaction> {
        let data = self
            .abi
            .encode_refund(envelope_id)
            .map_err(|e| EnvelopeError::Submission(e.to_string()))?;
        let sent = self.transact(data, U256::ZERO, REFUND_GAS_LIMIT).await?;
        info!(hash = %sent.hash, %envelope_id, "refundEnvelope submitted");
        Ok(sent)
    }

    #[instrument(level = "debug", skip(self))]
    pub async fn get_envelope(&self, envelope_id: U256) -> Result<Envelope> {
        let data = self
            .abi
            .encode_get_envelope(envelope_id)
            .map_err(|e| EnvelopeError::Query(e.to_string()))?;
        let out = self.read(data).await?;
        self.abi.decode_envelope(&out)
    }

    #[instrument(level = "debug", skip(self))]
    pub async fn has_claimed(&self, envelope_id: U256, user: Address) -> Result<bool> {
        let data = self
            .abi
            .encode_has_claimed(envelope_id, user)
            .map_err(|e| EnvelopeError::Query(e.to_string()))?;
        let out = self.read(data).await?;
        self.abi.decode_has_claimed(&out)
    }

    #[instrument(level = "debug", skip(self))]
    pub async fn next_envelope_id(&self) -> Result<U256> {
        let data = self
            .abi
            .encode_next_id()
            .map_err(|e| EnvelopeError::Query(e.to_string()))?;
        let out = self.read(data).await?;
        self.abi.decode_next_id(&out)
    }

    pub fn quote_create(
        &self,
        kind: EnvelopeKind,
        amount: U256,
        total_claims: u32,
        fee_bps: u16,
    ) -> Result<CreateQuote> {
        CreateQuote::compute(kind, amount, total_claims, fee_bps)
    }

    pub async fn wait_for_receipt(&self, hash: B256, config: PollConfig) -> Result<ReceiptSummary> {
        wait_for_receipt(&self.client, hash, config).await
    }

    async fn read(&self, data: Vec<u8>) -> Result<Vec<u8>> {
        self.client
            .call(self.contract, data)
            .await
            .map_err(|e| EnvelopeError::Query(e.to_string()))
    }

    async fn transact(
        &self,
        data: Vec<u8>,
        value: U256,
        gas_limit: u64,
    ) -> Result<SentTransaction> {
        let _guard = self.send_lock.lock().await;
        submit(&self.client, &self.signer, self.contract, value, data, gas_limit).await
    }
}
