//! In-memory node for unit tests.
//!
//! Accepts the signed raw transactions the client produces, recovers the sender, and runs a
//! small model of the RedEnvelope contract behind the same selectors. Reverts are reported the
//! way an automining dev node reports them: as an error on `eth_sendRawTransaction`.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use alloy_primitives::{Address, B256, U256};
use async_trait::async_trait;
use ethers::abi::{encode, Token};
use ethers::types::Transaction;
use red_envelope_types::{gross_pot, Envelope, EnvelopeKind, FeeBreakdown, DEFAULT_FEE_BPS};
use thiserror::Error;

use crate::{
    abi::{
        EnvelopeAbi, CLAIM_ENVELOPE, CREATE_ENVELOPE, GET_ENVELOPE, HAS_USER_CLAIMED,
        NEXT_ENVELOPE_ID, REFUND_ENVELOPE,
    },
    chain::{BlockSummary, ChainClient, ReceiptSummary},
    convert::{from_eth_u256, from_h160, from_h256, to_eth_u256, to_h160},
};

pub(crate) const GAS_USED: u64 = 21_000;

#[derive(Debug, Error)]
#[error("{0}")]
pub(crate) struct MockError(pub String);

fn revert(reason: &str) -> MockError {
    MockError(format!(
        "execution reverted: VM Exception while processing transaction: reverted with reason string '{reason}'"
    ))
}

#[derive(Default)]
struct State {
    now: u64,
    block_number: u64,
    gas_price: U256,
    balances: HashMap<Address, U256>,
    nonces: HashMap<Address, u64>,
    envelopes: Vec<Envelope>,
    claimed: HashSet<(usize, Address)>,
    receipts: HashMap<B256, ReceiptSummary>,
    delayed_receipts: HashMap<B256, (u32, bool)>,
    receipt_queries: u32,
    failing_receipt_queries: u32,
    nonce_error: Option<String>,
    gas_price_error: Option<String>,
    call_overrides: HashMap<[u8; 4], Vec<u8>>,
    submitted: Vec<Transaction>,
}

pub(crate) struct MockChain {
    chain_id: u64,
    contract: Address,
    abi: EnvelopeAbi,
    state: Mutex<State>,
}

impl MockChain {
    pub(crate) fn new(chain_id: u64) -> Self {
        let now = time::OffsetDateTime::now_utc().unix_timestamp().max(0) as u64;
        Self {
            chain_id,
            contract: Address::repeat_byte(0x5f),
            abi: EnvelopeAbi::embedded().expect("embedded ABI"),
            state: Mutex::new(State {
                now,
                block_number: 1,
                gas_price: U256::from(1_000_000_000u64),
                ..State::default()
            }),
        }
    }

    fn state(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().expect("mock state poisoned")
    }

    pub(crate) fn contract(&self) -> Address {
        self.contract
    }

    pub(crate) fn fund(&self, address: Address, amount: U256) {
        *self.state().balances.entry(address).or_default() += amount;
    }

    pub(crate) fn advance_time(&self, seconds: u64) {
        self.state().now += seconds;
    }

    pub(crate) fn now(&self) -> u64 {
        self.state().now
    }

    pub(crate) fn gas_price_value(&self) -> U256 {
        self.state().gas_price
    }

    pub(crate) fn fail_nonce(&self, message: &str) {
        self.state().nonce_error = Some(message.to_string());
    }

    pub(crate) fn fail_gas_price(&self, message: &str) {
        self.state().gas_price_error = Some(message.to_string());
    }

    pub(crate) fn override_call(&self, selector: [u8; 4], output: Vec<u8>) {
        self.state().call_overrides.insert(selector, output);
    }

    /// The receipt for `hash` becomes visible once `queries` receipt lookups have been made.
    pub(crate) fn mine_after(&self, hash: B256, queries: u32, success: bool) {
        self.state().delayed_receipts.insert(hash, (queries, success));
    }

    /// The next `count` receipt lookups fail with an RPC error.
    pub(crate) fn fail_receipt_queries(&self, count: u32) {
        self.state().failing_receipt_queries = count;
    }

    pub(crate) fn receipt_queries(&self) -> u32 {
        self.state().receipt_queries
    }

    pub(crate) fn submitted(&self) -> Vec<Transaction> {
        self.state().submitted.clone()
    }

    fn selector(&self, name: &str) -> [u8; 4] {
        self.abi
            .function(name)
            .expect("function in embedded ABI")
            .short_signature()
    }

    fn decode_args(&self, name: &str, input: &[u8]) -> Result<Vec<Token>, MockError> {
        self.abi
            .function(name)
            .and_then(|f| f.decode_input(&input[4..]))
            .map_err(|e| MockError(format!("bad calldata for {name}: {e}")))
    }

    fn execute(
        &self,
        state: &mut State,
        sender: Address,
        value: U256,
        input: &[u8],
    ) -> Result<(), MockError> {
        if input.len() < 4 {
            return Err(revert("unknown function"));
        }
        let selector: [u8; 4] = [input[0], input[1], input[2], input[3]];

        if selector == self.selector(CREATE_ENVELOPE) {
            let args = self.decode_args(CREATE_ENVELOPE, input)?;
            let kind = EnvelopeKind::try_from(uint(&args[0]).as_limbs()[0] as u8)
                .map_err(|_| revert("bad kind"))?;
            let token = address(&args[1]);
            let total_claims = uint(&args[2]).as_limbs()[0] as u32;
            let amount = uint(&args[3]);
            let expiry = uint(&args[4]).as_limbs()[0];
            let room_id_hash = match &args[5] {
                Token::FixedBytes(b) => B256::from_slice(b),
                _ => B256::ZERO,
            };
            let recipient = address(&args[6]);

            let total_claims = if kind == EnvelopeKind::DirectFixed { 1 } else { total_claims };
            if total_claims == 0 {
                return Err(revert("no claims"));
            }
            if kind == EnvelopeKind::DirectFixed && recipient == Address::ZERO {
                return Err(revert("recipient required"));
            }
            if expiry <= state.now {
                return Err(revert("expiry in the past"));
            }
            let gross = gross_pot(kind, amount, total_claims).ok_or_else(|| revert("overflow"))?;
            if token == Address::ZERO && value != gross {
                return Err(revert("bad value"));
            }
            let quote = FeeBreakdown::compute(gross, DEFAULT_FEE_BPS).ok_or_else(|| revert("fee"))?;
            let amount_per_claim = match kind {
                EnvelopeKind::GroupFixed => amount,
                EnvelopeKind::DirectFixed => quote.net,
                EnvelopeKind::GroupRandom => U256::ZERO,
            };
            state.envelopes.push(Envelope {
                creator: sender,
                token,
                kind,
                amount_per_claim,
                remaining_amount: quote.net,
                total_claims,
                remaining_claims: total_claims,
                claim_index: 0,
                expiry,
                room_id_hash,
                recipient,
            });
            return Ok(());
        }

        if selector == self.selector(CLAIM_ENVELOPE) {
            let id = self.envelope_index(state, &self.decode_args(CLAIM_ENVELOPE, input)?[0])?;
            let now = state.now;
            if state.claimed.contains(&(id, sender)) {
                return Err(revert("already claimed"));
            }
            let envelope = &mut state.envelopes[id];
            if now > envelope.expiry {
                return Err(revert("expired"));
            }
            if envelope.remaining_claims == 0 {
                return Err(revert("no claims left"));
            }
            if envelope.recipient != Address::ZERO && envelope.recipient != sender {
                return Err(revert("not recipient"));
            }
            // Equal split of what is left; the last claimer takes the remainder.
            let payout = envelope.remaining_amount / U256::from(envelope.remaining_claims);
            let payout = if envelope.remaining_claims == 1 {
                envelope.remaining_amount
            } else {
                payout
            };
            envelope.remaining_amount -= payout;
            envelope.remaining_claims -= 1;
            envelope.claim_index += 1;
            state.claimed.insert((id, sender));
            *state.balances.entry(sender).or_default() += payout;
            return Ok(());
        }

        if selector == self.selector(REFUND_ENVELOPE) {
            let id = self.envelope_index(state, &self.decode_args(REFUND_ENVELOPE, input)?[0])?;
            let now = state.now;
            let envelope = &mut state.envelopes[id];
            if envelope.creator != sender {
                return Err(revert("not creator"));
            }
            if now <= envelope.expiry {
                return Err(revert("not expired"));
            }
            if envelope.remaining_amount == U256::ZERO {
                return Err(revert("nothing to refund"));
            }
            let refund = envelope.remaining_amount;
            envelope.remaining_amount = U256::ZERO;
            envelope.remaining_claims = 0;
            *state.balances.entry(sender).or_default() += refund;
            return Ok(());
        }

        Err(revert("unknown function"))
    }

    fn envelope_index(&self, state: &State, token: &Token) -> Result<usize, MockError> {
        let id = uint(token);
        if id >= U256::from(state.envelopes.len()) {
            return Err(revert("envelope not found"));
        }
        Ok(id.as_limbs()[0] as usize)
    }
}

fn uint(token: &Token) -> U256 {
    match token {
        Token::Uint(v) => from_eth_u256(*v),
        _ => U256::ZERO,
    }
}

fn address(token: &Token) -> Address {
    match token {
        Token::Address(a) => from_h160(*a),
        _ => Address::ZERO,
    }
}

fn envelope_tokens(envelope: &Envelope) -> Token {
    Token::Tuple(vec![
        Token::Address(to_h160(envelope.creator)),
        Token::Address(to_h160(envelope.token)),
        Token::Uint(envelope.kind.ordinal().into()),
        Token::Uint(to_eth_u256(envelope.amount_per_claim)),
        Token::Uint(to_eth_u256(envelope.remaining_amount)),
        Token::Uint(envelope.total_claims.into()),
        Token::Uint(envelope.remaining_claims.into()),
        Token::Uint(envelope.claim_index.into()),
        Token::Uint(envelope.expiry.into()),
        Token::FixedBytes(envelope.room_id_hash.to_vec()),
        Token::Address(to_h160(envelope.recipient)),
    ])
}

#[async_trait]
impl ChainClient for MockChain {
    type Error = MockError;

    async fn chain_id(&self) -> Result<u64, MockError> {
        Ok(self.chain_id)
    }

    async fn balance(&self, address: Address) -> Result<U256, MockError> {
        Ok(self.state().balances.get(&address).copied().unwrap_or_default())
    }

    async fn block_number(&self) -> Result<u64, MockError> {
        Ok(self.state().block_number)
    }

    async fn block_summary(&self, number: u64) -> Result<Option<BlockSummary>, MockError> {
        let state = self.state();
        if number > state.block_number {
            return Ok(None);
        }
        Ok(Some(BlockSummary {
            number,
            hash: Some(B256::with_last_byte(number as u8)),
            timestamp: state.now,
            transaction_count: usize::from(number == state.block_number && number > 1),
        }))
    }

    async fn pending_nonce(&self, address: Address) -> Result<u64, MockError> {
        let state = self.state();
        if let Some(message) = &state.nonce_error {
            return Err(MockError(message.clone()));
        }
        Ok(state.nonces.get(&address).copied().unwrap_or_default())
    }

    async fn gas_price(&self) -> Result<U256, MockError> {
        let state = self.state();
        if let Some(message) = &state.gas_price_error {
            return Err(MockError(message.clone()));
        }
        Ok(state.gas_price)
    }

    async fn send_raw_transaction(&self, raw: Vec<u8>) -> Result<B256, MockError> {
        let tx: Transaction =
            rlp::decode(&raw).map_err(|e| MockError(format!("rlp: invalid transaction: {e}")))?;
        let sender = from_h160(
            tx.recover_from()
                .map_err(|e| MockError(format!("invalid sender: {e}")))?,
        );
        let hash = from_h256(tx.hash);
        let mut state = self.state();

        // EIP-155: v = chain_id * 2 + 35 + recovery id.
        let v = tx.v.as_u64();
        if v < 35 || (v - 35) / 2 != self.chain_id {
            return Err(MockError("invalid chain id for signer".into()));
        }
        let expected_nonce = state.nonces.get(&sender).copied().unwrap_or_default();
        if tx.nonce.low_u64() != expected_nonce {
            return Err(MockError(format!(
                "nonce too low: address {sender}, tx: {} state: {expected_nonce}",
                tx.nonce
            )));
        }
        let value = from_eth_u256(tx.value);
        let gas_price = from_eth_u256(tx.gas_price.unwrap_or_default());
        let fee = gas_price * U256::from(GAS_USED);
        let balance = state.balances.get(&sender).copied().unwrap_or_default();
        if balance < value + fee {
            return Err(MockError("insufficient funds for gas * price + value".into()));
        }

        let to = tx.to.map(from_h160).unwrap_or_default();
        if to == self.contract {
            self.execute(&mut state, sender, value, &tx.input)?;
        } else {
            *state.balances.entry(to).or_default() += value;
        }

        *state.balances.entry(sender).or_default() -= value + fee;
        *state.nonces.entry(sender).or_default() += 1;
        state.block_number += 1;
        let receipt = ReceiptSummary {
            transaction_hash: hash,
            status: Some(1),
            block_number: Some(state.block_number),
            gas_used: Some(U256::from(GAS_USED)),
        };
        state.receipts.insert(hash, receipt);
        state.submitted.push(tx);
        Ok(hash)
    }

    async fn transaction_receipt(&self, hash: B256) -> Result<Option<ReceiptSummary>, MockError> {
        let mut state = self.state();
        state.receipt_queries += 1;
        if state.failing_receipt_queries > 0 {
            state.failing_receipt_queries -= 1;
            return Err(MockError("connection reset by peer".into()));
        }
        if let Some(&(after, success)) = state.delayed_receipts.get(&hash) {
            if state.receipt_queries < after {
                return Ok(None);
            }
            return Ok(Some(ReceiptSummary {
                transaction_hash: hash,
                status: Some(u64::from(success)),
                block_number: Some(state.block_number),
                gas_used: Some(U256::from(GAS_USED)),
            }));
        }
        Ok(state.receipts.get(&hash).cloned())
    }

    async fn call(&self, to: Address, data: Vec<u8>) -> Result<Vec<u8>, MockError> {
        if to != self.contract || data.len() < 4 {
            return Ok(Vec::new());
        }
        let selector: [u8; 4] = [data[0], data[1], data[2], data[3]];
        let state = self.state();
        if let Some(output) = state.call_overrides.get(&selector) {
            return Ok(output.clone());
        }

        if selector == self.selector(NEXT_ENVELOPE_ID) {
            return Ok(encode(&[Token::Uint((state.envelopes.len() as u64).into())]));
        }
        if selector == self.selector(GET_ENVELOPE) {
            let id = self.envelope_index(&state, &self.decode_args(GET_ENVELOPE, &data)?[0])?;
            return Ok(encode(&[envelope_tokens(&state.envelopes[id])]));
        }
        if selector == self.selector(HAS_USER_CLAIMED) {
            let args = self.decode_args(HAS_USER_CLAIMED, &data)?;
            let id = uint(&args[0]);
            let user = address(&args[1]);
            let claimed = id < U256::from(state.envelopes.len())
                && state.claimed.contains(&(id.as_limbs()[0] as usize, user));
            return Ok(encode(&[Token::Bool(claimed)]));
        }
        Err(revert("unknown function"))
    }
}
