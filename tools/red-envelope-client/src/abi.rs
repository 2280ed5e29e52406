//! RedEnvelope contract ABI: calldata encoding and return-data decoding.
//!
//! The ABI JSON is parsed once. Decoding of `getEnvelope` is a fixed positional mapping from
//! the returned tuple onto [`Envelope`]; component names in the JSON are never consulted.

use alloy_primitives::{Address, B256, U256};
use ethers::abi::{Abi, Function, Token};
use red_envelope_types::{Envelope, EnvelopeKind, ENVELOPE_FIELD_COUNT};

use crate::{
    convert::{from_eth_u256, from_h160, to_eth_u256, to_h160},
    error::{EnvelopeError, Result},
};

/// ABI of the deployed RedEnvelope contract.
pub const RED_ENVELOPE_ABI: &str = include_str!("../abi/RedEnvelope.json");

pub const CREATE_ENVELOPE: &str = "createEnvelope";
pub const CLAIM_ENVELOPE: &str = "claimEnvelope";
pub const REFUND_ENVELOPE: &str = "refundEnvelope";
pub const GET_ENVELOPE: &str = "getEnvelope";
pub const HAS_USER_CLAIMED: &str = "hasUserClaimed";
pub const NEXT_ENVELOPE_ID: &str = "nextEnvelopeId";

const REQUIRED_FUNCTIONS: [&str; 6] = [
    CREATE_ENVELOPE,
    CLAIM_ENVELOPE,
    REFUND_ENVELOPE,
    GET_ENVELOPE,
    HAS_USER_CLAIMED,
    NEXT_ENVELOPE_ID,
];

/// Arguments of `createEnvelope`, in ABI order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CreateArgs {
    pub kind: EnvelopeKind,
    pub token: Address,
    pub total_claims: u32,
    /// Per-claim amount for `GroupFixed`, whole pot otherwise.
    pub amount: U256,
    pub expiry: u64,
    pub room_id_hash: B256,
    pub recipient: Address,
}

#[derive(Clone, Debug)]
pub struct EnvelopeAbi {
    abi: Abi,
}

impl EnvelopeAbi {
    /// Parse an ABI JSON document and check that every function the client calls is present.
    pub fn parse(json: &str) -> Result<Self> {
        let abi: Abi =
            serde_json::from_str(json).map_err(|e| EnvelopeError::InterfaceParse(e.to_string()))?;
        for name in REQUIRED_FUNCTIONS {
            abi.function(name)
                .map_err(|e| EnvelopeError::InterfaceParse(format!("{name}: {e}")))?;
        }
        Ok(Self { abi })
    }

    pub fn embedded() -> Result<Self> {
        Self::parse(RED_ENVELOPE_ABI)
    }

    pub fn function(&self, name: &str) -> std::result::Result<&Function, ethers::abi::Error> {
        self.abi.function(name)
    }

    pub fn encode_create(
        &self,
        args: &CreateArgs,
    ) -> std::result::Result<Vec<u8>, ethers::abi::Error> {
        self.encode(
            CREATE_ENVELOPE,
            &[
                Token::Uint(args.kind.ordinal().into()),
                Token::Address(to_h160(args.token)),
                Token::Uint(args.total_claims.into()),
                Token::Uint(to_eth_u256(args.amount)),
                Token::Uint(args.expiry.into()),
                Token::FixedBytes(args.room_id_hash.to_vec()),
                Token::Address(to_h160(args.recipient)),
            ],
        )
    }

    pub fn encode_claim(
        &self,
        envelope_id: U256,
    ) -> std::result::Result<Vec<u8>, ethers::abi::Error> {
        self.encode(CLAIM_ENVELOPE, &[Token::Uint(to_eth_u256(envelope_id))])
    }

    pub fn encode_refund(
        &self,
        envelope_id: U256,
    ) -> std::result::Result<Vec<u8>, ethers::abi::Error> {
        self.encode(REFUND_ENVELOPE, &[Token::Uint(to_eth_u256(envelope_id))])
    }

    pub fn encode_get_envelope(
        &self,
        envelope_id: U256,
    ) -> std::result::Result<Vec<u8>, ethers::abi::Error> {
        self.encode(GET_ENVELOPE, &[Token::Uint(to_eth_u256(envelope_id))])
    }

    pub fn encode_has_claimed(
        &self,
        envelope_id: U256,
        user: Address,
    ) -> std::result::Result<Vec<u8>, ethers::abi::Error> {
        self.encode(
            HAS_USER_CLAIMED,
            &[Token::Uint(to_eth_u256(envelope_id)), Token::Address(to_h160(user))],
        )
    }

    pub fn encode_next_id(&self) -> std::result::Result<Vec<u8>, ethers::abi::Error> {
        self.encode(NEXT_ENVELOPE_ID, &[])
    }

    fn encode(
        &self,
        name: &str,
        args: &[Token],
    ) -> std::result::Result<Vec<u8>, ethers::abi::Error> {
        Ok(self.abi.function(name)?.encode_input(args)?)
    }

    fn decode_output(&self, name: &str, data: &[u8]) -> Result<Vec<Token>> {
        self.abi
            .function(name)
            .and_then(|f| f.decode_output(data))
            .map_err(|e| EnvelopeError::Decode(format!("{name}: {e}")))
    }

    pub fn decode_envelope(&self, data: &[u8]) -> Result<Envelope> {
        envelope_from_tokens(self.decode_output(GET_ENVELOPE, data)?)
    }

    pub fn decode_has_claimed(&self, data: &[u8]) -> Result<bool> {
        match single(self.decode_output(HAS_USER_CLAIMED, data)?, HAS_USER_CLAIMED)? {
            Token::Bool(claimed) => Ok(claimed),
            other => Err(mismatch(HAS_USER_CLAIMED, "bool", &other)),
        }
    }

    pub fn decode_next_id(&self, data: &[u8]) -> Result<U256> {
        let token = single(self.decode_output(NEXT_ENVELOPE_ID, data)?, NEXT_ENVELOPE_ID)?;
        uint(token, NEXT_ENVELOPE_ID)
    }
}

/// Map `getEnvelope` output onto [`Envelope`] by position.
///
/// Accepts a single tuple value (the struct return) or the eleven values flattened.
pub fn envelope_from_tokens(tokens: Vec<Token>) -> Result<Envelope> {
    let fields = match <[Token; 1]>::try_from(tokens) {
        Ok([Token::Tuple(inner)]) => inner,
        Ok([other]) => vec![other],
        Err(flat) => flat,
    };
    let fields: [Token; ENVELOPE_FIELD_COUNT] = fields.try_into().map_err(|rest: Vec<Token>| {
        EnvelopeError::Decode(format!(
            "envelope has {} fields, want {ENVELOPE_FIELD_COUNT}",
            rest.len()
        ))
    })?;
    let [
        creator,
        token,
        kind,
        amount_per_claim,
        remaining_amount,
        total_claims,
        remaining_claims,
        claim_index,
        expiry,
        room_id_hash,
        recipient,
    ] = fields;

    let kind_ordinal: u8 = small_uint(kind, "kind")?;
    let kind = EnvelopeKind::try_from(kind_ordinal)
        .map_err(|o| EnvelopeError::Decode(format!("kind: unknown ordinal {o}")))?;

    Ok(Envelope {
        creator: address(creator, "creator")?,
        token: address(token, "token")?,
        kind,
        amount_per_claim: uint(amount_per_claim, "amountPerClaim")?,
        remaining_amount: uint(remaining_amount, "remainingAmount")?,
        total_claims: small_uint(total_claims, "totalClaims")?,
        remaining_claims: small_uint(remaining_claims, "remainingClaims")?,
        claim_index: small_uint(claim_index, "claimIndex")?,
        expiry: small_uint(expiry, "expiry")?,
        room_id_hash: bytes32(room_id_hash, "roomIdHash")?,
        recipient: address(recipient, "recipient")?,
    })
}

fn single(tokens: Vec<Token>, what: &str) -> Result<Token> {
    let [token]: [Token; 1] = tokens.try_into().map_err(|rest: Vec<Token>| {
        EnvelopeError::Decode(format!("{what}: {} return values, want 1", rest.len()))
    })?;
    Ok(token)
}

fn mismatch(field: &str, want: &str, got: &Token) -> EnvelopeError {
    EnvelopeError::Decode(format!("{field}: want {want}, got {got:?}"))
}

fn address(token: Token, field: &str) -> Result<Address> {
    match token {
        Token::Address(a) => Ok(from_h160(a)),
        other => Err(mismatch(field, "address", &other)),
    }
}

fn uint(token: Token, field: &str) -> Result<U256> {
    match token {
        Token::Uint(v) => Ok(from_eth_u256(v)),
        other => Err(mismatch(field, "uint", &other)),
    }
}

fn small_uint<T: TryFrom<u64>>(token: Token, field: &str) -> Result<T> {
    let value = match token {
        Token::Uint(v) => v,
        other => return Err(mismatch(field, "uint", &other)),
    };
    if value.bits() > 64 {
        return Err(EnvelopeError::Decode(format!("{field}: {value} out of range")));
    }
    T::try_from(value.low_u64())
        .map_err(|_| EnvelopeError::Decode(format!("{field}: {value} out of range")))
}

fn bytes32(token: Token, field: &str) -> Result<B256> {
    match token {
        Token::FixedBytes(b) if b.len() == 32 => Ok(B256::from_slice(&b)),
        other => Err(mismatch(field, "bytes32", &other)),
    }
}
