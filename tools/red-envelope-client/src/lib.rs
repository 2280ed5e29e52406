//! Client for the RedEnvelope escrow contract over Ethereum JSON-RPC.
//!
//! [`EnvelopeService`] binds a node, a local signing key and the contract ABI. Writes are
//! signed locally as legacy EIP-155 transactions and return as soon as the node accepts them;
//! use [`wait_for_receipt`] to confirm.

pub mod abi;
pub mod chain;
pub mod confirm;
mod convert;
pub mod error;
pub mod service;
pub mod signer;
pub mod transfer;

#[cfg(test)]
mod mock;

pub use abi::{CreateArgs, EnvelopeAbi, RED_ENVELOPE_ABI};
pub use chain::{connect, BlockSummary, ChainClient, ReceiptSummary};
pub use confirm::{wait_for_receipt, PollConfig};
pub use error::{EnvelopeError, Result};
pub use service::{
    parse_address, CreateQuote, EnvelopeService, CLAIM_GAS_LIMIT, CREATE_GAS_LIMIT,
    REFUND_GAS_LIMIT,
};
pub use signer::{parse_signing_key, SentTransaction, TxParams, TxSigner};
pub use transfer::{send_native, TRANSFER_GAS_LIMIT};

pub use red_envelope_types::{
    format_ether, parse_ether, room_id_hash, Envelope, EnvelopeKind, FeeBreakdown,
    EMPTY_ROOM_ID_HASH,
};
