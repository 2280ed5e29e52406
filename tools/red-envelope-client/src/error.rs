use thiserror::Error;

/// Errors surfaced by the chain facade, the signer and the envelope service.
///
/// Node and contract messages are carried verbatim. Every on-chain business-rule violation
/// (double claim, refund before expiry, non-creator refund, room mismatch, insufficient escrow)
/// arrives as [`EnvelopeError::Submission`].
#[derive(Debug, Error)]
pub enum EnvelopeError {
    #[error("failed to connect to ethereum node: {0}")]
    Connection(String),

    #[error("failed to load private key: {0}")]
    Key(String),

    #[error("invalid address `{0}`")]
    InvalidAddress(String),

    #[error("failed to get chain ID: {0}")]
    ChainQuery(String),

    #[error("failed to parse contract ABI: {0}")]
    InterfaceParse(String),

    #[error("failed to get nonce: {0}")]
    Nonce(String),

    #[error("failed to get gas price: {0}")]
    GasPrice(String),

    #[error("failed to sign transaction: {0}")]
    Signing(String),

    #[error("transaction rejected: {0}")]
    Submission(String),

    #[error("contract query failed: {0}")]
    Query(String),

    #[error("unexpected return data: {0}")]
    Decode(String),

    #[error("transaction not mined after {attempts} attempts")]
    Timeout { attempts: u32 },

    #[error("escrow amount overflows uint256")]
    AmountOverflow,

    #[error("fee of {0} bps exceeds 100%")]
    InvalidFee(u16),
}

pub type Result<T> = std::result::Result<T, EnvelopeError>;
