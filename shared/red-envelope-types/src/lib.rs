//! Shared types for the RedEnvelope contract client.
//!
//! Everything here is pure: no RPC, no signing. The client and the CLI both build on these
//! definitions so the positional ABI layout and the fee arithmetic live in one place.

pub mod envelope;
pub mod fees;
pub mod kind;
pub mod room;
pub mod units;

pub use envelope::{Envelope, ENVELOPE_FIELD_COUNT};
pub use fees::{gross_pot, FeeBreakdown, BPS_DENOMINATOR, DEFAULT_FEE_BPS};
pub use kind::EnvelopeKind;
pub use room::{room_id_hash, EMPTY_ROOM_ID_HASH};
pub use units::{format_ether, parse_ether, WEI_PER_ETHER};
