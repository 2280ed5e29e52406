//! Room restriction commitments.

use alloy_primitives::B256;
use sha3::{Digest, Keccak256};

/// No room restriction: anyone may claim.
pub const EMPTY_ROOM_ID_HASH: B256 = B256::ZERO;

/// Commitment stored as `roomIdHash`: Keccak-256 (not FIPS SHA3-256) of the raw UTF-8 bytes,
/// with no padding or length prefix. Must match the contract's `keccak256(bytes(roomId))`.
pub fn room_id_hash(room_id: &str) -> B256 {
    let mut h = Keccak256::new();
    h.update(room_id.as_bytes());
    B256::from_slice(&h.finalize())
}
