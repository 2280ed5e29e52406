use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

/// Envelope distribution mode.
///
/// The discriminants are the contract's enum ordinals. The ABI encodes the kind as a bare
/// `uint8`, so a wrong ordinal here silently selects a different on-chain behaviour.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum EnvelopeKind {
    /// One designated recipient receives the whole net pot.
    DirectFixed = 0,
    /// Every claimer receives the same amount.
    GroupFixed = 1,
    /// The net pot is split randomly on-chain between claimers.
    GroupRandom = 2,
}

impl EnvelopeKind {
    pub const ALL: [EnvelopeKind; 3] = [
        EnvelopeKind::DirectFixed,
        EnvelopeKind::GroupFixed,
        EnvelopeKind::GroupRandom,
    ];

    pub fn ordinal(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        match self {
            EnvelopeKind::DirectFixed => "DIRECT_FIXED",
            EnvelopeKind::GroupFixed => "GROUP_FIXED",
            EnvelopeKind::GroupRandom => "GROUP_RANDOM",
        }
    }
}

impl TryFrom<u8> for EnvelopeKind {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        use EnvelopeKind::*;
        let kind = match value {
            0 => DirectFixed,
            1 => GroupFixed,
            2 => GroupRandom,
            other => return Err(other),
        };
        Ok(kind)
    }
}

impl fmt::Display for EnvelopeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Accepts the display name (case-insensitive, `-` or `_`) or the ordinal.
impl FromStr for EnvelopeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Ok(ordinal) = trimmed.parse::<u8>() {
            return EnvelopeKind::try_from(ordinal)
                .map_err(|o| format!("unknown envelope kind ordinal {o}"));
        }
        let normalised = trimmed.to_ascii_uppercase().replace('-', "_");
        EnvelopeKind::ALL
            .into_iter()
            .find(|kind| kind.name() == normalised)
            .ok_or_else(|| {
                format!(
                    "unknown envelope kind `{s}` \
                     (expected DIRECT_FIXED, GROUP_FIXED or GROUP_RANDOM)"
                )
            })
    }
}
