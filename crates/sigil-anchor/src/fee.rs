//! Fee strategies for ledger submissions.
//!
//! The ledger target quotes a suggested fee before each attempt; the
//! strategy shapes that quote. Resolution happens per attempt, so a
//! retry after congestion re-prices against the current quote.

use serde::{Deserialize, Serialize};

/// How to price a ledger submission relative to the target's quote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case", tag = "strategy", content = "value")]
pub enum FeeStrategy {
    /// Use the quoted fee as-is.
    #[default]
    Normal,
    /// Pay 50% over the quote for faster inclusion.
    Aggressive,
    /// Pay 20% under the quote, accepting slower inclusion.
    Economy,
    /// Fixed fee, ignoring the quote entirely.
    Custom(u128),
}

impl FeeStrategy {
    /// Resolve the fee to pay given the target's suggested fee.
    pub fn apply(&self, suggested: u128) -> u128 {
        match self {
            Self::Normal => suggested,
            Self::Aggressive => suggested.saturating_add(suggested / 2),
            Self::Economy => suggested.saturating_sub(suggested / 5),
            Self::Custom(fee) => *fee,
        }
    }
}
