//! Core identifiers and small value types shared across the engine

use serde::{Deserialize, Serialize};
use std::fmt;

/// Player identifier as issued by the ledger
pub type PlayerId = u64;

/// Identifier of a predefined card in the catalog
pub type CardId = u32;

/// Stake tier, also the per-round buy-in, in ledger units
pub type Stake = u64;

/// Ledger amount in whole units
pub type Amount = u64;

/// Highest number that can appear on a card or be drawn
pub const MAX_NUMBER: u8 = 75;

/// Basis-point denominator used for payout ratios
pub const BPS_DENOMINATOR: u64 = 10_000;

/// Round lifecycle status of a lobby
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum LobbyStatus {
    Waiting,
    Countdown,
    InProgress,
}

impl LobbyStatus {
    /// Whether the lifecycle permits moving from `self` to `next`.
    ///
    /// The only cycle is Waiting -> Countdown -> InProgress -> Waiting, plus
    /// the countdown abort back to Waiting when too few cards are selected.
    pub fn can_transition_to(self, next: LobbyStatus) -> bool {
        matches!(
            (self, next),
            (LobbyStatus::Waiting, LobbyStatus::Countdown)
                | (LobbyStatus::Countdown, LobbyStatus::InProgress)
                | (LobbyStatus::Countdown, LobbyStatus::Waiting)
                | (LobbyStatus::InProgress, LobbyStatus::Waiting)
        )
    }

    /// Card selection is open before the draw starts
    pub fn accepts_selection(self) -> bool {
        matches!(self, LobbyStatus::Waiting | LobbyStatus::Countdown)
    }
}

impl fmt::Display for LobbyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LobbyStatus::Waiting => write!(f, "waiting"),
            LobbyStatus::Countdown => write!(f, "countdown"),
            LobbyStatus::InProgress => write!(f, "in_progress"),
        }
    }
}

/// Handle of a round record persisted in the round store
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct RoundHandle(pub u64);

impl fmt::Display for RoundHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "round-{}", self.0)
    }
}

/// Winner of a round
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Winner {
    pub player_id: PlayerId,
    pub card_id: CardId,
    /// Display name, filled in asynchronously after the claim settles
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Final outcome written to the round record on finish
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoundOutcome {
    pub player_id: PlayerId,
    pub card_id: CardId,
    pub payout: Amount,
}

/// Payout for a pot of `cards` paid cards at `stake`, rounded down
pub fn round_pot(stake: Stake, cards: usize, payout_bps: u32) -> Amount {
    stake.saturating_mul(cards as u64).saturating_mul(payout_bps as u64) / BPS_DENOMINATOR
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifecycle_edges() {
        use LobbyStatus::*;
        assert!(Waiting.can_transition_to(Countdown));
        assert!(Countdown.can_transition_to(InProgress));
        assert!(Countdown.can_transition_to(Waiting));
        assert!(InProgress.can_transition_to(Waiting));

        assert!(!Waiting.can_transition_to(InProgress));
        assert!(!InProgress.can_transition_to(Countdown));
        assert!(!Waiting.can_transition_to(Waiting));
    }

    #[test]
    fn test_round_pot() {
        assert_eq!(round_pot(10, 3, 8_000), 24);
        assert_eq!(round_pot(20, 0, 8_000), 0);
        // 50 * 1 * 0.8
        assert_eq!(round_pot(50, 1, 8_000), 40);
        // rounds down, remainder stays with the house
        assert_eq!(round_pot(1, 1, 8_000), 0);
    }

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_string(&LobbyStatus::InProgress).unwrap();
        assert_eq!(json, "\"in_progress\"");
    }
}
