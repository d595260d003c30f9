//! Lobby snapshots and server-to-client messages

use super::state::RoundState;
use crate::catalog::{Card, CardCatalog, GRID_SIZE};
use crate::common::types::{round_pot, Amount, CardId, LobbyStatus, PlayerId, Stake, Winner};
use serde::Serialize;
use std::collections::BTreeMap;

/// A catalog card as shown to clients
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CardView {
    pub card_id: CardId,
    #[serde(rename = "B")]
    pub b: [u8; GRID_SIZE],
    #[serde(rename = "I")]
    pub i: [u8; GRID_SIZE],
    #[serde(rename = "N")]
    pub n: [u8; GRID_SIZE],
    #[serde(rename = "G")]
    pub g: [u8; GRID_SIZE],
    #[serde(rename = "O")]
    pub o: [u8; GRID_SIZE],
    pub taken: bool,
}

impl CardView {
    pub fn new(card: &Card, taken: bool) -> Self {
        let [b, i, n, g, o] = *card.columns();
        Self {
            card_id: card.id(),
            b,
            i,
            n,
            g,
            o,
            taken,
        }
    }
}

/// Point-in-time view of one lobby
#[derive(Debug, Clone, Serialize)]
pub struct LobbySnapshot {
    pub stake: Stake,
    pub status: LobbyStatus,
    pub countdown: u32,
    pub numbers_drawn: Vec<u8>,
    pub cards: Vec<CardView>,
    /// Card held by each player
    pub selected: BTreeMap<PlayerId, CardId>,
    pub winner: Option<Winner>,
    pub winner_card: Option<CardView>,
    /// Ledger balance of each attached player
    pub balances: BTreeMap<PlayerId, Amount>,
    /// Fixed pot while a round runs, projected pot otherwise
    pub pot: Amount,
    pub players: usize,
}

impl LobbySnapshot {
    /// Copy the lobby state; balances are filled in later, outside the lock
    pub(crate) fn capture(stake: Stake, payout_bps: u32, state: &RoundState, catalog: &CardCatalog) -> Self {
        let cards = catalog
            .all_cards()
            .iter()
            .map(|card| CardView::new(card, state.is_taken(card.id())))
            .collect();
        let winner_card = state
            .winner
            .as_ref()
            .and_then(|w| catalog.lookup(w.card_id))
            .map(|card| CardView::new(&card, true));
        let pot = state
            .pot
            .unwrap_or_else(|| round_pot(stake, state.selection_count(), payout_bps));

        Self {
            stake,
            status: state.status,
            countdown: state.countdown,
            numbers_drawn: state.drawn.clone(),
            cards,
            selected: state.selections().collect(),
            winner: state.winner.clone(),
            winner_card,
            balances: BTreeMap::new(),
            pot,
            players: state.sessions.len(),
        }
    }
}

/// Compact lobby view served by the HTTP API
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct LobbySummary {
    pub stake: Stake,
    pub status: LobbyStatus,
    pub countdown: u32,
    pub players: usize,
    pub selected_cards: usize,
    pub numbers_drawn: usize,
    pub pot: Amount,
    pub round_number: u64,
}

impl LobbySummary {
    pub(crate) fn capture(stake: Stake, payout_bps: u32, state: &RoundState) -> Self {
        Self {
            stake,
            status: state.status,
            countdown: state.countdown,
            players: state.sessions.len(),
            selected_cards: state.selection_count(),
            numbers_drawn: state.drawn.len(),
            pot: state
                .pot
                .unwrap_or_else(|| round_pot(stake, state.selection_count(), payout_bps)),
            round_number: state.round_number,
        }
    }
}

/// Messages pushed to clients
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    State(LobbySnapshot),
    Notification { message: String },
}

impl ServerMessage {
    pub fn notification(message: impl Into<String>) -> Self {
        ServerMessage::Notification {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn catalog() -> CardCatalog {
        let cards = (1..=3)
            .map(|id| {
                let mut columns = [[0u8; GRID_SIZE]; GRID_SIZE];
                for (col, column) in columns.iter_mut().enumerate() {
                    for (row, cell) in column.iter_mut().enumerate() {
                        *cell = (col * 15 + row + id as usize) as u8;
                    }
                }
                Card::new(id, columns)
            })
            .collect();
        CardCatalog::from_cards(cards).unwrap()
    }

    #[test]
    fn test_snapshot_marks_taken_cards() {
        let catalog = catalog();
        let mut state = RoundState::new(30);
        state.select(7, 2).unwrap();

        let snapshot = LobbySnapshot::capture(10, 8_000, &state, &catalog);
        assert_eq!(snapshot.cards.len(), 3);
        assert!(snapshot.cards.iter().find(|c| c.card_id == 2).unwrap().taken);
        assert!(!snapshot.cards.iter().find(|c| c.card_id == 1).unwrap().taken);
        assert_eq!(snapshot.selected.get(&7), Some(&2));
        // projected: 10 * 1 * 0.8
        assert_eq!(snapshot.pot, 8);
    }

    #[test]
    fn test_state_message_shape() {
        let catalog = catalog();
        let state = RoundState::new(30);
        let message = ServerMessage::State(LobbySnapshot::capture(20, 8_000, &state, &catalog));

        let json: Value = serde_json::to_value(&message).unwrap();
        assert_eq!(json["type"], "state");
        assert_eq!(json["status"], "waiting");
        assert_eq!(json["countdown"], 30);
        assert_eq!(json["cards"][0]["B"][0], 1);
        assert_eq!(json["cards"][0]["taken"], false);
        assert!(json["winner"].is_null());
    }

    #[test]
    fn test_notification_message_shape() {
        let json = serde_json::to_value(ServerMessage::notification("hello")).unwrap();
        assert_eq!(json, serde_json::json!({"type": "notification", "message": "hello"}));
    }
}
