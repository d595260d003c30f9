//! Mutable round state of one lobby
//!
//! Everything here runs under the lobby's lock and never awaits. The
//! methods keep the selection maps mutually consistent and enforce the
//! lifecycle edges of [`LobbyStatus`].

use crate::common::types::{Amount, CardId, LobbyStatus, PlayerId, RoundHandle, Winner};
use crate::errors::LobbyError;
use crate::session::SessionHandle;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::warn;

/// One-shot signals scoped to a single round
#[derive(Default)]
pub(crate) struct RoundSignals {
    /// Stops the draw task
    cancel: Option<oneshot::Sender<()>>,
    /// Wakes the orchestrator once the round has been reset
    done: Option<oneshot::Sender<()>>,
}

/// Receiving halves handed to the draw task and the orchestrator
pub(crate) struct ArmedRound {
    pub cancel: oneshot::Receiver<()>,
    pub done: oneshot::Receiver<()>,
}

/// What a claim needs to evaluate outside the lock
#[derive(Debug, Clone)]
pub(crate) struct ClaimTicket {
    pub card_id: CardId,
    pub drawn: Vec<u8>,
    pub epoch: u64,
}

/// Captured when a verified claim is recorded
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct WinRecord {
    pub payout: Amount,
    pub selected_cards: usize,
    pub round_number: u64,
}

/// Everything the reset hands over for work outside the lock
pub(crate) struct FinishedRound {
    pub handle: Option<RoundHandle>,
    pub round_number: u64,
    pub winner: Option<Winner>,
    pub payout: Amount,
    pub paid: Vec<PlayerId>,
    pub done: Option<oneshot::Sender<()>>,
}

pub(crate) struct RoundState {
    pub status: LobbyStatus,
    pub countdown: u32,
    pub sessions: HashMap<PlayerId, Arc<SessionHandle>>,
    selections: HashMap<PlayerId, CardId>,
    taken: HashMap<CardId, PlayerId>,
    pub drawn: Vec<u8>,
    checked: HashSet<PlayerId>,
    pub round: Option<RoundHandle>,
    pub round_number: u64,
    pub winner: Option<Winner>,
    /// Fixed once stakes are collected; `None` until then
    pub pot: Option<Amount>,
    /// Players whose stake was debited this round
    pub paid: Vec<PlayerId>,
    /// Bumped at every round start; stale tasks compare against it
    pub epoch: u64,
    signals: RoundSignals,
}

impl RoundState {
    pub fn new(countdown: u32) -> Self {
        Self {
            status: LobbyStatus::Waiting,
            countdown,
            sessions: HashMap::new(),
            selections: HashMap::new(),
            taken: HashMap::new(),
            drawn: Vec::new(),
            checked: HashSet::new(),
            round: None,
            round_number: 0,
            winner: None,
            pot: None,
            paid: Vec::new(),
            epoch: 0,
            signals: RoundSignals::default(),
        }
    }

    /// Move to `next` if the lifecycle allows it
    pub fn transition(&mut self, next: LobbyStatus) -> bool {
        if !self.status.can_transition_to(next) {
            warn!(from = %self.status, to = %next, "Rejected lobby status transition");
            return false;
        }
        self.status = next;
        true
    }

    /// Record `player` as holding `card_id`.
    ///
    /// A player holds at most one card: picking another one releases the
    /// previous card, which is returned.
    pub fn select(&mut self, player_id: PlayerId, card_id: CardId) -> Result<Option<CardId>, LobbyError> {
        if !self.status.accepts_selection() {
            return Err(LobbyError::SelectionClosed);
        }
        match self.taken.get(&card_id) {
            Some(&owner) if owner == player_id => return Ok(None),
            Some(_) => return Err(LobbyError::CardTaken(card_id)),
            None => {}
        }

        let previous = self.release(player_id);
        self.selections.insert(player_id, card_id);
        self.taken.insert(card_id, player_id);
        Ok(previous)
    }

    /// Drop the player's card, if any
    pub fn release(&mut self, player_id: PlayerId) -> Option<CardId> {
        let card_id = self.selections.remove(&player_id)?;
        self.taken.remove(&card_id);
        Some(card_id)
    }

    pub fn selected_card(&self, player_id: PlayerId) -> Option<CardId> {
        self.selections.get(&player_id).copied()
    }

    pub fn is_taken(&self, card_id: CardId) -> bool {
        self.taken.contains_key(&card_id)
    }

    pub fn selection_count(&self) -> usize {
        self.selections.len()
    }

    pub fn selections(&self) -> impl Iterator<Item = (PlayerId, CardId)> + '_ {
        self.selections.iter().map(|(&p, &c)| (p, c))
    }

    pub fn has_checked(&self, player_id: PlayerId) -> bool {
        self.checked.contains(&player_id)
    }

    /// Enter the draw phase of a new round and arm its signals
    pub fn begin_round(&mut self) -> Option<ArmedRound> {
        if !self.transition(LobbyStatus::InProgress) {
            return None;
        }
        self.drawn.clear();
        self.checked.clear();
        self.winner = None;
        self.pot = None;
        self.paid.clear();
        self.round = None;
        self.epoch += 1;

        let (cancel_tx, cancel_rx) = oneshot::channel();
        let (done_tx, done_rx) = oneshot::channel();
        self.signals = RoundSignals {
            cancel: Some(cancel_tx),
            done: Some(done_tx),
        };
        Some(ArmedRound {
            cancel: cancel_rx,
            done: done_rx,
        })
    }

    /// Append a drawn number; duplicates and out-of-range values are ignored
    pub fn push_number(&mut self, number: u8) -> bool {
        if number == 0 || number > crate::common::types::MAX_NUMBER || self.drawn.contains(&number) {
            return false;
        }
        self.drawn.push(number);
        true
    }

    /// Gate a claim and consume the player's single attempt for the round
    pub fn begin_claim(&mut self, player_id: PlayerId) -> Result<ClaimTicket, LobbyError> {
        if self.status != LobbyStatus::InProgress || self.pot.is_none() {
            return Err(LobbyError::RoundNotInProgress);
        }
        if self.checked.contains(&player_id) {
            return Err(LobbyError::AlreadyClaimed(player_id));
        }
        let card_id = self
            .selected_card(player_id)
            .ok_or(LobbyError::NoCardSelected(player_id))?;
        if self.winner.is_some() {
            return Err(LobbyError::RoundAlreadyWon);
        }

        self.checked.insert(player_id);
        Ok(ClaimTicket {
            card_id,
            drawn: self.drawn.clone(),
            epoch: self.epoch,
        })
    }

    /// Record a verified claim as the round's winner and stop the draw
    pub fn record_win(&mut self, player_id: PlayerId, card_id: CardId, epoch: u64) -> Result<WinRecord, LobbyError> {
        if self.epoch != epoch || self.status != LobbyStatus::InProgress {
            return Err(LobbyError::RoundNotInProgress);
        }
        if self.winner.is_some() {
            return Err(LobbyError::RoundAlreadyWon);
        }

        if let Some(cancel) = self.signals.cancel.take() {
            let _ = cancel.send(());
        }
        self.winner = Some(Winner {
            player_id,
            card_id,
            name: None,
        });
        Ok(WinRecord {
            payout: self.pot.unwrap_or(0),
            selected_cards: self.selection_count(),
            round_number: self.round_number,
        })
    }

    /// Single reset point back to WAITING.
    ///
    /// Returns `None` when the round already ended, so only one caller ever
    /// receives the round-done signal.
    pub fn finish_round(&mut self, countdown: u32) -> Option<FinishedRound> {
        if self.status != LobbyStatus::InProgress || !self.transition(LobbyStatus::Waiting) {
            return None;
        }
        let finished = FinishedRound {
            handle: self.round.take(),
            round_number: self.round_number,
            winner: self.winner.take(),
            payout: self.pot.take().unwrap_or(0),
            paid: std::mem::take(&mut self.paid),
            done: self.signals.done.take(),
        };
        self.signals.cancel = None;
        self.drawn.clear();
        self.checked.clear();
        self.selections.clear();
        self.taken.clear();
        self.countdown = countdown;
        Some(finished)
    }

    /// Force the lobby back to an empty WAITING state, whatever it was doing
    pub fn force_reset(&mut self, countdown: u32) -> Option<RoundHandle> {
        self.status = LobbyStatus::Waiting;
        self.epoch += 1;
        self.signals = RoundSignals::default();
        self.drawn.clear();
        self.checked.clear();
        self.selections.clear();
        self.taken.clear();
        self.winner = None;
        self.pot = None;
        self.paid.clear();
        self.countdown = countdown;
        self.round.take()
    }

    #[cfg(test)]
    pub fn assert_consistent(&self) {
        assert_eq!(self.selections.len(), self.taken.len());
        for (player, card) in &self.selections {
            assert_eq!(self.taken.get(card), Some(player));
        }
        let unique: HashSet<_> = self.drawn.iter().collect();
        assert_eq!(unique.len(), self.drawn.len());
    }
}
