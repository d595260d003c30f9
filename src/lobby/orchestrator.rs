//! Round lifecycle: countdown, stake collection, draws and reset
//!
//! One orchestrator loop runs per lobby. It starts a round and then blocks
//! on the round's done signal, which `end_round` sends exactly once after
//! the reset has been broadcast, so rounds of one lobby never overlap.

use super::state::ArmedRound;
use super::Lobby;
use crate::common::types::{round_pot, LobbyStatus, PlayerId, RoundOutcome};
use crate::config::NoWinnerPolicy;
use crate::errors::LedgerError;
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

/// Why a round is being reset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RoundEnd {
    /// A verified claim won, after the announcement grace delay
    Claimed,
    /// Every number was drawn
    Exhausted,
    /// Nobody paid the stake
    NoPlayers,
}

/// A round that has started drawing (or already ended)
struct RunningRound {
    done: oneshot::Receiver<()>,
    draw: Option<JoinHandle<()>>,
}

impl Lobby {
    /// Run rounds back to back, forever
    pub async fn run(self: Arc<Self>) {
        info!(stake = self.stake, "🎱 Lobby orchestrator started");
        loop {
            self.run_cycle().await;
        }
    }

    /// One WAITING -> COUNTDOWN -> IN_PROGRESS -> WAITING cycle
    async fn run_cycle(self: &Arc<Self>) {
        if !self.run_countdown().await {
            sleep(self.ctx.config.tick()).await;
            return;
        }

        let Some(round) = self.start_round().await else {
            return;
        };

        if let Some(draw) = round.draw {
            if let Err(e) = draw.await {
                if e.is_panic() {
                    error!(stake = self.stake, "Draw task panicked, resetting lobby");
                    self.recover().await;
                    return;
                }
            }
        }
        if round.done.await.is_err() {
            debug!(stake = self.stake, "Round ended without done signal");
        }
    }

    /// Count down and decide whether enough cards are in play.
    ///
    /// Returns true with the lobby still in COUNTDOWN when a round may start.
    async fn run_countdown(&self) -> bool {
        let countdown = self.ctx.config.countdown_secs;
        {
            let mut state = self.state.write().await;
            if !state.transition(LobbyStatus::Countdown) {
                return false;
            }
            state.countdown = countdown;
        }
        debug!(stake = self.stake, countdown, "Countdown started");
        self.broadcast_state().await;

        for remaining in (0..countdown).rev() {
            sleep(self.ctx.config.tick()).await;
            self.state.write().await.countdown = remaining;
            self.broadcast_state().await;
        }

        let selected = {
            let mut state = self.state.write().await;
            let selected = state.selection_count();
            if selected < self.ctx.config.min_cards {
                state.transition(LobbyStatus::Waiting);
                state.countdown = countdown;
                Some(selected)
            } else {
                None
            }
        };

        match selected {
            Some(selected) => {
                self.ctx.metrics.record_round_aborted();
                info!(
                    stake = self.stake,
                    selected,
                    required = self.ctx.config.min_cards,
                    "Not enough cards, countdown restarts"
                );
                self.broadcast_state().await;
                false
            }
            None => true,
        }
    }

    /// Collect stakes, fix the pot, persist the round and launch the draw
    async fn start_round(self: &Arc<Self>) -> Option<RunningRound> {
        let (ArmedRound { cancel, done }, epoch, selections) = {
            let mut state = self.state.write().await;
            let armed = state.begin_round()?;
            let selections: Vec<_> = state.selections().collect();
            (armed, state.epoch, selections)
        };

        let mut paid = Vec::with_capacity(selections.len());
        for (player_id, card_id) in selections {
            match self.ctx.ledger.debit(player_id, self.stake).await {
                Ok(balance) => {
                    debug!(stake = self.stake, player_id, card_id, balance, "Stake collected");
                    paid.push(player_id);
                }
                Err(e) => {
                    warn!(stake = self.stake, player_id, card_id, "Stake not collected, card withdrawn: {}", e);
                    self.state.write().await.release(player_id);
                    let message = match e {
                        LedgerError::InsufficientFunds { .. } => format!(
                            "Insufficient balance for stake {}. Card {} was removed.",
                            self.stake, card_id
                        ),
                        _ => format!("Stake could not be collected. Card {} was removed.", card_id),
                    };
                    self.notify(player_id, message).await;
                }
            }
        }

        let round_number = match self.ctx.rounds.last_round_number(self.stake).await {
            Ok(last) => last + 1,
            Err(e) => {
                warn!(stake = self.stake, "Failed to read last round number: {}", e);
                self.state.read().await.round_number + 1
            }
        };
        let handle = match self.ctx.rounds.create_round(self.stake, round_number).await {
            Ok(handle) => Some(handle),
            Err(e) => {
                error!(stake = self.stake, round = round_number, "Failed to persist round: {}", e);
                None
            }
        };

        let pot = round_pot(self.stake, paid.len(), self.ctx.config.payout_bps);
        let players = paid.len();
        {
            let mut state = self.state.write().await;
            if state.epoch != epoch {
                return None;
            }
            state.pot = Some(pot);
            state.paid = paid;
            state.round = handle;
            state.round_number = state.round_number.max(round_number);
        }
        self.ctx.metrics.record_round_started();

        if players == 0 {
            info!(stake = self.stake, round = round_number, "No stakes collected, round ends");
            self.end_round(epoch, RoundEnd::NoPlayers).await;
            return Some(RunningRound { done, draw: None });
        }

        info!(stake = self.stake, round = round_number, players, pot, "🚀 Round started");
        self.broadcast_state().await;

        let sequence = self.ctx.draw.sequence();
        let lobby = Arc::clone(self);
        let draw = tokio::spawn(async move { lobby.run_draw(epoch, sequence, cancel).await });

        Some(RunningRound {
            done,
            draw: Some(draw),
        })
    }

    /// Reveal numbers on the draw interval until cancelled or exhausted
    async fn run_draw(self: Arc<Self>, epoch: u64, sequence: Vec<u8>, mut cancel: oneshot::Receiver<()>) {
        let interval = self.ctx.config.draw_interval();
        for number in sequence {
            tokio::select! {
                biased;
                _ = &mut cancel => {
                    debug!(stake = self.stake, "Draw cancelled");
                    return;
                }
                _ = sleep(interval) => {}
            }

            let update = {
                let mut state = self.state.write().await;
                if state.epoch != epoch || state.status != LobbyStatus::InProgress || state.winner.is_some() {
                    return;
                }
                if !state.push_number(number) {
                    continue;
                }
                (state.round, state.drawn.clone())
            };
            self.ctx.metrics.record_number_drawn();
            debug!(stake = self.stake, number, drawn = update.1.len(), "Number drawn");

            if let (Some(handle), drawn) = update {
                if let Err(e) = self.ctx.rounds.update_drawn_numbers(handle, &drawn).await {
                    warn!(stake = self.stake, round = %handle, "Failed to persist drawn numbers: {}", e);
                }
            }
            self.broadcast_state().await;
        }

        info!(stake = self.stake, "All numbers drawn");
        self.end_round(epoch, RoundEnd::Exhausted).await;
    }

    /// Reset the lobby to WAITING and release the orchestrator.
    ///
    /// Only the first call for a round has any effect. Exhaustion defers to
    /// a pending claim, whose grace timer ends the round instead.
    pub(crate) async fn end_round(&self, epoch: u64, reason: RoundEnd) {
        let finished = {
            let mut state = self.state.write().await;
            if state.epoch != epoch {
                return;
            }
            if reason == RoundEnd::Exhausted && state.winner.is_some() {
                return;
            }
            match state.finish_round(self.ctx.config.countdown_secs) {
                Some(finished) => finished,
                None => return,
            }
        };

        if finished.winner.is_none() {
            self.settle_no_winner(&finished.paid).await;
        }

        let outcome = finished.winner.as_ref().map(|w| RoundOutcome {
            player_id: w.player_id,
            card_id: w.card_id,
            payout: finished.payout,
        });
        if let Some(handle) = finished.handle {
            if let Err(e) = self.ctx.rounds.finish_round(handle, outcome).await {
                error!(stake = self.stake, round = %handle, "Failed to finish round record: {}", e);
            }
        }

        self.ctx.metrics.record_round_completed();
        info!(
            stake = self.stake,
            round = finished.round_number,
            winner = ?finished.winner.map(|w| w.player_id),
            ?reason,
            "Round ended"
        );
        self.broadcast_state().await;

        if let Some(done) = finished.done {
            let _ = done.send(());
        }
    }

    async fn settle_no_winner(&self, paid: &[PlayerId]) {
        if paid.is_empty() {
            return;
        }
        match self.ctx.config.no_winner_policy {
            NoWinnerPolicy::HouseRetains => {
                debug!(stake = self.stake, players = paid.len(), "No winner, stakes retained");
            }
            NoWinnerPolicy::Refund => {
                for &player_id in paid {
                    match self.ctx.ledger.credit(player_id, self.stake).await {
                        Ok(_) => {
                            self.notify(player_id, format!("No winner this round. Stake {} refunded.", self.stake))
                                .await
                        }
                        Err(e) => error!(stake = self.stake, player_id, "Failed to refund stake: {}", e),
                    }
                }
            }
        }
    }

    /// Force the lobby back to WAITING after its loop failed
    pub async fn recover(&self) {
        let handle = self
            .state
            .write()
            .await
            .force_reset(self.ctx.config.countdown_secs);
        if let Some(handle) = handle {
            if let Err(e) = self.ctx.rounds.finish_round(handle, None).await {
                error!(stake = self.stake, round = %handle, "Failed to close abandoned round: {}", e);
            }
        }
        warn!(stake = self.stake, "Lobby reset to waiting");
        self.broadcast_state().await;
    }
}
