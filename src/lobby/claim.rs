//! Win claims and settlement

use super::orchestrator::RoundEnd;
use super::Lobby;
use crate::common::types::{Amount, PlayerId};
use crate::errors::LobbyError;
use crate::pattern::has_bingo;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Result of an evaluated claim
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimOutcome {
    /// The claim won the round; `payout` is being credited
    Won { payout: Amount },
    /// The card has no winning pattern; the attempt is used up
    NotBingo,
}

impl Lobby {
    /// Evaluate a player's bingo claim.
    ///
    /// Each player gets one evaluation per round: the attempt is recorded
    /// before the card is checked, so retries and concurrent duplicates are
    /// rejected with `AlreadyClaimed`.
    pub async fn claim_bingo(self: &Arc<Self>, player_id: PlayerId) -> Result<ClaimOutcome, LobbyError> {
        let ticket = self.state.write().await.begin_claim(player_id)?;

        let card = self
            .ctx
            .catalog
            .lookup(ticket.card_id)
            .ok_or(LobbyError::UnknownCard(ticket.card_id))?;
        let drawn: HashSet<u8> = ticket.drawn.iter().copied().collect();

        if !has_bingo(&card, &drawn) {
            self.ctx.metrics.record_claim(false);
            info!(stake = self.stake, player_id, card_id = ticket.card_id, "Bingo claim failed");
            return Ok(ClaimOutcome::NotBingo);
        }

        let win = {
            let mut state = self.state.write().await;
            state.record_win(player_id, ticket.card_id, ticket.epoch)
        };
        let win = match win {
            Ok(win) => win,
            Err(e) => {
                self.ctx.metrics.record_claim(false);
                return Err(e);
            }
        };
        self.ctx.metrics.record_claim(true);
        info!(
            stake = self.stake,
            player_id,
            card_id = ticket.card_id,
            round = win.round_number,
            payout = win.payout,
            selected_cards = win.selected_cards,
            drawn = ticket.drawn.len(),
            "BINGO!"
        );

        let lobby = Arc::clone(self);
        let payout = win.payout;
        let epoch = ticket.epoch;
        tokio::spawn(async move { lobby.settle_win(player_id, payout, epoch).await });

        let lobby = Arc::clone(self);
        let grace = self.ctx.config.claim_grace();
        tokio::spawn(async move {
            tokio::time::sleep(grace).await;
            lobby.end_round(epoch, RoundEnd::Claimed).await;
        });

        self.broadcast_state().await;
        Ok(ClaimOutcome::Won { payout })
    }

    /// Credit the winner and attach their display name to the announcement
    async fn settle_win(&self, player_id: PlayerId, payout: Amount, epoch: u64) {
        match self.ctx.ledger.credit(player_id, payout).await {
            Ok(balance) => {
                info!(stake = self.stake, player_id, payout, balance, "Winnings credited");
                self.notify(player_id, format!("You won BINGO! Winnings: {}", payout))
                    .await;
            }
            Err(e) => error!(stake = self.stake, player_id, payout, "Failed to credit winnings: {}", e),
        }

        match self.ctx.ledger.display_name(player_id).await {
            Ok(name) => {
                let mut state = self.state.write().await;
                if state.epoch == epoch {
                    if let Some(winner) = state.winner.as_mut() {
                        winner.name = Some(name);
                    }
                }
            }
            Err(e) => warn!(stake = self.stake, player_id, "Winner name unavailable: {}", e),
        }

        self.broadcast_state().await;
    }
}
