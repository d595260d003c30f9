//! Per-stake lobby: sessions, card selection and state broadcast
//!
//! All round state lives behind one `RwLock`. Ledger and round-store calls
//! are always made with the lock released.

mod claim;
mod orchestrator;
mod snapshot;
mod state;

pub use claim::ClaimOutcome;
pub use snapshot::{CardView, LobbySnapshot, LobbySummary, ServerMessage};

use crate::catalog::CardCatalog;
use crate::common::traits::{Ledger, RoundStore};
use crate::common::types::{CardId, LobbyStatus, PlayerId, Stake};
use crate::config::LobbyConfig;
use crate::draw::DrawSource;
use crate::errors::LobbyError;
use crate::metrics::EngineMetrics;
use crate::session::{ClientAction, SessionHandle};
use futures::future::join_all;
use state::RoundState;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info, warn};

/// Collaborators shared by every lobby
#[derive(Clone)]
pub struct LobbyContext {
    pub config: Arc<LobbyConfig>,
    pub catalog: Arc<CardCatalog>,
    pub ledger: Arc<dyn Ledger>,
    pub rounds: Arc<dyn RoundStore>,
    pub draw: Arc<dyn DrawSource>,
    pub metrics: Arc<EngineMetrics>,
}

pub struct Lobby {
    stake: Stake,
    ctx: LobbyContext,
    state: RwLock<RoundState>,
    /// Held from snapshot capture to fan-out, so broadcasts arrive in state order
    broadcast: Mutex<()>,
    next_connection: AtomicU64,
}

impl Lobby {
    pub fn new(stake: Stake, ctx: LobbyContext) -> Arc<Self> {
        let countdown = ctx.config.countdown_secs;
        Arc::new(Self {
            stake,
            ctx,
            state: RwLock::new(RoundState::new(countdown)),
            broadcast: Mutex::new(()),
            next_connection: AtomicU64::new(1),
        })
    }

    pub fn stake(&self) -> Stake {
        self.stake
    }

    pub fn config(&self) -> &LobbyConfig {
        &self.ctx.config
    }

    pub fn metrics(&self) -> &Arc<EngineMetrics> {
        &self.ctx.metrics
    }

    /// Identifier for a new connection to this lobby
    pub fn next_connection_id(&self) -> u64 {
        self.next_connection.fetch_add(1, Ordering::Relaxed)
    }

    /// Attach a session; an existing session of the same player is closed
    pub async fn join(&self, session: Arc<SessionHandle>) {
        let player_id = session.player_id();
        let previous = {
            let mut state = self.state.write().await;
            state.sessions.insert(player_id, session)
        };

        if let Some(old) = previous {
            info!(stake = self.stake, player_id, "Superseding previous connection");
            old.close();
        }
        info!(stake = self.stake, player_id, "Player joined lobby");
        self.broadcast_state().await;
    }

    /// Detach a session and release its card.
    ///
    /// Ignored when `connection_id` no longer owns the player's slot, so a
    /// superseded session cannot evict its replacement.
    pub async fn leave(&self, player_id: PlayerId, connection_id: u64) {
        let released = {
            let mut state = self.state.write().await;
            let owns_slot = state
                .sessions
                .get(&player_id)
                .map(|current| current.connection_id() == connection_id)
                .unwrap_or(false);
            if owns_slot {
                state.sessions.remove(&player_id);
                Some(state.release(player_id))
            } else {
                None
            }
        };

        match released {
            Some(card) => {
                info!(stake = self.stake, player_id, released_card = ?card, "Player left lobby");
                self.broadcast_state().await;
            }
            None => debug!(stake = self.stake, player_id, connection_id, "Stale session left"),
        }
    }

    /// Send a notification to one player, if attached
    pub async fn notify(&self, player_id: PlayerId, message: impl Into<String>) {
        let session = self.state.read().await.sessions.get(&player_id).cloned();
        let Some(session) = session else {
            debug!(stake = self.stake, player_id, "Cannot notify detached player");
            return;
        };
        match serde_json::to_string(&ServerMessage::notification(message)) {
            Ok(json) => {
                session.try_deliver(Arc::from(json));
            }
            Err(e) => error!(stake = self.stake, player_id, "Failed to encode notification: {}", e),
        }
    }

    /// Reserve `card_id` for `player_id` for the next round
    pub async fn select_card(&self, player_id: PlayerId, card_id: CardId) -> Result<(), LobbyError> {
        let balance = self.ctx.ledger.balance(player_id).await?;
        if balance < self.stake {
            return Err(LobbyError::InsufficientBalance {
                balance,
                stake: self.stake,
            });
        }
        if self.ctx.catalog.lookup(card_id).is_none() {
            return Err(LobbyError::UnknownCard(card_id));
        }

        let previous = self.state.write().await.select(player_id, card_id)?;
        info!(stake = self.stake, player_id, card_id, released_card = ?previous, "Card selected");
        self.broadcast_state().await;
        Ok(())
    }

    /// Run one decoded client action and report the result to the player
    pub async fn dispatch(self: &Arc<Self>, player_id: PlayerId, action: ClientAction) {
        match action {
            ClientAction::SelectCard { card_id } => {
                if let Err(e) = self.select_card(player_id, card_id).await {
                    warn!(stake = self.stake, player_id, card_id, "Card selection rejected: {}", e);
                    self.notify(player_id, e.reason()).await;
                }
            }
            ClientAction::ClaimBingo => match self.claim_bingo(player_id).await {
                Ok(ClaimOutcome::Won { .. }) => {}
                Ok(ClaimOutcome::NotBingo) => {
                    self.notify(
                        player_id,
                        "No Bingo on your card. You cannot check again this round.",
                    )
                    .await;
                }
                Err(e) => {
                    warn!(stake = self.stake, player_id, "Claim rejected: {}", e);
                    self.notify(player_id, e.reason()).await;
                }
            },
        }
    }

    /// Current snapshot including balances of attached players
    pub async fn snapshot(&self) -> LobbySnapshot {
        let (mut snapshot, players) = {
            let state = self.state.read().await;
            let snapshot =
                LobbySnapshot::capture(self.stake, self.ctx.config.payout_bps, &state, &self.ctx.catalog);
            let players: Vec<PlayerId> = state.sessions.keys().copied().collect();
            (snapshot, players)
        };

        let balances = join_all(players.iter().map(|&p| self.ctx.ledger.balance(p))).await;
        for (player_id, balance) in players.into_iter().zip(balances) {
            match balance {
                Ok(amount) => {
                    snapshot.balances.insert(player_id, amount);
                }
                Err(e) => debug!(stake = self.stake, player_id, "Balance unavailable: {}", e),
            }
        }
        snapshot
    }

    pub async fn summary(&self) -> LobbySummary {
        let state = self.state.read().await;
        LobbySummary::capture(self.stake, self.ctx.config.payout_bps, &state)
    }

    pub async fn status(&self) -> LobbyStatus {
        self.state.read().await.status
    }

    /// Serialize the current state once and queue it on every session
    pub async fn broadcast_state(&self) {
        let _ordered = self.broadcast.lock().await;
        let snapshot = self.snapshot().await;
        let json = match serde_json::to_string(&ServerMessage::State(snapshot)) {
            Ok(json) => Arc::<str>::from(json),
            Err(e) => {
                error!(stake = self.stake, "Failed to encode lobby state: {}", e);
                return;
            }
        };

        let sessions: Vec<Arc<SessionHandle>> =
            self.state.read().await.sessions.values().cloned().collect();
        for session in sessions {
            session.try_deliver(json.clone());
        }
    }

    /// Card currently held by a player
    pub async fn selected_card(&self, player_id: PlayerId) -> Option<CardId> {
        self.state.read().await.selected_card(player_id)
    }

    pub async fn has_session(&self, player_id: PlayerId) -> bool {
        self.state.read().await.sessions.contains_key(&player_id)
    }
}
