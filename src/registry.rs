//! Process-wide registry of lobbies, one per stake tier

use crate::common::types::Stake;
use crate::lobby::{Lobby, LobbyContext, LobbySummary};
use futures::FutureExt;
use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Owns every lobby for the lifetime of the process
pub struct LobbyRegistry {
    lobbies: BTreeMap<Stake, Arc<Lobby>>,
}

impl LobbyRegistry {
    /// Create one lobby per configured stake
    pub fn new(ctx: LobbyContext) -> Self {
        let lobbies = ctx
            .config
            .stakes
            .iter()
            .map(|&stake| (stake, Lobby::new(stake, ctx.clone())))
            .collect();
        Self { lobbies }
    }

    pub fn get(&self, stake: Stake) -> Option<Arc<Lobby>> {
        self.lobbies.get(&stake).cloned()
    }

    pub fn stakes(&self) -> Vec<Stake> {
        self.lobbies.keys().copied().collect()
    }

    pub fn lobbies(&self) -> impl Iterator<Item = &Arc<Lobby>> {
        self.lobbies.values()
    }

    pub async fn summaries(&self) -> Vec<LobbySummary> {
        let mut summaries = Vec::with_capacity(self.lobbies.len());
        for lobby in self.lobbies.values() {
            summaries.push(lobby.summary().await);
        }
        summaries
    }

    /// Spawn a supervised orchestrator for every lobby
    pub fn start(&self) -> Vec<JoinHandle<()>> {
        info!(stakes = ?self.stakes(), "Starting lobby orchestrators");
        self.lobbies
            .values()
            .map(|lobby| tokio::spawn(supervise(Arc::clone(lobby))))
            .collect()
    }
}

/// Restart a lobby's loop after a panic; other lobbies are unaffected
async fn supervise(lobby: Arc<Lobby>) {
    loop {
        let result = AssertUnwindSafe(Arc::clone(&lobby).run())
            .catch_unwind()
            .await;
        match result {
            Ok(()) => break,
            Err(_) => {
                error!(stake = lobby.stake(), "Lobby orchestrator panicked, restarting");
                lobby.recover().await;
                tokio::time::sleep(lobby.config().tick()).await;
            }
        }
    }
}
