//! In-memory ledger and round store
//!
//! Backs `--in-memory` runs and the test suite. Round writes can be made to
//! fail on demand to exercise persistence-failure handling.

use crate::common::traits::{Ledger, RoundStore};
use crate::common::types::{Amount, PlayerId, RoundHandle, RoundOutcome, Stake};
use crate::errors::{LedgerError, StoreError};
use crate::storage::{PlayerRecord, RoundRecord};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

#[derive(Default)]
pub struct MemoryStore {
    players: DashMap<PlayerId, PlayerRecord>,
    rounds: DashMap<u64, RoundRecord>,
    next_round_id: AtomicU64,
    fail_round_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed_player(&self, player_id: PlayerId, name: &str, balance: Amount) {
        self.players.insert(
            player_id,
            PlayerRecord {
                name: name.to_string(),
                balance,
            },
        );
    }

    pub fn round(&self, handle: RoundHandle) -> Option<RoundRecord> {
        self.rounds.get(&handle.0).map(|r| r.clone())
    }

    /// All round records of a stake, ordered by round number
    pub fn rounds_for(&self, stake: Stake) -> Vec<RoundRecord> {
        let mut rounds: Vec<_> = self
            .rounds
            .iter()
            .filter(|r| r.stake == stake)
            .map(|r| r.clone())
            .collect();
        rounds.sort_by_key(|r| r.round_number);
        rounds
    }

    /// Make every round-store write fail until switched back
    pub fn fail_round_writes(&self, fail: bool) {
        self.fail_round_writes.store(fail, Ordering::SeqCst);
    }

    fn check_writable(&self) -> Result<(), StoreError> {
        if self.fail_round_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("injected write failure".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl Ledger for MemoryStore {
    async fn balance(&self, player_id: PlayerId) -> Result<Amount, LedgerError> {
        self.players
            .get(&player_id)
            .map(|p| p.balance)
            .ok_or(LedgerError::PlayerNotFound(player_id))
    }

    async fn debit(&self, player_id: PlayerId, amount: Amount) -> Result<Amount, LedgerError> {
        let mut player = self
            .players
            .get_mut(&player_id)
            .ok_or(LedgerError::PlayerNotFound(player_id))?;
        if player.balance < amount {
            return Err(LedgerError::InsufficientFunds {
                balance: player.balance,
                required: amount,
            });
        }
        player.balance -= amount;
        Ok(player.balance)
    }

    async fn credit(&self, player_id: PlayerId, amount: Amount) -> Result<Amount, LedgerError> {
        let mut player = self
            .players
            .get_mut(&player_id)
            .ok_or(LedgerError::PlayerNotFound(player_id))?;
        player.balance = player.balance.saturating_add(amount);
        Ok(player.balance)
    }

    async fn display_name(&self, player_id: PlayerId) -> Result<String, LedgerError> {
        self.players
            .get(&player_id)
            .map(|p| p.name.clone())
            .ok_or(LedgerError::PlayerNotFound(player_id))
    }
}

#[async_trait]
impl RoundStore for MemoryStore {
    async fn last_round_number(&self, stake: Stake) -> Result<u64, StoreError> {
        Ok(self
            .rounds
            .iter()
            .filter(|r| r.stake == stake)
            .map(|r| r.round_number)
            .max()
            .unwrap_or(0))
    }

    async fn create_round(&self, stake: Stake, round_number: u64) -> Result<RoundHandle, StoreError> {
        self.check_writable()?;
        let id = self.next_round_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.rounds.insert(id, RoundRecord::new(id, stake, round_number));
        Ok(RoundHandle(id))
    }

    async fn update_drawn_numbers(&self, handle: RoundHandle, drawn: &[u8]) -> Result<(), StoreError> {
        self.check_writable()?;
        let mut record = self
            .rounds
            .get_mut(&handle.0)
            .ok_or_else(|| StoreError::NotFound(handle.to_string()))?;
        record.drawn = drawn.to_vec();
        Ok(())
    }

    async fn finish_round(
        &self,
        handle: RoundHandle,
        outcome: Option<RoundOutcome>,
    ) -> Result<(), StoreError> {
        self.check_writable()?;
        let mut record = self
            .rounds
            .get_mut(&handle.0)
            .ok_or_else(|| StoreError::NotFound(handle.to_string()))?;
        record.finish(outcome);
        Ok(())
    }
}
