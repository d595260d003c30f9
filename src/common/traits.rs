//! Collaborator interfaces consumed by the lobby engine
//!
//! Both traits model remote, possibly slow calls. The lobby never invokes
//! them while holding its state lock.

use crate::common::types::{Amount, PlayerId, RoundHandle, RoundOutcome, Stake};
use crate::errors::{LedgerError, StoreError};
use async_trait::async_trait;

/// Player balance ledger
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Current balance of a player
    async fn balance(&self, player_id: PlayerId) -> Result<Amount, LedgerError>;

    /// Withdraw `amount`; fails with `InsufficientFunds` without side effects.
    /// Returns the balance after the debit.
    async fn debit(&self, player_id: PlayerId, amount: Amount) -> Result<Amount, LedgerError>;

    /// Deposit `amount`, returning the balance after the credit
    async fn credit(&self, player_id: PlayerId, amount: Amount) -> Result<Amount, LedgerError>;

    /// Name shown in winner announcements
    async fn display_name(&self, player_id: PlayerId) -> Result<String, LedgerError>;
}

/// Persistent round records
#[async_trait]
pub trait RoundStore: Send + Sync {
    /// Highest round number recorded for a stake tier, 0 if none
    async fn last_round_number(&self, stake: Stake) -> Result<u64, StoreError>;

    /// Create an in-progress round record
    async fn create_round(&self, stake: Stake, round_number: u64) -> Result<RoundHandle, StoreError>;

    /// Replace the drawn-number list of a round
    async fn update_drawn_numbers(&self, handle: RoundHandle, drawn: &[u8]) -> Result<(), StoreError>;

    /// Mark a round finished, recording the winner if there was one
    async fn finish_round(
        &self,
        handle: RoundHandle,
        outcome: Option<RoundOutcome>,
    ) -> Result<(), StoreError>;
}
