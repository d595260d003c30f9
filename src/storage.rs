//! RocksDB-backed ledger and round store
//!
//! Records are JSON values under string keys:
//! - `player:{id}`         -> [`PlayerRecord`]
//! - `round:{id}`          -> [`RoundRecord`]
//! - `round:last:{stake}`  -> highest round number for the stake (u64, LE)
//! - `round:seq`           -> last allocated round id (u64, LE)

use crate::common::traits::{Ledger, RoundStore};
use crate::common::types::{Amount, PlayerId, RoundHandle, RoundOutcome, Stake};
use crate::errors::{LedgerError, StoreError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rocksdb::{Options, WriteBatch, DB};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

const ROUND_SEQ_KEY: &[u8] = b"round:seq";

/// Player account as persisted by the ledger
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlayerRecord {
    pub name: String,
    pub balance: Amount,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RoundStatus {
    InProgress,
    Finished,
}

/// Persisted round record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoundRecord {
    pub id: u64,
    pub stake: Stake,
    pub round_number: u64,
    pub status: RoundStatus,
    pub drawn: Vec<u8>,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub winner: Option<RoundOutcome>,
}

impl RoundRecord {
    pub fn new(id: u64, stake: Stake, round_number: u64) -> Self {
        Self {
            id,
            stake,
            round_number,
            status: RoundStatus::InProgress,
            drawn: Vec::new(),
            started_at: Utc::now(),
            ended_at: None,
            winner: None,
        }
    }

    pub fn finish(&mut self, outcome: Option<RoundOutcome>) {
        self.status = RoundStatus::Finished;
        self.ended_at = Some(Utc::now());
        self.winner = outcome;
    }
}

fn player_key(player_id: PlayerId) -> Vec<u8> {
    format!("player:{}", player_id).into_bytes()
}

fn round_key(id: u64) -> Vec<u8> {
    format!("round:{}", id).into_bytes()
}

fn last_round_key(stake: Stake) -> Vec<u8> {
    format!("round:last:{}", stake).into_bytes()
}

fn parse_u64_le(bytes: &[u8]) -> Option<u64> {
    let arr: [u8; 8] = bytes.try_into().ok()?;
    Some(u64::from_le_bytes(arr))
}

/// Persistent store over a single RocksDB instance
#[derive(Clone)]
pub struct RocksStore {
    db: Arc<DB>,
    /// Serialises read-modify-write sequences (balances, round ids)
    write_lock: Arc<Mutex<()>>,
}

impl RocksStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);

        let db = DB::open(&opts, path)?;
        Ok(Self {
            db: Arc::new(db),
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, ()>, StoreError> {
        self.write_lock
            .lock()
            .map_err(|_| StoreError::Backend("store write lock poisoned".to_string()))
    }

    fn get_json<T: DeserializeOwned>(&self, key: &[u8]) -> Result<Option<T>, StoreError> {
        match self.db.get(key)? {
            Some(bytes) => serde_json::from_slice(&bytes).map(Some).map_err(|e| {
                StoreError::Corrupted(format!("{}: {}", String::from_utf8_lossy(key), e))
            }),
            None => Ok(None),
        }
    }

    fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, StoreError> {
        serde_json::to_vec(value).map_err(|e| StoreError::Backend(format!("encode failed: {}", e)))
    }

    fn put_json<T: Serialize>(&self, key: &[u8], value: &T) -> Result<(), StoreError> {
        self.db.put(key, Self::encode(value)?)?;
        Ok(())
    }

    /// Create or overwrite a player account
    pub fn seed_player(&self, player_id: PlayerId, name: &str, balance: Amount) -> Result<(), StoreError> {
        let _guard = self.lock()?;
        self.put_json(
            &player_key(player_id),
            &PlayerRecord {
                name: name.to_string(),
                balance,
            },
        )
    }

    pub fn player(&self, player_id: PlayerId) -> Result<Option<PlayerRecord>, StoreError> {
        self.get_json(&player_key(player_id))
    }

    pub fn round(&self, handle: RoundHandle) -> Result<Option<RoundRecord>, StoreError> {
        self.get_json(&round_key(handle.0))
    }

    fn require_player(&self, player_id: PlayerId) -> Result<PlayerRecord, LedgerError> {
        self.player(player_id)?
            .ok_or(LedgerError::PlayerNotFound(player_id))
    }

    fn update_round<F>(&self, handle: RoundHandle, update: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut RoundRecord),
    {
        let _guard = self.lock()?;
        let key = round_key(handle.0);
        let mut record: RoundRecord = self
            .get_json(&key)?
            .ok_or_else(|| StoreError::NotFound(handle.to_string()))?;
        update(&mut record);
        self.put_json(&key, &record)
    }
}

#[async_trait]
impl Ledger for RocksStore {
    async fn balance(&self, player_id: PlayerId) -> Result<Amount, LedgerError> {
        Ok(self.require_player(player_id)?.balance)
    }

    async fn debit(&self, player_id: PlayerId, amount: Amount) -> Result<Amount, LedgerError> {
        let _guard = self.lock()?;
        let mut record = self.require_player(player_id)?;
        if record.balance < amount {
            return Err(LedgerError::InsufficientFunds {
                balance: record.balance,
                required: amount,
            });
        }
        record.balance -= amount;
        self.put_json(&player_key(player_id), &record)?;
        Ok(record.balance)
    }

    async fn credit(&self, player_id: PlayerId, amount: Amount) -> Result<Amount, LedgerError> {
        let _guard = self.lock()?;
        let mut record = self.require_player(player_id)?;
        record.balance = record.balance.saturating_add(amount);
        self.put_json(&player_key(player_id), &record)?;
        Ok(record.balance)
    }

    async fn display_name(&self, player_id: PlayerId) -> Result<String, LedgerError> {
        Ok(self.require_player(player_id)?.name)
    }
}

#[async_trait]
impl RoundStore for RocksStore {
    async fn last_round_number(&self, stake: Stake) -> Result<u64, StoreError> {
        Ok(self
            .db
            .get(last_round_key(stake))?
            .and_then(|b| parse_u64_le(&b))
            .unwrap_or(0))
    }

    async fn create_round(&self, stake: Stake, round_number: u64) -> Result<RoundHandle, StoreError> {
        let _guard = self.lock()?;
        let id = self
            .db
            .get(ROUND_SEQ_KEY)?
            .and_then(|b| parse_u64_le(&b))
            .unwrap_or(0)
            + 1;
        let last = self
            .db
            .get(last_round_key(stake))?
            .and_then(|b| parse_u64_le(&b))
            .unwrap_or(0);

        let record = RoundRecord::new(id, stake, round_number);
        let mut batch = WriteBatch::default();
        batch.put(round_key(id), Self::encode(&record)?);
        batch.put(ROUND_SEQ_KEY, id.to_le_bytes());
        batch.put(last_round_key(stake), last.max(round_number).to_le_bytes());
        self.db.write(batch)?;

        Ok(RoundHandle(id))
    }

    async fn update_drawn_numbers(&self, handle: RoundHandle, drawn: &[u8]) -> Result<(), StoreError> {
        self.update_round(handle, |record| record.drawn = drawn.to_vec())
    }

    async fn finish_round(
        &self,
        handle: RoundHandle,
        outcome: Option<RoundOutcome>,
    ) -> Result<(), StoreError> {
        self.update_round(handle, |record| record.finish(outcome))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn open() -> (TempDir, RocksStore) {
        let dir = TempDir::new().unwrap();
        let store = RocksStore::open(dir.path()).unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn test_debit_and_credit() {
        let (_dir, store) = open();
        store.seed_player(1, "alice", 30).unwrap();

        assert_eq!(store.debit(1, 10).await.unwrap(), 20);
        assert_eq!(store.credit(1, 24).await.unwrap(), 44);
        assert_eq!(store.balance(1).await.unwrap(), 44);
        assert_eq!(store.display_name(1).await.unwrap(), "alice");
    }

    #[tokio::test]
    async fn test_debit_insufficient_leaves_balance() {
        let (_dir, store) = open();
        store.seed_player(2, "bob", 5).unwrap();

        let err = store.debit(2, 10).await.unwrap_err();
        assert_eq!(err, LedgerError::InsufficientFunds { balance: 5, required: 10 });
        assert_eq!(store.balance(2).await.unwrap(), 5);
        assert_eq!(store.balance(3).await.unwrap_err(), LedgerError::PlayerNotFound(3));
    }

    #[tokio::test]
    async fn test_round_lifecycle() {
        let (_dir, store) = open();
        assert_eq!(store.last_round_number(10).await.unwrap(), 0);

        let handle = store.create_round(10, 1).await.unwrap();
        store.update_drawn_numbers(handle, &[5, 17, 42]).await.unwrap();
        let outcome = RoundOutcome { player_id: 1, card_id: 9, payout: 24 };
        store.finish_round(handle, Some(outcome.clone())).await.unwrap();

        let record = store.round(handle).unwrap().unwrap();
        assert_eq!(record.drawn, vec![5, 17, 42]);
        assert_eq!(record.status, RoundStatus::Finished);
        assert_eq!(record.winner, Some(outcome));
        assert!(record.ended_at.is_some());

        assert_eq!(store.last_round_number(10).await.unwrap(), 1);
        assert_eq!(store.last_round_number(20).await.unwrap(), 0);

        let second = store.create_round(10, 2).await.unwrap();
        assert_ne!(second, handle);
        assert_eq!(store.last_round_number(10).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_unknown_round_update_fails() {
        let (_dir, store) = open();
        let result = store.update_drawn_numbers(RoundHandle(77), &[1]).await;
        assert!(matches!(result, Err(StoreError::NotFound(_))));
    }
}
