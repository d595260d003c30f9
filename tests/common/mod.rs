//! Shared fixtures for the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use bingo_hall::{
    catalog::{Card, GRID_SIZE},
    common::types::{Amount, PlayerId, RoundHandle, RoundOutcome, Stake},
    config::LobbyConfig,
    draw::{DrawSource, FixedDraw},
    errors::{LedgerError, StoreError},
    metrics::EngineMetrics,
    CardCatalog, Ledger, Lobby, LobbyContext, MemoryStore, RoundStore,
};
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Number at `row`, `col` of test card `card_id`: column c holds
/// c * 15 + ((card_id - 1 + row) % 15) + 1, so card 1 has corners 1, 61, 5, 65.
pub fn cell(card_id: u32, row: usize, col: usize) -> u8 {
    (col * 15 + ((card_id as usize - 1 + row) % 15) + 1) as u8
}

pub fn corners(card_id: u32) -> Vec<u8> {
    vec![
        cell(card_id, 0, 0),
        cell(card_id, 0, 4),
        cell(card_id, 4, 0),
        cell(card_id, 4, 4),
    ]
}

pub fn catalog(cards: u32) -> Arc<CardCatalog> {
    let cards = (1..=cards)
        .map(|id| {
            let mut columns = [[0u8; GRID_SIZE]; GRID_SIZE];
            for (col, column) in columns.iter_mut().enumerate() {
                for (row, value) in column.iter_mut().enumerate() {
                    *value = cell(id, row, col);
                }
            }
            Card::new(id, columns)
        })
        .collect();
    Arc::new(CardCatalog::from_cards(cards).expect("valid test catalog"))
}

/// Real-time-scale config: 3 countdown ticks of 1s, 5s per draw, 5s grace
pub fn config() -> LobbyConfig {
    LobbyConfig {
        stakes: vec![10],
        countdown_secs: 3,
        tick_ms: 1_000,
        draw_interval_ms: 5_000,
        claim_grace_ms: 5_000,
        ..Default::default()
    }
}

pub struct Fixture {
    pub store: Arc<MemoryStore>,
    pub metrics: Arc<EngineMetrics>,
    pub ctx: LobbyContext,
}

impl Fixture {
    pub fn new(config: LobbyConfig, draw: Arc<dyn DrawSource>) -> Self {
        let store = Arc::new(MemoryStore::new());
        let metrics = Arc::new(EngineMetrics::new());
        let ctx = LobbyContext {
            config: Arc::new(config),
            catalog: catalog(12),
            ledger: store.clone(),
            rounds: store.clone(),
            draw,
            metrics: metrics.clone(),
        };
        Self { store, metrics, ctx }
    }

    /// Fixture whose draws start with `prefix`
    pub fn with_draw(config: LobbyConfig, prefix: Vec<u8>) -> Self {
        Self::new(config, Arc::new(FixedDraw::new(prefix)))
    }

    /// Fixture whose ledger and round store go through a [`FaultyStore`]
    pub fn faulty(config: LobbyConfig, prefix: Vec<u8>) -> (Self, Arc<FaultyStore>) {
        let mut fx = Self::with_draw(config, prefix);
        let faulty = Arc::new(FaultyStore::new(fx.store.clone()));
        fx.ctx.ledger = faulty.clone();
        fx.ctx.rounds = faulty.clone();
        (fx, faulty)
    }

    pub fn lobby(&self, stake: u64) -> Arc<Lobby> {
        Lobby::new(stake, self.ctx.clone())
    }

    pub fn seed(&self, players: &[(u64, &str, u64)]) {
        for &(id, name, balance) in players {
            self.store.seed_player(id, name, balance);
        }
    }
}

/// Poll `check` until it holds; panics after a long (virtual or real) wait
pub async fn wait_for<F, Fut>(what: &str, mut check: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    for _ in 0..4_000 {
        if check().await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("timed out waiting for {}", what);
}

/// Delegates to a [`MemoryStore`], panicking or stalling once when armed
pub struct FaultyStore {
    inner: Arc<MemoryStore>,
    pub panic_on_balance: AtomicBool,
    pub panic_on_debit: AtomicBool,
    pub panic_on_drawn: AtomicBool,
    /// Delay in ms applied to the next balance read only
    pub stall_next_balance: AtomicU64,
}

impl FaultyStore {
    pub fn new(inner: Arc<MemoryStore>) -> Self {
        Self {
            inner,
            panic_on_balance: AtomicBool::new(false),
            panic_on_debit: AtomicBool::new(false),
            panic_on_drawn: AtomicBool::new(false),
            stall_next_balance: AtomicU64::new(0),
        }
    }
}

fn trip(armed: &AtomicBool, call: &str) {
    if armed.swap(false, Ordering::SeqCst) {
        panic!("{} blew up", call);
    }
}

#[async_trait]
impl Ledger for FaultyStore {
    async fn balance(&self, player_id: PlayerId) -> Result<Amount, LedgerError> {
        trip(&self.panic_on_balance, "balance");
        let stall = self.stall_next_balance.swap(0, Ordering::SeqCst);
        if stall > 0 {
            tokio::time::sleep(Duration::from_millis(stall)).await;
        }
        self.inner.balance(player_id).await
    }

    async fn debit(&self, player_id: PlayerId, amount: Amount) -> Result<Amount, LedgerError> {
        trip(&self.panic_on_debit, "debit");
        self.inner.debit(player_id, amount).await
    }

    async fn credit(&self, player_id: PlayerId, amount: Amount) -> Result<Amount, LedgerError> {
        self.inner.credit(player_id, amount).await
    }

    async fn display_name(&self, player_id: PlayerId) -> Result<String, LedgerError> {
        self.inner.display_name(player_id).await
    }
}

#[async_trait]
impl RoundStore for FaultyStore {
    async fn last_round_number(&self, stake: Stake) -> Result<u64, StoreError> {
        self.inner.last_round_number(stake).await
    }

    async fn create_round(&self, stake: Stake, round_number: u64) -> Result<RoundHandle, StoreError> {
        self.inner.create_round(stake, round_number).await
    }

    async fn update_drawn_numbers(&self, handle: RoundHandle, drawn: &[u8]) -> Result<(), StoreError> {
        trip(&self.panic_on_drawn, "update_drawn_numbers");
        self.inner.update_drawn_numbers(handle, drawn).await
    }

    async fn finish_round(
        &self,
        handle: RoundHandle,
        outcome: Option<RoundOutcome>,
    ) -> Result<(), StoreError> {
        self.inner.finish_round(handle, outcome).await
    }
}
