//! Bingo Hall - multi-stake bingo lobby and round engine
//!
//! One lobby per stake tier runs rounds back to back: countdown, stake
//! collection, timed number draws, one claim per player per round, and
//! settlement. Players connect over WebSocket sessions that receive a
//! snapshot of their lobby after every state change.

pub mod api;
pub mod catalog;
pub mod common;
pub mod config;
pub mod draw;
pub mod errors;
pub mod lobby;
pub mod memory_store;
pub mod metrics;
pub mod pattern;
pub mod registry;
pub mod session;
pub mod storage;

pub use catalog::{Card, CardCatalog};
pub use common::config::ConfigLoader;
pub use common::traits::{Ledger, RoundStore};
pub use common::types::{CardId, LobbyStatus, PlayerId, Stake};
pub use config::EngineConfig;
pub use errors::{BingoError, BingoResult, LobbyError};
pub use lobby::{ClaimOutcome, Lobby, LobbyContext};
pub use memory_store::MemoryStore;
pub use registry::LobbyRegistry;
pub use session::{Session, SessionHandle};
pub use storage::RocksStore;
