//! Error types for the bingo engine
//!
//! Each collaborator gets its own error enum; `BingoError` is the root type
//! used at process boundaries (startup, binaries).

use crate::common::types::{Amount, CardId, PlayerId, Stake};
use thiserror::Error;

/// Root error type for all engine operations
#[derive(Debug, Error)]
pub enum BingoError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Card catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Lobby error: {0}")]
    Lobby(#[from] LobbyError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration and validation errors
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("Invalid value for {field}: '{value}' ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required field: {0}")]
    MissingRequired(String),

    #[error("Failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("Failed to save configuration: {0}")]
    SaveFailed(String),
}

/// Failures loading the card catalog at boot
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Failed to read card definitions from {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse card definitions: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid card definitions: {0}")]
    Invalid(String),
}

/// Balance ledger failures
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Player {0} not found")]
    PlayerNotFound(PlayerId),

    #[error("Insufficient funds: balance {balance} < required {required}")]
    InsufficientFunds { balance: Amount, required: Amount },

    #[error("Ledger unavailable: {0}")]
    Unavailable(String),
}

/// Round persistence failures
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Storage backend failure: {0}")]
    Backend(String),

    #[error("Corrupted record: {0}")]
    Corrupted(String),
}

impl From<rocksdb::Error> for StoreError {
    fn from(e: rocksdb::Error) -> Self {
        StoreError::Backend(e.to_string())
    }
}

impl From<StoreError> for LedgerError {
    fn from(e: StoreError) -> Self {
        LedgerError::Unavailable(e.to_string())
    }
}

/// Rejections of player actions inside a lobby
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LobbyError {
    #[error("Insufficient balance: {balance} < stake {stake}")]
    InsufficientBalance { balance: Amount, stake: Stake },

    #[error("Card {0} does not exist")]
    UnknownCard(CardId),

    #[error("Card {0} is already taken")]
    CardTaken(CardId),

    #[error("Card selection is closed while a round is in progress")]
    SelectionClosed,

    #[error("No round in progress")]
    RoundNotInProgress,

    #[error("Player {0} already checked bingo this round")]
    AlreadyClaimed(PlayerId),

    #[error("Player {0} has no card this round")]
    NoCardSelected(PlayerId),

    #[error("This round already has a winner")]
    RoundAlreadyWon,

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl LobbyError {
    /// Player-facing text sent with a rejection notification
    pub fn reason(&self) -> String {
        match self {
            LobbyError::InsufficientBalance { .. } => {
                "Insufficient balance to select this card.".to_string()
            }
            LobbyError::UnknownCard(card_id) => format!("Card {} does not exist.", card_id),
            LobbyError::CardTaken(card_id) => format!("Card {} is already taken.", card_id),
            LobbyError::SelectionClosed => {
                "Card selection is closed until the current round ends.".to_string()
            }
            LobbyError::RoundNotInProgress => "There is no round in progress.".to_string(),
            LobbyError::AlreadyClaimed(_) => {
                "You already checked Bingo this round. You cannot check again.".to_string()
            }
            LobbyError::NoCardSelected(_) => "You have no card in this round.".to_string(),
            LobbyError::RoundAlreadyWon => "This round already has a winner.".to_string(),
            LobbyError::Ledger(LedgerError::PlayerNotFound(_)) => {
                "Your account could not be found.".to_string()
            }
            LobbyError::Ledger(_) => "Your balance could not be checked, try again.".to_string(),
        }
    }
}

/// Convenience type alias for Results
pub type BingoResult<T> = Result<T, BingoError>;
