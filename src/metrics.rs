//! Engine counters exported at `/metrics`

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct EngineMetrics {
    rounds_started: AtomicU64,
    rounds_completed: AtomicU64,
    rounds_aborted: AtomicU64,
    numbers_drawn: AtomicU64,
    claims_won: AtomicU64,
    claims_rejected: AtomicU64,
    messages_dropped: AtomicU64,
    sessions_active: AtomicU64,
}

/// Point-in-time copy of the counters
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub rounds_started: u64,
    pub rounds_completed: u64,
    pub rounds_aborted: u64,
    pub numbers_drawn: u64,
    pub claims_won: u64,
    pub claims_rejected: u64,
    pub messages_dropped: u64,
    pub sessions_active: u64,
}

impl EngineMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_round_started(&self) {
        self.rounds_started.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_round_completed(&self) {
        self.rounds_completed.fetch_add(1, Ordering::Relaxed);
    }

    /// Countdown expired without enough cards
    pub fn record_round_aborted(&self) {
        self.rounds_aborted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_number_drawn(&self) {
        self.numbers_drawn.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_claim(&self, won: bool) {
        if won {
            self.claims_won.fetch_add(1, Ordering::Relaxed);
        } else {
            self.claims_rejected.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_message_dropped(&self) {
        self.messages_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn session_opened(&self) {
        self.sessions_active.fetch_add(1, Ordering::Relaxed);
    }

    pub fn session_closed(&self) {
        let _ = self
            .sessions_active
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1));
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            rounds_started: self.rounds_started.load(Ordering::Relaxed),
            rounds_completed: self.rounds_completed.load(Ordering::Relaxed),
            rounds_aborted: self.rounds_aborted.load(Ordering::Relaxed),
            numbers_drawn: self.numbers_drawn.load(Ordering::Relaxed),
            claims_won: self.claims_won.load(Ordering::Relaxed),
            claims_rejected: self.claims_rejected.load(Ordering::Relaxed),
            messages_dropped: self.messages_dropped.load(Ordering::Relaxed),
            sessions_active: self.sessions_active.load(Ordering::Relaxed),
        }
    }
}
